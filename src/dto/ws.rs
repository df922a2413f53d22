use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, PickFirst, serde_as};
use thiserror::Error;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::validation::{validate_finite, validate_mod_acronym},
    state::{
        events::{CursorKind, CursorSample, HitResult, JudgementEvent, Position, StatKind, StatSample},
        mods::GameMod,
        room::{BeatmapRef, RoomMessage},
    },
};

/// Failure to turn one inbound line into a message.
#[derive(Debug, Error)]
pub enum InboundError {
    /// The line is not a well-formed message.
    #[error("malformed message: {0}")]
    Parse(#[from] serde_json::Error),
    /// The message is well-formed but carries unusable values.
    #[error("invalid message: {0}")]
    Invalid(#[from] ValidationErrors),
}

#[serde_as]
#[derive(Debug, Deserialize, Serialize, ToSchema, PartialEq)]
/// Messages accepted from the spectator feed, one JSON object per line.
#[serde(tag = "kind")]
pub enum InboundMessage {
    PlayerJoined {
        #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
        #[schema(value_type = u32)]
        uid: u32,
        #[serde(default)]
        username: Option<String>,
        #[serde(default)]
        team: Option<u8>,
    },
    PlayerLeft {
        #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
        #[schema(value_type = u32)]
        uid: u32,
    },
    #[serde(rename_all = "camelCase")]
    BeatmapChanged {
        #[schema(value_type = String)]
        beatmap_ref: BeatmapRef,
    },
    ModsChanged {
        #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
        #[schema(value_type = u32)]
        uid: u32,
        #[serde(default)]
        mods: Vec<GameMod>,
    },
    #[serde(rename_all = "camelCase")]
    Cursor {
        #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
        #[schema(value_type = u32)]
        uid: u32,
        group_id: u32,
        time: i64,
        position: Position,
        cursor_kind: CursorKind,
    },
    #[serde(rename_all = "camelCase")]
    ObjectData {
        #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
        #[schema(value_type = u32)]
        uid: u32,
        time: i64,
        result: HitResult,
        accuracy_offset_ms: f64,
    },
    #[serde(rename_all = "camelCase")]
    StatDelta {
        #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
        #[schema(value_type = u32)]
        uid: u32,
        time: i64,
        stat_kind: StatKind,
        value: f64,
    },
    #[serde(rename_all = "camelCase")]
    StatCheckpoint {
        #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
        #[schema(value_type = u32)]
        uid: u32,
        time: i64,
        stat_kind: StatKind,
        value: f64,
    },
    GameplayStarted,
    GameplayEnded,
    #[serde(rename_all = "camelCase")]
    TeamModeChanged { team_mode: bool },
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    /// Parse and validate a single JSON message.
    pub fn from_json_str(raw: &str) -> Result<Self, InboundError> {
        let message: Self = serde_json::from_str(raw)?;
        message.validate()?;
        Ok(message)
    }

    /// Convert into a room message; `None` for kinds this server does not know.
    pub fn into_room_message(self) -> Option<RoomMessage> {
        let message = match self {
            InboundMessage::PlayerJoined {
                uid,
                username,
                team,
            } => RoomMessage::PlayerJoined {
                uid,
                username,
                team,
            },
            InboundMessage::PlayerLeft { uid } => RoomMessage::PlayerLeft { uid },
            InboundMessage::BeatmapChanged { beatmap_ref } => {
                RoomMessage::BeatmapChanged { beatmap_ref }
            }
            InboundMessage::ModsChanged { uid, mods } => RoomMessage::ModsChanged { uid, mods },
            InboundMessage::Cursor {
                uid,
                group_id,
                time,
                position,
                cursor_kind,
            } => RoomMessage::Cursor {
                uid,
                sample: CursorSample {
                    time,
                    group_id,
                    position,
                    kind: cursor_kind,
                },
            },
            InboundMessage::ObjectData {
                uid,
                time,
                result,
                accuracy_offset_ms,
            } => RoomMessage::ObjectData {
                uid,
                event: JudgementEvent {
                    time,
                    result,
                    accuracy_offset_ms,
                },
            },
            InboundMessage::StatDelta {
                uid,
                time,
                stat_kind,
                value,
            } => RoomMessage::StatDelta {
                uid,
                kind: stat_kind,
                sample: StatSample::new(time, value),
            },
            InboundMessage::StatCheckpoint {
                uid,
                time,
                stat_kind,
                value,
            } => RoomMessage::StatCheckpoint {
                uid,
                kind: stat_kind,
                sample: StatSample::new(time, value),
            },
            InboundMessage::GameplayStarted => RoomMessage::GameplayStarted,
            InboundMessage::GameplayEnded => RoomMessage::GameplayEnded,
            InboundMessage::TeamModeChanged { team_mode } => {
                RoomMessage::TeamModeChanged { team_mode }
            }
            InboundMessage::Unknown => return None,
        };
        Some(message)
    }
}

impl Validate for InboundMessage {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match self {
            InboundMessage::BeatmapChanged { beatmap_ref } if beatmap_ref.0.trim().is_empty() => {
                let mut err = validator::ValidationError::new("beatmap_ref_empty");
                err.message = Some("Beatmap reference must not be empty".into());
                errors.add("beatmapRef", err);
            }
            InboundMessage::ModsChanged { mods, .. } => {
                for game_mod in mods {
                    if let Err(e) = validate_mod_acronym(&game_mod.acronym) {
                        errors.add("mods", e);
                    }
                }
            }
            InboundMessage::Cursor { position, .. } => {
                for coordinate in [position.x, position.y] {
                    if let Err(e) = validate_finite(f64::from(coordinate)) {
                        errors.add("position", e);
                    }
                }
            }
            InboundMessage::ObjectData {
                accuracy_offset_ms, ..
            } => {
                if let Err(e) = validate_finite(*accuracy_offset_ms) {
                    errors.add("accuracyOffsetMs", e);
                }
            }
            InboundMessage::StatDelta { value, .. }
            | InboundMessage::StatCheckpoint { value, .. } => {
                if let Err(e) = validate_finite(*value) {
                    errors.add("value", e);
                }
            }
            _ => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> InboundMessage {
        InboundMessage::from_json_str(raw).unwrap()
    }

    #[test]
    fn parses_player_lifecycle() {
        assert_eq!(
            parse(r#"{"kind":"PlayerJoined","uid":"7","username":"peppy","team":1}"#),
            InboundMessage::PlayerJoined {
                uid: 7,
                username: Some("peppy".into()),
                team: Some(1),
            }
        );
        assert_eq!(
            parse(r#"{"kind":"PlayerLeft","uid":7}"#),
            InboundMessage::PlayerLeft { uid: 7 }
        );
    }

    #[test]
    fn parses_beatmap_and_mods() {
        assert_eq!(
            parse(r#"{"kind":"BeatmapChanged","beatmapRef":"129891"}"#),
            InboundMessage::BeatmapChanged {
                beatmap_ref: BeatmapRef("129891".into())
            }
        );
        let mods = parse(
            r#"{"kind":"ModsChanged","uid":3,"mods":[{"acronym":"DT","settings":{"speedChange":1.2}},{"acronym":"HD"}]}"#,
        );
        match mods {
            InboundMessage::ModsChanged { uid, mods } => {
                assert_eq!(uid, 3);
                assert_eq!(mods.len(), 2);
                assert_eq!(mods[0].settings.speed_change, Some(1.2));
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn parses_gameplay_categories() {
        let cursor = parse(
            r#"{"kind":"Cursor","uid":7,"groupId":1,"time":50,"position":{"x":110,"y":100},"cursorKind":"move"}"#,
        );
        assert_eq!(
            cursor.into_room_message(),
            Some(RoomMessage::Cursor {
                uid: 7,
                sample: CursorSample {
                    time: 50,
                    group_id: 1,
                    position: Position::new(110.0, 100.0),
                    kind: CursorKind::Move,
                },
            })
        );

        let judgement = parse(
            r#"{"kind":"ObjectData","uid":7,"time":812,"result":"great","accuracyOffsetMs":-4.5}"#,
        );
        assert!(matches!(
            judgement.into_room_message(),
            Some(RoomMessage::ObjectData { event, .. }) if event.result == HitResult::Great
        ));

        let delta = parse(r#"{"kind":"StatDelta","uid":7,"time":1200,"statKind":"score","value":300}"#);
        assert_eq!(
            delta.into_room_message(),
            Some(RoomMessage::StatDelta {
                uid: 7,
                kind: StatKind::Score,
                sample: StatSample::new(1200, 300.0),
            })
        );

        let checkpoint =
            parse(r#"{"kind":"StatCheckpoint","uid":7,"time":0,"statKind":"combo","value":0}"#);
        assert!(matches!(
            checkpoint.into_room_message(),
            Some(RoomMessage::StatCheckpoint {
                kind: StatKind::Combo,
                ..
            })
        ));
    }

    #[test]
    fn parses_room_signals() {
        assert_eq!(
            parse(r#"{"kind":"GameplayStarted"}"#).into_room_message(),
            Some(RoomMessage::GameplayStarted)
        );
        assert_eq!(
            parse(r#"{"kind":"GameplayEnded"}"#).into_room_message(),
            Some(RoomMessage::GameplayEnded)
        );
        assert_eq!(
            parse(r#"{"kind":"TeamModeChanged","teamMode":true}"#).into_room_message(),
            Some(RoomMessage::TeamModeChanged { team_mode: true })
        );
    }

    #[test]
    fn unknown_kind_is_dropped() {
        let message = parse(r#"{"kind":"ChatMessage","text":"gl hf"}"#);
        assert_eq!(message, InboundMessage::Unknown);
        assert_eq!(message.into_room_message(), None);
    }

    #[test]
    fn malformed_or_invalid_payloads_are_rejected() {
        assert!(matches!(
            InboundMessage::from_json_str("{not json"),
            Err(InboundError::Parse(_))
        ));
        assert!(matches!(
            InboundMessage::from_json_str(r#"{"kind":"Cursor","uid":7}"#),
            Err(InboundError::Parse(_))
        ));
        assert!(matches!(
            InboundMessage::from_json_str(
                r#"{"kind":"Cursor","uid":7,"time":0,"position":{"x":1,"y":1},"cursorKind":"down"}"#
            ),
            Err(InboundError::Parse(_))
        ));
        assert!(matches!(
            InboundMessage::from_json_str(r#"{"kind":"ObjectData","uid":7,"time":0,"result":"miss"}"#),
            Err(InboundError::Parse(_))
        ));
        assert!(matches!(
            InboundMessage::from_json_str(r#"{"kind":"PlayerLeft","uid":"seven"}"#),
            Err(InboundError::Parse(_))
        ));
        assert!(matches!(
            InboundMessage::from_json_str(
                r#"{"kind":"ModsChanged","uid":7,"mods":[{"acronym":"not a mod"}]}"#
            ),
            Err(InboundError::Invalid(_))
        ));
        assert!(matches!(
            InboundMessage::from_json_str(r#"{"kind":"BeatmapChanged","beatmapRef":" "}"#),
            Err(InboundError::Invalid(_))
        ));
    }
}
