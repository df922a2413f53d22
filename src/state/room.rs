//! Room-level aggregate: the set of spectated players, the picked beatmap and
//! the lifecycle state machine, plus the dispatcher routing inbound messages.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::{
    data_manager::{EventCounts, PlayerSnapshot, SpectatorDataManager},
    events::{CursorSample, JudgementEvent, StatKind, StatSample},
    mods::{BeatmapAttributes, DerivedParameters, GameMod},
    state_machine::{
        AbortError, ApplyError, BeatmapStatus, PlanError, RoomEvent, RoomPhase, RoomStateMachine,
    },
};

/// Opaque reference to a beatmap (online id or checksum).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BeatmapRef(pub String);

impl fmt::Display for BeatmapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Acquisition handed to the beatmap collaborator after a beatmap change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeatmapRequest {
    /// Identifies this acquisition; results carrying another id are stale.
    pub id: Uuid,
    /// Beatmap to acquire.
    pub beatmap_ref: BeatmapRef,
}

/// Result reported by the beatmap collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum BeatmapOutcome {
    /// Attributes were resolved.
    Ready(BeatmapAttributes),
    /// The beatmap could not be provided.
    Unavailable(String),
}

/// Decoded inbound message addressed to the room.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomMessage {
    /// A player entered the room.
    PlayerJoined {
        /// Player identifier.
        uid: u32,
        /// Display name, when known.
        username: Option<String>,
        /// Team in team-versus rooms.
        team: Option<u8>,
    },
    /// A player left the room.
    PlayerLeft {
        /// Player identifier.
        uid: u32,
    },
    /// The host picked a beatmap.
    BeatmapChanged {
        /// Picked beatmap.
        beatmap_ref: BeatmapRef,
    },
    /// A player changed mods.
    ModsChanged {
        /// Player identifier.
        uid: u32,
        /// New mod selection.
        mods: Vec<GameMod>,
    },
    /// Cursor sample.
    Cursor {
        /// Player identifier.
        uid: u32,
        /// Sample payload.
        sample: CursorSample,
    },
    /// Hit judgement.
    ObjectData {
        /// Player identifier.
        uid: u32,
        /// Judgement payload.
        event: JudgementEvent,
    },
    /// Exact statistic increment.
    StatDelta {
        /// Player identifier.
        uid: u32,
        /// Statistic affected.
        kind: StatKind,
        /// Increment.
        sample: StatSample,
    },
    /// Authoritative statistic value.
    StatCheckpoint {
        /// Player identifier.
        uid: u32,
        /// Statistic affected.
        kind: StatKind,
        /// Absolute value.
        sample: StatSample,
    },
    /// Gameplay started.
    GameplayStarted,
    /// Gameplay ended.
    GameplayEnded,
    /// Team-versus mode toggled.
    TeamModeChanged {
        /// New flag.
        team_mode: bool,
    },
}

impl RoomMessage {
    /// Player the message is addressed to, if any.
    pub fn uid(&self) -> Option<u32> {
        match self {
            RoomMessage::PlayerJoined { uid, .. }
            | RoomMessage::PlayerLeft { uid }
            | RoomMessage::ModsChanged { uid, .. }
            | RoomMessage::Cursor { uid, .. }
            | RoomMessage::ObjectData { uid, .. }
            | RoomMessage::StatDelta { uid, .. }
            | RoomMessage::StatCheckpoint { uid, .. } => Some(*uid),
            RoomMessage::BeatmapChanged { .. }
            | RoomMessage::GameplayStarted
            | RoomMessage::GameplayEnded
            | RoomMessage::TeamModeChanged { .. } => None,
        }
    }
}

/// Why a message left the room untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Addressed to a player without a session.
    UnknownPlayer(u32),
    /// The player already has a session.
    AlreadyJoined(u32),
    /// The beatmap is already picked.
    SameBeatmap,
    /// The lifecycle does not allow the message in the current phase.
    Rejected(String),
}

/// Effect of applying a message, used by callers to fan out notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomOutcome {
    /// A category event was stored.
    Stored,
    /// A session was created.
    PlayerJoined(u32),
    /// A session was destroyed.
    PlayerLeft(u32),
    /// Mods or room settings changed.
    SettingsChanged,
    /// The lifecycle moved to a new phase.
    PhaseChanged(RoomPhase),
    /// The beatmap changed: sessions were cleared and an acquisition must start.
    BeatmapRequested {
        /// Phase after the reset.
        phase: RoomPhase,
        /// Acquisition to hand to the beatmap collaborator.
        request: BeatmapRequest,
    },
    /// Nothing changed.
    Ignored(IgnoreReason),
}

/// Errors raised by room transitions.
#[derive(Debug, Error)]
pub enum RoomError {
    /// The transition could not be planned.
    #[error("cannot plan transition: {0}")]
    Plan(#[from] PlanError),
    /// The transition could not be applied.
    #[error("cannot apply transition: {0}")]
    Apply(#[from] ApplyError),
    /// The transition could not be aborted.
    #[error("cannot abort transition: {0}")]
    Abort(#[from] AbortError),
    /// A beatmap result arrived for an acquisition that is no longer current.
    #[error("stale beatmap result {got} (current request: {expected:?})")]
    StaleBeatmapRequest {
        /// Request currently awaited.
        expected: Option<Uuid>,
        /// Request the result belongs to.
        got: Uuid,
    },
}

/// Per-player projection used in room summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSummary {
    /// Player identifier.
    pub uid: u32,
    /// Display name.
    pub username: String,
    /// Team in team-versus rooms.
    pub team: Option<u8>,
    /// Current mods.
    pub mods: Vec<GameMod>,
    /// Parameters derived from the mods.
    pub derived: DerivedParameters,
    /// Stored events per category.
    pub counts: EventCounts,
}

/// Room-level projection.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomSummary {
    /// Current lifecycle phase.
    pub phase: RoomPhase,
    /// Number of applied transitions; changes on every reset.
    pub version: usize,
    /// Picked beatmap.
    pub beatmap_ref: Option<BeatmapRef>,
    /// Attributes of the picked beatmap once resolved.
    pub beatmap_attributes: Option<BeatmapAttributes>,
    /// Team-versus flag.
    pub team_mode: bool,
    /// Wall-clock instant gameplay started.
    pub gameplay_started_at: Option<OffsetDateTime>,
    /// Players in join order.
    pub players: Vec<PlayerSummary>,
}

#[derive(Debug, Clone)]
struct BeatmapSelection {
    reference: BeatmapRef,
    attributes: Option<BeatmapAttributes>,
}

/// Owns every spectated player and the room lifecycle.
#[derive(Debug, Clone)]
pub struct RoomState {
    machine: RoomStateMachine,
    sessions: IndexMap<u32, SpectatorDataManager>,
    beatmap: Option<BeatmapSelection>,
    pending_request: Option<BeatmapRequest>,
    team_mode: bool,
    gameplay_started_at: Option<OffsetDateTime>,
    default_attributes: BeatmapAttributes,
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new(BeatmapAttributes::default())
    }
}

impl RoomState {
    /// Create an empty room. `default_attributes` stand in until a beatmap resolves.
    pub fn new(default_attributes: BeatmapAttributes) -> Self {
        Self {
            machine: RoomStateMachine::new(),
            sessions: IndexMap::new(),
            beatmap: None,
            pending_request: None,
            team_mode: false,
            gameplay_started_at: None,
            default_attributes,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RoomPhase {
        self.machine.phase()
    }

    /// Number of applied transitions.
    pub fn version(&self) -> usize {
        self.machine.version()
    }

    /// Session of one player.
    pub fn player(&self, uid: u32) -> Option<&SpectatorDataManager> {
        self.sessions.get(&uid)
    }

    /// Number of sessions.
    pub fn player_count(&self) -> usize {
        self.sessions.len()
    }

    /// Acquisition currently awaited from the beatmap collaborator.
    pub fn pending_request(&self) -> Option<&BeatmapRequest> {
        self.pending_request.as_ref()
    }

    /// Consolidated view of one player at `time`, or `None` for unknown players.
    pub fn snapshot(&self, uid: u32, time: i64) -> Option<PlayerSnapshot> {
        self.sessions.get(&uid).map(|session| session.snapshot(time))
    }

    /// Playback head in milliseconds since gameplay started.
    pub fn live_time_ms(&self, now: OffsetDateTime) -> Option<i64> {
        self.gameplay_started_at
            .map(|started| (now - started).whole_milliseconds() as i64)
    }

    /// Summaries of every player in join order.
    pub fn players(&self) -> Vec<PlayerSummary> {
        self.sessions
            .values()
            .map(|session| PlayerSummary {
                uid: session.uid(),
                username: session.username().to_string(),
                team: session.team(),
                mods: session.mods().to_vec(),
                derived: *session.derived(),
                counts: session.event_counts(),
            })
            .collect()
    }

    /// Room-level projection.
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            phase: self.phase(),
            version: self.version(),
            beatmap_ref: self.beatmap.as_ref().map(|b| b.reference.clone()),
            beatmap_attributes: self.beatmap.as_ref().and_then(|b| b.attributes),
            team_mode: self.team_mode,
            gameplay_started_at: self.gameplay_started_at,
            players: self.players(),
        }
    }

    /// Route one inbound message. Never fails: anything that cannot be applied
    /// is logged and reported as [`RoomOutcome::Ignored`].
    pub fn apply(&mut self, message: RoomMessage) -> RoomOutcome {
        match message {
            RoomMessage::PlayerJoined {
                uid,
                username,
                team,
            } => self.join(uid, username, team),
            RoomMessage::PlayerLeft { uid } => self.leave(uid),
            RoomMessage::BeatmapChanged { beatmap_ref } => self.change_beatmap(beatmap_ref),
            RoomMessage::ModsChanged { uid, mods } => {
                let base = self.base_attributes();
                self.with_session(uid, "mods", |session| {
                    session.set_mods(mods, &base);
                    RoomOutcome::SettingsChanged
                })
            }
            RoomMessage::Cursor { uid, sample } => self.with_session(uid, "cursor", |session| {
                session.add_cursor(sample);
                RoomOutcome::Stored
            }),
            RoomMessage::ObjectData { uid, event } => {
                self.with_session(uid, "object data", |session| {
                    session.add_judgement(event);
                    RoomOutcome::Stored
                })
            }
            RoomMessage::StatDelta { uid, kind, sample } => {
                self.with_session(uid, "stat delta", |session| {
                    session.add_stat_delta(kind, sample);
                    RoomOutcome::Stored
                })
            }
            RoomMessage::StatCheckpoint { uid, kind, sample } => {
                self.with_session(uid, "stat checkpoint", |session| {
                    session.add_stat_checkpoint(kind, sample);
                    RoomOutcome::Stored
                })
            }
            RoomMessage::GameplayStarted => self.start_gameplay(),
            RoomMessage::GameplayEnded => self.lifecycle(RoomEvent::GameplayEnded, |_| Ok(())),
            RoomMessage::TeamModeChanged { team_mode } => {
                self.team_mode = team_mode;
                RoomOutcome::SettingsChanged
            }
        }
    }

    /// Record the beatmap collaborator's answer for `request_id`.
    ///
    /// Results for an acquisition superseded by a later beatmap change are
    /// rejected without touching the room.
    pub fn beatmap_resolved(
        &mut self,
        request_id: Uuid,
        outcome: BeatmapOutcome,
    ) -> Result<RoomPhase, RoomError> {
        let event = match &outcome {
            BeatmapOutcome::Ready(_) => RoomEvent::BeatmapAcquired,
            BeatmapOutcome::Unavailable(_) => RoomEvent::BeatmapFailed,
        };

        let ((), phase) = self.run_transition(event, |room| {
            let expected = room.pending_request.as_ref().map(|request| request.id);
            if expected != Some(request_id) {
                return Err(RoomError::StaleBeatmapRequest {
                    expected,
                    got: request_id,
                });
            }
            room.pending_request = None;

            match outcome {
                BeatmapOutcome::Ready(attributes) => {
                    if let Some(selection) = room.beatmap.as_mut() {
                        selection.attributes = Some(attributes);
                    }
                    room.rebase_sessions();
                }
                BeatmapOutcome::Unavailable(reason) => {
                    warn!(request_id = %request_id, %reason, "beatmap unavailable");
                }
            }
            Ok(())
        })?;

        Ok(phase)
    }

    /// Tear the room down: every session is destroyed and the room returns to `Empty`.
    pub fn reset(&mut self) -> Result<RoomPhase, RoomError> {
        let ((), phase) = self.run_transition(RoomEvent::Reset, |room| {
            room.sessions.clear();
            room.beatmap = None;
            room.pending_request = None;
            room.gameplay_started_at = None;
            room.team_mode = false;
            Ok(())
        })?;
        info!("room reset");
        Ok(phase)
    }

    fn join(&mut self, uid: u32, username: Option<String>, team: Option<u8>) -> RoomOutcome {
        if self.sessions.contains_key(&uid) {
            debug!(uid, "player already joined");
            return RoomOutcome::Ignored(IgnoreReason::AlreadyJoined(uid));
        }
        let session = SpectatorDataManager::new(uid, username, team, &self.base_attributes());
        info!(uid, username = session.username(), "player joined");
        self.sessions.insert(uid, session);
        RoomOutcome::PlayerJoined(uid)
    }

    fn leave(&mut self, uid: u32) -> RoomOutcome {
        match self.sessions.shift_remove(&uid) {
            Some(_) => {
                info!(uid, "player left");
                RoomOutcome::PlayerLeft(uid)
            }
            None => {
                debug!(uid, "leave for unknown player");
                RoomOutcome::Ignored(IgnoreReason::UnknownPlayer(uid))
            }
        }
    }

    fn change_beatmap(&mut self, beatmap_ref: BeatmapRef) -> RoomOutcome {
        let same = self
            .beatmap
            .as_ref()
            .is_some_and(|selection| selection.reference == beatmap_ref);
        let retry = same && self.phase() == RoomPhase::AwaitingBeatmap(BeatmapStatus::NotFound);
        if same && !retry {
            debug!(%beatmap_ref, "beatmap unchanged; keeping timelines");
            return RoomOutcome::Ignored(IgnoreReason::SameBeatmap);
        }

        let result = self.run_transition(RoomEvent::BeatmapChanged, |room| {
            // Picking the failed beatmap again only retries the acquisition.
            if !retry {
                room.clear_sessions();
                room.beatmap = Some(BeatmapSelection {
                    reference: beatmap_ref.clone(),
                    attributes: None,
                });
                room.rebase_sessions();
                room.gameplay_started_at = None;
            }
            let request = BeatmapRequest {
                id: Uuid::new_v4(),
                beatmap_ref: beatmap_ref.clone(),
            };
            room.pending_request = Some(request.clone());
            Ok(request)
        });

        match result {
            Ok((request, phase)) if retry => {
                info!(%beatmap_ref, request_id = %request.id, "retrying beatmap acquisition");
                RoomOutcome::BeatmapRequested { phase, request }
            }
            Ok((request, phase)) => {
                info!(%beatmap_ref, request_id = %request.id, "beatmap changed; timelines cleared");
                RoomOutcome::BeatmapRequested { phase, request }
            }
            Err(err) => {
                warn!(%beatmap_ref, error = %err, "beatmap change rejected");
                RoomOutcome::Ignored(IgnoreReason::Rejected(err.to_string()))
            }
        }
    }

    fn start_gameplay(&mut self) -> RoomOutcome {
        let new_round = self.phase() == RoomPhase::GameplayEnded;
        self.lifecycle(RoomEvent::GameplayStarted, |room| {
            // Data accepted after the previous round ended belongs to that round.
            if new_round {
                room.clear_sessions();
            }
            room.gameplay_started_at = Some(OffsetDateTime::now_utc());
            Ok(())
        })
    }

    /// Run a phase-only transition and translate the result into an outcome.
    fn lifecycle<F>(&mut self, event: RoomEvent, work: F) -> RoomOutcome
    where
        F: FnOnce(&mut Self) -> Result<(), RoomError>,
    {
        match self.run_transition(event, work) {
            Ok(((), phase)) => {
                info!(?event, ?phase, "room phase changed");
                RoomOutcome::PhaseChanged(phase)
            }
            Err(err) => {
                warn!(?event, error = %err, "room transition ignored");
                RoomOutcome::Ignored(IgnoreReason::Rejected(err.to_string()))
            }
        }
    }

    /// Plan `event`, run `work`, then apply the plan, or abort it when `work`
    /// fails. `work` must leave the room untouched when it returns an error.
    fn run_transition<F, T>(&mut self, event: RoomEvent, work: F) -> Result<(T, RoomPhase), RoomError>
    where
        F: FnOnce(&mut Self) -> Result<T, RoomError>,
    {
        let plan = self.machine.plan(event)?;

        match work(self) {
            Ok(value) => {
                let next = self.machine.apply(plan.id)?;
                Ok((value, next))
            }
            Err(err) => {
                if let Err(abort_err) = self.machine.abort(plan.id) {
                    warn!(?event, plan_id = %plan.id, error = %abort_err, "failed to abort transition");
                }
                Err(err)
            }
        }
    }

    fn with_session<F>(&mut self, uid: u32, kind: &'static str, store: F) -> RoomOutcome
    where
        F: FnOnce(&mut SpectatorDataManager) -> RoomOutcome,
    {
        match self.sessions.get_mut(&uid) {
            Some(session) => store(session),
            None => {
                warn!(uid, kind, "message for unknown player ignored");
                RoomOutcome::Ignored(IgnoreReason::UnknownPlayer(uid))
            }
        }
    }

    fn clear_sessions(&mut self) {
        self.sessions
            .values_mut()
            .for_each(SpectatorDataManager::clear);
    }

    fn rebase_sessions(&mut self) {
        let base = self.base_attributes();
        self.sessions
            .values_mut()
            .for_each(|session| session.rebase(&base));
    }

    fn base_attributes(&self) -> BeatmapAttributes {
        self.beatmap
            .as_ref()
            .and_then(|selection| selection.attributes)
            .unwrap_or(self.default_attributes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::events::{CursorKind, HitResult, Position};

    fn joined(uid: u32) -> RoomMessage {
        RoomMessage::PlayerJoined {
            uid,
            username: None,
            team: None,
        }
    }

    fn cursor(uid: u32, time: i64, x: f32, kind: CursorKind) -> RoomMessage {
        RoomMessage::Cursor {
            uid,
            sample: CursorSample {
                time,
                group_id: 0,
                position: Position::new(x, 100.0),
                kind,
            },
        }
    }

    fn beatmap(reference: &str) -> RoomMessage {
        RoomMessage::BeatmapChanged {
            beatmap_ref: BeatmapRef(reference.into()),
        }
    }

    fn request_id(outcome: RoomOutcome) -> Uuid {
        match outcome {
            RoomOutcome::BeatmapRequested { request, .. } => request.id,
            other => panic!("expected beatmap request, got {other:?}"),
        }
    }

    fn populated_room() -> RoomState {
        let mut room = RoomState::default();
        room.apply(joined(7));
        room.apply(joined(8));
        for uid in [7, 8] {
            room.apply(cursor(uid, 0, 100.0, CursorKind::Down));
            room.apply(RoomMessage::StatCheckpoint {
                uid,
                kind: StatKind::Score,
                sample: StatSample::new(0, 0.0),
            });
            room.apply(RoomMessage::ObjectData {
                uid,
                event: JudgementEvent {
                    time: 10,
                    result: HitResult::Perfect,
                    accuracy_offset_ms: 1.0,
                },
            });
        }
        room
    }

    #[test]
    fn duplicate_join_keeps_single_session() {
        let mut room = RoomState::default();
        assert_eq!(room.apply(joined(5)), RoomOutcome::PlayerJoined(5));
        assert_eq!(
            room.apply(joined(5)),
            RoomOutcome::Ignored(IgnoreReason::AlreadyJoined(5))
        );
        assert_eq!(room.player_count(), 1);
    }

    #[test]
    fn cursor_sequencing_through_room() {
        let mut room = RoomState::default();
        room.apply(joined(7));
        room.apply(cursor(7, 0, 100.0, CursorKind::Down));
        room.apply(cursor(7, 50, 110.0, CursorKind::Move));

        let player = room.player(7).unwrap();
        assert_eq!(player.cursor_at(0, 25).map(|s| s.kind), Some(CursorKind::Down));
        assert_eq!(player.cursor_at(0, 60).map(|s| s.time), Some(50));
        assert!(player.cursor_at(0, -5).is_none());
    }

    #[test]
    fn left_player_is_not_recreated() {
        let mut room = RoomState::default();
        room.apply(joined(7));
        assert_eq!(
            room.apply(RoomMessage::PlayerLeft { uid: 7 }),
            RoomOutcome::PlayerLeft(7)
        );
        assert_eq!(
            room.apply(cursor(7, 0, 1.0, CursorKind::Move)),
            RoomOutcome::Ignored(IgnoreReason::UnknownPlayer(7))
        );
        assert!(room.player(7).is_none());
        assert!(room.snapshot(7, 0).is_none());
        assert_eq!(
            room.apply(RoomMessage::PlayerLeft { uid: 7 }),
            RoomOutcome::Ignored(IgnoreReason::UnknownPlayer(7))
        );
    }

    #[test]
    fn beatmap_change_clears_every_session() {
        let mut room = populated_room();
        let outcome = room.apply(beatmap("1001"));
        assert!(matches!(
            outcome,
            RoomOutcome::BeatmapRequested {
                phase: RoomPhase::AwaitingBeatmap(BeatmapStatus::Pending),
                ..
            }
        ));
        for uid in [7, 8] {
            assert!(room.player(uid).unwrap().is_empty());
        }
        assert_eq!(room.player_count(), 2);
    }

    #[test]
    fn same_beatmap_keeps_timelines() {
        let mut room = RoomState::default();
        room.apply(beatmap("1001"));
        room.apply(joined(7));
        room.apply(cursor(7, 0, 100.0, CursorKind::Down));
        let version = room.version();

        assert_eq!(
            room.apply(beatmap("1001")),
            RoomOutcome::Ignored(IgnoreReason::SameBeatmap)
        );
        assert!(!room.player(7).unwrap().is_empty());
        assert_eq!(room.version(), version);
    }

    #[test]
    fn beatmap_ready_enables_gameplay() {
        let mut room = populated_room();
        let id = request_id(room.apply(beatmap("1001")));
        let attributes = BeatmapAttributes {
            cs: 4.0,
            ar: 9.5,
            od: 9.0,
            hp: 5.0,
        };

        assert_eq!(
            room.beatmap_resolved(id, BeatmapOutcome::Ready(attributes)).unwrap(),
            RoomPhase::BeatmapReady
        );
        assert_eq!(room.player(7).unwrap().derived().approach_rate, 9.5);
        assert_eq!(
            room.apply(RoomMessage::GameplayStarted),
            RoomOutcome::PhaseChanged(RoomPhase::InGameplay)
        );
        assert!(room.live_time_ms(OffsetDateTime::now_utc()).is_some());
        assert_eq!(room.summary().beatmap_attributes, Some(attributes));
    }

    #[test]
    fn beatmap_failure_keeps_awaiting_and_timelines() {
        let mut room = RoomState::default();
        let id = request_id(room.apply(beatmap("404")));
        room.apply(joined(7));
        room.apply(cursor(7, 0, 1.0, CursorKind::Down));

        let phase = room
            .beatmap_resolved(id, BeatmapOutcome::Unavailable("not found".into()))
            .unwrap();
        assert_eq!(phase, RoomPhase::AwaitingBeatmap(BeatmapStatus::NotFound));
        assert!(!room.player(7).unwrap().is_empty());
        assert!(matches!(
            room.apply(RoomMessage::GameplayStarted),
            RoomOutcome::Ignored(IgnoreReason::Rejected(_))
        ));
    }

    #[test]
    fn failed_beatmap_picked_again_retries_acquisition() {
        let mut room = RoomState::default();
        let first = request_id(room.apply(beatmap("1")));
        room.apply(joined(7));
        room.apply(cursor(7, 0, 1.0, CursorKind::Down));
        room.beatmap_resolved(first, BeatmapOutcome::Unavailable("timed out".into()))
            .unwrap();
        assert!(room.pending_request().is_none());

        let outcome = room.apply(beatmap("1"));
        assert!(matches!(
            &outcome,
            RoomOutcome::BeatmapRequested {
                phase: RoomPhase::AwaitingBeatmap(BeatmapStatus::Pending),
                request,
            } if request.id != first && request.beatmap_ref == BeatmapRef("1".into())
        ));
        assert!(!room.player(7).unwrap().is_empty());

        let retry = request_id(outcome);
        room.beatmap_resolved(retry, BeatmapOutcome::Ready(BeatmapAttributes::default()))
            .unwrap();
        assert_eq!(
            room.apply(RoomMessage::GameplayStarted),
            RoomOutcome::PhaseChanged(RoomPhase::InGameplay)
        );
        assert!(!room.player(7).unwrap().is_empty());
    }

    #[test]
    fn stale_beatmap_result_is_ignored() {
        let mut room = RoomState::default();
        let first = request_id(room.apply(beatmap("1")));
        let second = request_id(room.apply(beatmap("2")));
        let version = room.version();

        let err = room
            .beatmap_resolved(first, BeatmapOutcome::Ready(BeatmapAttributes::default()))
            .unwrap_err();
        assert!(matches!(err, RoomError::StaleBeatmapRequest { got, .. } if got == first));
        assert_eq!(room.version(), version);
        assert_eq!(room.pending_request().map(|r| r.id), Some(second));

        assert_eq!(
            room.beatmap_resolved(second, BeatmapOutcome::Ready(BeatmapAttributes::default()))
                .unwrap(),
            RoomPhase::BeatmapReady
        );
    }

    #[test]
    fn events_before_gameplay_start_are_kept() {
        let mut room = RoomState::default();
        let id = request_id(room.apply(beatmap("1")));
        room.beatmap_resolved(id, BeatmapOutcome::Ready(BeatmapAttributes::default()))
            .unwrap();
        room.apply(joined(7));
        room.apply(cursor(7, -200, 5.0, CursorKind::Move));
        room.apply(RoomMessage::GameplayStarted);

        let snapshot = room.snapshot(7, 0).unwrap();
        assert_eq!(snapshot.cursors[&0], Some(Position::new(5.0, 100.0)));
        assert_eq!(room.snapshot(7, -300).unwrap().cursors[&0], None);
    }

    #[test]
    fn messages_after_gameplay_end_are_stored_until_next_round() {
        let mut room = RoomState::default();
        let id = request_id(room.apply(beatmap("1")));
        room.beatmap_resolved(id, BeatmapOutcome::Ready(BeatmapAttributes::default()))
            .unwrap();
        room.apply(joined(7));
        room.apply(RoomMessage::GameplayStarted);
        room.apply(RoomMessage::GameplayEnded);

        assert_eq!(
            room.apply(RoomMessage::StatCheckpoint {
                uid: 7,
                kind: StatKind::Score,
                sample: StatSample::new(90_000, 1_000_000.0),
            }),
            RoomOutcome::Stored
        );
        assert_eq!(
            room.snapshot(7, 100_000).unwrap().score,
            Some(1_000_000.0)
        );

        room.apply(RoomMessage::GameplayStarted);
        assert_eq!(room.phase(), RoomPhase::InGameplay);
        assert!(room.player(7).unwrap().is_empty());
    }

    #[test]
    fn mods_change_recomputes_for_player() {
        let mut room = RoomState::default();
        room.apply(joined(7));
        assert_eq!(
            room.apply(RoomMessage::ModsChanged {
                uid: 7,
                mods: vec![GameMod::plain("DT")],
            }),
            RoomOutcome::SettingsChanged
        );
        assert_eq!(room.player(7).unwrap().derived().clock_rate, 1.5);
        assert_eq!(
            room.apply(RoomMessage::ModsChanged {
                uid: 9,
                mods: Vec::new(),
            }),
            RoomOutcome::Ignored(IgnoreReason::UnknownPlayer(9))
        );
    }

    #[test]
    fn reset_destroys_sessions() {
        let mut room = populated_room();
        room.apply(beatmap("1"));
        room.apply(RoomMessage::TeamModeChanged { team_mode: true });

        assert_eq!(room.reset().unwrap(), RoomPhase::Empty);
        let summary = room.summary();
        assert!(summary.players.is_empty());
        assert_eq!(summary.beatmap_ref, None);
        assert!(!summary.team_mode);
        assert!(room.pending_request().is_none());
    }

    #[test]
    fn invalid_lifecycle_message_changes_nothing() {
        let mut room = populated_room();
        let before = room.summary();
        assert!(matches!(
            room.apply(RoomMessage::GameplayEnded),
            RoomOutcome::Ignored(IgnoreReason::Rejected(_))
        ));
        assert_eq!(room.summary(), before);
    }
}
