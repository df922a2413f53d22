use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use utoipa::{IntoParams, ToSchema};

use crate::{
    dto::{format_timestamp, phase::VisibleRoomPhase},
    state::{
        data_manager::{EventCounts, PlayerSnapshot},
        events::{HitResult, JudgementEvent, Position},
        mods::{BeatmapAttributes, DerivedParameters, GameMod},
        room::{PlayerSummary, RoomSummary},
    },
};

/// Room-level projection returned by `GET /room`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryResponse {
    pub phase: VisibleRoomPhase,
    pub version: usize,
    pub beatmap_ref: Option<String>,
    pub beatmap_attributes: Option<BeatmapAttributes>,
    pub team_mode: bool,
    /// RFC 3339 instant gameplay started.
    pub gameplay_started_at: Option<String>,
    /// Live playback head in milliseconds, while a round is running or just ended.
    pub live_time_ms: Option<i64>,
    pub players: Vec<PlayerSummaryDto>,
}

impl RoomSummaryResponse {
    /// Build the response for `summary`, computing the playback head at `now`.
    pub fn new(summary: RoomSummary, now: OffsetDateTime) -> Self {
        let live_time_ms = summary
            .gameplay_started_at
            .map(|started| (now - started).whole_milliseconds() as i64);
        Self {
            phase: VisibleRoomPhase::from(&summary.phase),
            version: summary.version,
            beatmap_ref: summary.beatmap_ref.map(|reference| reference.0),
            beatmap_attributes: summary.beatmap_attributes,
            team_mode: summary.team_mode,
            gameplay_started_at: summary.gameplay_started_at.map(format_timestamp),
            live_time_ms,
            players: summary
                .players
                .into_iter()
                .map(PlayerSummaryDto::from)
                .collect(),
        }
    }
}

/// Stored events per category.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventCountsDto {
    pub cursor_samples: usize,
    pub judgements: usize,
    pub checkpoints: usize,
    pub deltas: usize,
}

impl From<EventCounts> for EventCountsDto {
    fn from(value: EventCounts) -> Self {
        Self {
            cursor_samples: value.cursor_samples,
            judgements: value.judgements,
            checkpoints: value.checkpoints,
            deltas: value.deltas,
        }
    }
}

/// One spectated player.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummaryDto {
    pub uid: u32,
    pub username: String,
    pub team: Option<u8>,
    pub mods: Vec<GameMod>,
    pub derived: DerivedParameters,
    pub counts: EventCountsDto,
}

impl From<PlayerSummary> for PlayerSummaryDto {
    fn from(value: PlayerSummary) -> Self {
        Self {
            uid: value.uid,
            username: value.username,
            team: value.team,
            mods: value.mods,
            derived: value.derived,
            counts: value.counts.into(),
        }
    }
}

/// Last judgement shown in a snapshot.
#[derive(Debug, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JudgementDto {
    pub time: i64,
    pub result: HitResult,
    pub accuracy_offset_ms: f64,
}

impl From<JudgementEvent> for JudgementDto {
    fn from(value: JudgementEvent) -> Self {
        Self {
            time: value.time,
            result: value.result,
            accuracy_offset_ms: value.accuracy_offset_ms,
        }
    }
}

/// Consolidated view of one player at a point in time.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshotResponse {
    pub uid: u32,
    pub time: i64,
    /// Position per cursor group, `null` while the cursor is lifted.
    #[schema(value_type = Object)]
    pub cursors: BTreeMap<u32, Option<Position>>,
    pub last_judgement: Option<JudgementDto>,
    pub score: Option<f64>,
    pub combo: Option<f64>,
    pub accuracy: Option<f64>,
}

impl From<PlayerSnapshot> for PlayerSnapshotResponse {
    fn from(value: PlayerSnapshot) -> Self {
        Self {
            uid: value.uid,
            time: value.time,
            cursors: value.cursors,
            last_judgement: value.last_judgement.map(JudgementDto::from),
            score: value.score,
            combo: value.combo,
            accuracy: value.accuracy,
        }
    }
}

/// Query string of the snapshot endpoint.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SnapshotQuery {
    /// Playback time in milliseconds. Defaults to the live playback head, or the
    /// latest stored state when no round is running.
    pub time: Option<i64>,
}

/// Per-line result of an ingest batch.
#[derive(Debug, Default, Serialize, ToSchema, PartialEq, Eq)]
pub struct IngestReport {
    /// Lines applied to the room.
    pub accepted: usize,
    /// Well-formed lines that changed nothing (unknown kind or player, no-op).
    pub ignored: usize,
    /// Malformed or invalid lines.
    pub rejected: usize,
}

impl IngestReport {
    /// Add the counts of `other` to this report.
    pub fn merge(&mut self, other: &IngestReport) {
        self.accepted += other.accepted;
        self.ignored += other.ignored;
        self.rejected += other.rejected;
    }
}
