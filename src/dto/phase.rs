use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::{BeatmapStatus, RoomPhase};

/// Publicly visible room phase exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleRoomPhase {
    /// No beatmap picked.
    Empty,
    /// Beatmap picked, attributes being acquired.
    AwaitingBeatmap,
    /// The beatmap could not be acquired.
    BeatmapNotFound,
    /// Beatmap attributes known.
    BeatmapReady,
    /// Gameplay is live.
    InGameplay,
    /// The round finished.
    GameplayEnded,
}

impl From<&RoomPhase> for VisibleRoomPhase {
    fn from(value: &RoomPhase) -> Self {
        match value {
            RoomPhase::Empty => VisibleRoomPhase::Empty,
            RoomPhase::AwaitingBeatmap(BeatmapStatus::Pending) => {
                VisibleRoomPhase::AwaitingBeatmap
            }
            RoomPhase::AwaitingBeatmap(BeatmapStatus::NotFound) => {
                VisibleRoomPhase::BeatmapNotFound
            }
            RoomPhase::BeatmapReady => VisibleRoomPhase::BeatmapReady,
            RoomPhase::InGameplay => VisibleRoomPhase::InGameplay,
            RoomPhase::GameplayEnded => VisibleRoomPhase::GameplayEnded,
        }
    }
}
