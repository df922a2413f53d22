use tracing::warn;

use crate::{
    dto::{health::HealthResponse, phase::VisibleRoomPhase},
    state::{
        SharedState,
        state_machine::{BeatmapStatus, RoomPhase},
    },
};

/// Report the room phase, flagging a beatmap collaborator that could not deliver.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let phase = state.read_room(|room| room.phase()).await;
    let visible = VisibleRoomPhase::from(&phase);
    let feeds = state.feeds().len();
    let provider = state.beatmaps();

    if phase == RoomPhase::AwaitingBeatmap(BeatmapStatus::NotFound) {
        warn!(provider = provider.name(), "current beatmap could not be acquired");
        HealthResponse::degraded(visible, feeds, provider.name())
    } else {
        HealthResponse::ok(visible, feeds, provider.name())
    }
}
