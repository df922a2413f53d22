use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    dto::sse::BeatmapStatusKind,
    error::ServiceError,
    services::sse_events,
    state::{
        SharedState,
        room::{BeatmapOutcome, BeatmapRequest},
        state_machine::RoomPhase,
    },
};

/// Start acquiring `request` in the background, aborting any acquisition it supersedes.
///
/// Must be called while holding the room write lock, right after the room issued
/// the request, so the tracked task always matches the awaited request.
pub fn spawn_acquisition(state: &SharedState, request: BeatmapRequest) {
    info!(
        beatmap_ref = %request.beatmap_ref,
        request_id = %request.id,
        provider = state.beatmaps().name(),
        "acquiring beatmap"
    );

    let task_state = Arc::clone(state);
    let task = tokio::spawn(async move {
        let request_id = request.id;
        match acquire(&task_state, request).await {
            Ok(phase) => debug!(%request_id, ?phase, "beatmap acquisition recorded"),
            Err(err) => debug!(%request_id, error = %err, "beatmap acquisition discarded"),
        }
    });
    state.replace_beatmap_task(Some(task.abort_handle()));
}

/// Resolve `request` through the configured provider and record the outcome.
///
/// Provider failures and timeouts are recorded as an unavailable beatmap.
pub async fn acquire(
    state: &SharedState,
    request: BeatmapRequest,
) -> Result<RoomPhase, ServiceError> {
    let provider = state.beatmaps();
    let limit = state.config().beatmap_timeout();

    let outcome = match timeout(limit, provider.resolve(&request.beatmap_ref)).await {
        Ok(Ok(attributes)) => BeatmapOutcome::Ready(attributes),
        Ok(Err(err)) => {
            warn!(beatmap_ref = %request.beatmap_ref, error = %err, "beatmap acquisition failed");
            BeatmapOutcome::Unavailable(err.to_string())
        }
        Err(_) => {
            warn!(beatmap_ref = %request.beatmap_ref, ?limit, "beatmap acquisition timed out");
            BeatmapOutcome::Unavailable(format!("timed out after {} ms", limit.as_millis()))
        }
    };

    record_outcome(state, &request, outcome).await
}

/// Hand a collaborator result to the room and notify viewers.
pub async fn record_outcome(
    state: &SharedState,
    request: &BeatmapRequest,
    outcome: BeatmapOutcome,
) -> Result<RoomPhase, ServiceError> {
    let hub = state.sse();
    state
        .with_room_mut(|room| -> Result<RoomPhase, ServiceError> {
            let (status, message) = match &outcome {
                BeatmapOutcome::Ready(_) => (BeatmapStatusKind::Ready, None),
                BeatmapOutcome::Unavailable(reason) => {
                    (BeatmapStatusKind::NotFound, Some(reason.clone()))
                }
            };
            let phase = room.beatmap_resolved(request.id, outcome)?;
            sse_events::broadcast_beatmap_status(hub, &request.beatmap_ref, status, message);
            sse_events::broadcast_phase_changed(hub, phase, room.version());
            Ok(phase)
        })
        .await
}
