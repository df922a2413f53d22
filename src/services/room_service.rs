use time::OffsetDateTime;

use crate::{
    dto::room::{PlayerSnapshotResponse, PlayerSummaryDto, RoomSummaryResponse},
    error::ServiceError,
    services::sse_events,
    state::{SharedState, room::RoomSummary},
};

/// Room-level projection.
pub async fn room_summary(state: &SharedState) -> RoomSummaryResponse {
    let summary = state.read_room(|room| room.summary()).await;
    RoomSummaryResponse::new(summary, OffsetDateTime::now_utc())
}

/// Every spectated player in join order.
pub async fn list_players(state: &SharedState) -> Vec<PlayerSummaryDto> {
    state
        .read_room(|room| room.players())
        .await
        .into_iter()
        .map(PlayerSummaryDto::from)
        .collect()
}

/// State of one player at `time`.
///
/// Without an explicit time the live playback head is used, or the latest
/// stored state when no round has started.
pub async fn player_snapshot(
    state: &SharedState,
    uid: u32,
    time: Option<i64>,
) -> Result<PlayerSnapshotResponse, ServiceError> {
    let now = OffsetDateTime::now_utc();
    state
        .read_room(|room| {
            let time = time
                .or_else(|| room.live_time_ms(now))
                .unwrap_or(i64::MAX);
            room.snapshot(uid, time)
        })
        .await
        .map(PlayerSnapshotResponse::from)
        .ok_or_else(|| ServiceError::NotFound(format!("player `{uid}` is not in the room")))
}

/// Destroy every session and return the room to `Empty`. Any running beatmap
/// acquisition is cancelled.
pub async fn reset_room(state: &SharedState) -> Result<RoomSummaryResponse, ServiceError> {
    let hub = state.sse();
    let summary = state
        .with_room_mut(|room| -> Result<RoomSummary, ServiceError> {
            let phase = room.reset()?;
            state.replace_beatmap_task(None);
            sse_events::broadcast_room_reset(hub, room.version());
            sse_events::broadcast_phase_changed(hub, phase, room.version());
            Ok(room.summary())
        })
        .await?;
    Ok(RoomSummaryResponse::new(summary, OffsetDateTime::now_utc()))
}
