use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use crate::{
    dto::room::{
        IngestReport, PlayerSnapshotResponse, PlayerSummaryDto, RoomSummaryResponse,
        SnapshotQuery,
    },
    error::AppError,
    services::{ingest_service, room_service},
    state::SharedState,
};

/// Room queries, batch ingestion and reset.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/room", get(get_room))
        .route("/room/players", get(get_players))
        .route("/room/players/{uid}/snapshot", get(get_player_snapshot))
        .route("/room/ingest", post(ingest))
        .route("/room/reset", post(reset))
}

#[utoipa::path(
    get,
    path = "/room",
    tag = "room",
    responses((status = 200, description = "Current room", body = RoomSummaryResponse))
)]
/// Return the room phase, beatmap and players.
pub async fn get_room(State(state): State<SharedState>) -> Json<RoomSummaryResponse> {
    Json(room_service::room_summary(&state).await)
}

#[utoipa::path(
    get,
    path = "/room/players",
    tag = "room",
    responses((status = 200, description = "Spectated players", body = [PlayerSummaryDto]))
)]
/// Return every spectated player in join order.
pub async fn get_players(State(state): State<SharedState>) -> Json<Vec<PlayerSummaryDto>> {
    Json(room_service::list_players(&state).await)
}

#[utoipa::path(
    get,
    path = "/room/players/{uid}/snapshot",
    tag = "room",
    params(
        ("uid" = u32, Path, description = "Player identifier"),
        SnapshotQuery
    ),
    responses(
        (status = 200, description = "Player state at the requested time", body = PlayerSnapshotResponse),
        (status = 404, description = "Player is not in the room")
    )
)]
/// Return the consolidated state of one player at a playback time.
pub async fn get_player_snapshot(
    State(state): State<SharedState>,
    Path(uid): Path<u32>,
    Query(query): Query<SnapshotQuery>,
) -> Result<Json<PlayerSnapshotResponse>, AppError> {
    let payload = room_service::player_snapshot(&state, uid, query.time).await?;
    Ok(Json(payload))
}

#[utoipa::path(
    post,
    path = "/room/ingest",
    tag = "feed",
    request_body(content = String, description = "Newline-delimited inbound messages", content_type = "application/x-ndjson"),
    responses((status = 200, description = "Per-line outcome counts", body = IngestReport))
)]
/// Apply a batch of newline-delimited messages in order.
pub async fn ingest(State(state): State<SharedState>, body: String) -> Json<IngestReport> {
    Json(ingest_service::ingest_batch(&state, &body).await)
}

#[utoipa::path(
    post,
    path = "/room/reset",
    tag = "room",
    responses(
        (status = 200, description = "Room after the reset", body = RoomSummaryResponse),
        (status = 409, description = "Reset rejected by the room lifecycle")
    )
)]
/// Destroy every session and return the room to its empty phase.
pub async fn reset(State(state): State<SharedState>) -> Result<Json<RoomSummaryResponse>, AppError> {
    let payload = room_service::reset_room(&state).await?;
    Ok(Json(payload))
}
