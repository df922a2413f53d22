use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Spectator Sync Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::stream,
        crate::routes::websocket::ws_handler,
        crate::routes::room::get_room,
        crate::routes::room::get_players,
        crate::routes::room::get_player_snapshot,
        crate::routes::room::ingest,
        crate::routes::room::reset,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::InboundMessage,
            crate::dto::room::RoomSummaryResponse,
            crate::dto::room::PlayerSummaryDto,
            crate::dto::room::PlayerSnapshotResponse,
            crate::dto::room::IngestReport,
            crate::dto::sse::PhaseChangedEvent,
            crate::dto::sse::PlayerJoinedEvent,
            crate::dto::sse::PlayerLeftEvent,
            crate::dto::sse::BeatmapStatusEvent,
            crate::dto::sse::RoomResetEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams"),
        (name = "feed", description = "Spectator data ingestion"),
        (name = "room", description = "Room queries and control"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_room_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/room/players/{uid}/snapshot"));
        assert!(doc.paths.paths.contains_key("/room/ingest"));
    }

    #[test]
    fn snapshot_cursors_are_documented_as_an_object() {
        let doc = serde_json::to_value(ApiDoc::openapi()).unwrap();
        let cursors = &doc["components"]["schemas"]["PlayerSnapshotResponse"]["properties"]["cursors"];
        assert_eq!(cursors["type"], "object");
    }
}
