/// Beatmap acquisition through the configured provider.
pub mod beatmap_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Decoding and dispatch of inbound feed messages.
pub mod ingest_service;
/// Read-only room queries and room reset.
pub mod room_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// WebSocket ingest feed handling.
pub mod websocket_service;
