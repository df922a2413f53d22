use std::convert::Infallible;

use axum::{Router, extract::State, response::sse::Sse, routing::get};
use futures::Stream;
use tracing::info;

use crate::{services::sse_service, state::SharedState};

#[utoipa::path(
    get,
    path = "/sse",
    tag = "sse",
    responses((status = 200, description = "Room notification stream", content_type = "text/event-stream", body = String))
)]
/// Stream room notifications to connected viewers.
pub async fn stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>> {
    let receiver = sse_service::subscribe(&state);
    info!(viewers = state.sse().subscriber_count(), "new SSE connection");
    sse_service::broadcast_info(state.sse(), "viewer connected");
    sse_service::to_sse_stream(receiver)
}

/// Configure the SSE endpoint.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse", get(stream))
}
