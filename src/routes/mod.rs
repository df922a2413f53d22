use axum::Router;

use crate::state::SharedState;

pub mod docs;
pub mod health;
pub mod room;
pub mod sse;
pub mod websocket;

/// Compose all route trees and attach the shared state.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(websocket::router())
        .merge(room::router())
        .merge(docs::router());

    api_router.with_state(state)
}
