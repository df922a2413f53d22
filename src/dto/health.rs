use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::phase::VisibleRoomPhase;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Current room phase.
    pub phase: VisibleRoomPhase,
    /// Connected ingest feeds.
    pub feeds: usize,
    /// Beatmap provider in use.
    pub beatmap_provider: String,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(phase: VisibleRoomPhase, feeds: usize, beatmap_provider: &str) -> Self {
        Self {
            status: "ok".to_string(),
            phase,
            feeds,
            beatmap_provider: beatmap_provider.to_string(),
        }
    }

    /// Create a health response indicating the beatmap collaborator failed.
    pub fn degraded(phase: VisibleRoomPhase, feeds: usize, beatmap_provider: &str) -> Self {
        Self {
            status: "degraded".to_string(),
            ..Self::ok(phase, feeds, beatmap_provider)
        }
    }
}
