use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::phase::VisibleRoomPhase;

#[derive(Clone, Debug)]
/// Dispatched payload carried across the SSE channel.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already formatted data field.
    pub fn new<E>(event: E, data: String) -> Self
    where
        E: Into<Option<String>>,
    {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast whenever the room phase changes.
pub struct PhaseChangedEvent {
    pub phase: VisibleRoomPhase,
    pub version: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a player gets a session.
pub struct PlayerJoinedEvent {
    pub uid: u32,
    pub username: String,
    pub team: Option<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a player's session is destroyed.
pub struct PlayerLeftEvent {
    pub uid: u32,
}

#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Progress of the beatmap acquisition.
pub enum BeatmapStatusKind {
    Pending,
    Ready,
    NotFound,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a beatmap is picked and when its acquisition completes.
pub struct BeatmapStatusEvent {
    pub beatmap_ref: String,
    pub status: BeatmapStatusKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after the room was torn down.
pub struct RoomResetEvent {
    pub version: usize,
}
