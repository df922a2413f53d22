use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        phase::VisibleRoomPhase,
        sse::{
            BeatmapStatusEvent, BeatmapStatusKind, PhaseChangedEvent, PlayerJoinedEvent,
            PlayerLeftEvent, RoomResetEvent, ServerEvent,
        },
    },
    state::{SseHub, room::BeatmapRef, state_machine::RoomPhase},
};

const EVENT_PHASE_CHANGED: &str = "phase_changed";
const EVENT_PLAYER_JOINED: &str = "player.joined";
const EVENT_PLAYER_LEFT: &str = "player.left";
const EVENT_BEATMAP_STATUS: &str = "beatmap.status";
const EVENT_ROOM_RESET: &str = "room.reset";

/// Broadcast the room phase after a transition.
pub fn broadcast_phase_changed(hub: &SseHub, phase: RoomPhase, version: usize) {
    let payload = PhaseChangedEvent {
        phase: VisibleRoomPhase::from(&phase),
        version,
    };
    send_public_event(hub, EVENT_PHASE_CHANGED, &payload);
}

/// Broadcast that a player got a session.
pub fn broadcast_player_joined(hub: &SseHub, uid: u32, username: &str, team: Option<u8>) {
    let payload = PlayerJoinedEvent {
        uid,
        username: username.to_string(),
        team,
    };
    send_public_event(hub, EVENT_PLAYER_JOINED, &payload);
}

/// Broadcast that a player's session was destroyed.
pub fn broadcast_player_left(hub: &SseHub, uid: u32) {
    send_public_event(hub, EVENT_PLAYER_LEFT, &PlayerLeftEvent { uid });
}

/// Broadcast the progress of the beatmap acquisition.
pub fn broadcast_beatmap_status(
    hub: &SseHub,
    beatmap_ref: &BeatmapRef,
    status: BeatmapStatusKind,
    message: Option<String>,
) {
    let payload = BeatmapStatusEvent {
        beatmap_ref: beatmap_ref.to_string(),
        status,
        message,
    };
    send_public_event(hub, EVENT_BEATMAP_STATUS, &payload);
}

/// Broadcast that the room was torn down.
pub fn broadcast_room_reset(hub: &SseHub, version: usize) {
    send_public_event(hub, EVENT_ROOM_RESET, &RoomResetEvent { version });
}

fn send_public_event<T>(hub: &SseHub, event: &str, payload: &T)
where
    T: Serialize,
{
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(message) => hub.broadcast(message),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
