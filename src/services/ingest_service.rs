use tracing::warn;

use crate::{
    dto::{room::IngestReport, sse::BeatmapStatusKind, ws::InboundMessage},
    services::{beatmap_service, sse_events},
    state::{
        SharedState, SseHub,
        room::{RoomMessage, RoomOutcome, RoomState},
    },
};

/// What happened to one inbound line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStatus {
    /// The room changed.
    Accepted,
    /// Well-formed, but nothing changed.
    Ignored,
    /// Malformed or invalid.
    Rejected,
}

/// Decode and apply one line of the feed. Blank lines yield `None`.
pub async fn ingest_line(state: &SharedState, line: &str) -> Option<IngestStatus> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let inbound = match InboundMessage::from_json_str(line) {
        Ok(message) => message,
        Err(err) => {
            warn!(error = %err, "dropping inbound message");
            return Some(IngestStatus::Rejected);
        }
    };

    let Some(message) = inbound.into_room_message() else {
        warn!(payload = %line, "dropping message of unknown kind");
        return Some(IngestStatus::Ignored);
    };

    match apply_message(state, message).await {
        RoomOutcome::Ignored(_) => Some(IngestStatus::Ignored),
        _ => Some(IngestStatus::Accepted),
    }
}

/// Apply every line of a newline-delimited batch in order.
pub async fn ingest_batch(state: &SharedState, body: &str) -> IngestReport {
    let mut report = IngestReport::default();
    for line in body.lines() {
        match ingest_line(state, line).await {
            Some(IngestStatus::Accepted) => report.accepted += 1,
            Some(IngestStatus::Ignored) => report.ignored += 1,
            Some(IngestStatus::Rejected) => report.rejected += 1,
            None => {}
        }
    }
    report
}

/// Apply a decoded message under one write-lock acquisition, notify viewers
/// and start the beatmap acquisition a beatmap change asks for.
pub async fn apply_message(state: &SharedState, message: RoomMessage) -> RoomOutcome {
    let hub = state.sse();
    state
        .with_room_mut(|room| {
            let outcome = room.apply(message);
            notify(hub, room, &outcome);
            if let RoomOutcome::BeatmapRequested { request, .. } = &outcome {
                beatmap_service::spawn_acquisition(state, request.clone());
            }
            outcome
        })
        .await
}

fn notify(hub: &SseHub, room: &RoomState, outcome: &RoomOutcome) {
    match outcome {
        RoomOutcome::PlayerJoined(uid) => {
            if let Some(player) = room.player(*uid) {
                sse_events::broadcast_player_joined(hub, *uid, player.username(), player.team());
            }
        }
        RoomOutcome::PlayerLeft(uid) => sse_events::broadcast_player_left(hub, *uid),
        RoomOutcome::PhaseChanged(phase) => {
            sse_events::broadcast_phase_changed(hub, *phase, room.version())
        }
        RoomOutcome::BeatmapRequested { phase, request } => {
            sse_events::broadcast_phase_changed(hub, *phase, room.version());
            sse_events::broadcast_beatmap_status(
                hub,
                &request.beatmap_ref,
                BeatmapStatusKind::Pending,
                None,
            );
        }
        RoomOutcome::Stored | RoomOutcome::SettingsChanged | RoomOutcome::Ignored(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::beatmap::StaticBeatmapProvider,
        state::{
            AppState,
            mods::BeatmapAttributes,
            room::BeatmapRef,
            state_machine::{BeatmapStatus, RoomPhase},
        },
    };

    fn state() -> SharedState {
        let provider =
            StaticBeatmapProvider::new([(BeatmapRef("75".into()), BeatmapAttributes::default())]);
        AppState::new(AppConfig::default(), Arc::new(provider))
    }

    async fn wait_for_phase(state: &SharedState, expected: RoomPhase) {
        for _ in 0..50 {
            if state.read_room(|room| room.phase()).await == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("room never reached {expected:?}");
    }

    #[tokio::test]
    async fn batch_counts_every_line() {
        let state = state();
        let body = concat!(
            r#"{"kind":"PlayerJoined","uid":7}"#,
            "\n",
            r#"{"kind":"Cursor","uid":7,"groupId":0,"time":0,"position":{"x":100,"y":100},"cursorKind":"down"}"#,
            "\n\n",
            r#"{"kind":"Cursor","uid":9,"groupId":0,"time":0,"position":{"x":1,"y":1},"cursorKind":"down"}"#,
            "\n",
            r#"{"kind":"Spectate","uid":7}"#,
            "\n",
            "{broken\n",
        );

        let report = ingest_batch(&state, body).await;
        assert_eq!(
            report,
            IngestReport {
                accepted: 2,
                ignored: 2,
                rejected: 1,
            }
        );
        let snapshot = state.read_room(|room| room.snapshot(7, 10)).await.unwrap();
        assert!(snapshot.cursors[&0].is_some());
    }

    #[tokio::test]
    async fn joins_are_broadcast_to_viewers() {
        let state = state();
        let mut receiver = state.sse().subscribe();

        ingest_line(&state, r#"{"kind":"PlayerJoined","uid":"7","username":"cookiezi"}"#).await;
        ingest_line(&state, r#"{"kind":"PlayerJoined","uid":7}"#).await;

        let joined = receiver.try_recv().unwrap();
        assert_eq!(joined.event.as_deref(), Some("player.joined"));
        assert!(joined.data.contains("cookiezi"));
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn beatmap_change_triggers_acquisition() {
        let state = state();
        assert_eq!(
            ingest_line(&state, r#"{"kind":"BeatmapChanged","beatmapRef":"75"}"#).await,
            Some(IngestStatus::Accepted)
        );
        wait_for_phase(&state, RoomPhase::BeatmapReady).await;

        ingest_line(&state, r#"{"kind":"BeatmapChanged","beatmapRef":"404"}"#).await;
        wait_for_phase(&state, RoomPhase::AwaitingBeatmap(BeatmapStatus::NotFound)).await;
    }
}
