use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use time::OffsetDateTime;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::room::IngestReport,
    services::ingest_service,
    state::{FeedConnection, SharedState},
};

/// Handle the full lifecycle of one ingest feed connection.
///
/// Every text frame carries one or more newline-separated messages, applied in
/// the order received.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Replies go through the writer task; pings are answered between frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let feed_id = Uuid::new_v4();
    state.feeds().insert(
        feed_id,
        FeedConnection {
            connected_at: OffsetDateTime::now_utc(),
        },
    );
    info!(%feed_id, "ingest feed connected");

    let mut totals = IngestReport::default();

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                ingest_frame(&state, text.as_str(), &mut totals).await;
            }
            Ok(Message::Binary(bytes)) => match std::str::from_utf8(&bytes) {
                Ok(text) => ingest_frame(&state, text, &mut totals).await,
                Err(err) => {
                    warn!(%feed_id, error = %err, "dropping binary frame that is not UTF-8");
                    totals.rejected += 1;
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(%feed_id, "ingest feed closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%feed_id, error = %err, "websocket error");
                break;
            }
        }
    }

    let connected_ms = state
        .feeds()
        .remove(&feed_id)
        .map(|(_, feed)| (OffsetDateTime::now_utc() - feed.connected_at).whole_milliseconds() as i64);
    info!(
        %feed_id,
        connected_ms,
        accepted = totals.accepted,
        ignored = totals.ignored,
        rejected = totals.rejected,
        "ingest feed disconnected"
    );

    finalize(writer_task, outbound_tx).await;
}

async fn ingest_frame(state: &SharedState, frame: &str, totals: &mut IngestReport) {
    let report = ingest_service::ingest_batch(state, frame).await;
    debug!(
        accepted = report.accepted,
        ignored = report.ignored,
        rejected = report.rejected,
        "ingested frame"
    );
    totals.merge(&report);
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
