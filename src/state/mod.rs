pub mod data_manager;
pub mod event_manager;
pub mod events;
pub mod mods;
pub mod room;
mod sse;
pub mod stat_track;
pub mod state_machine;
pub mod timeline;

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use time::OffsetDateTime;
use tokio::{sync::RwLock, task::AbortHandle};
use uuid::Uuid;

use crate::{config::AppConfig, dao::beatmap::BeatmapProvider, state::room::RoomState};

pub use self::sse::SseHub;
pub use self::state_machine::{AbortError, ApplyError, PlanError};

pub type SharedState = Arc<AppState>;

#[derive(Debug, Clone, Copy)]
/// Registry entry of a connected ingest feed.
pub struct FeedConnection {
    /// When the feed connected.
    pub connected_at: OffsetDateTime,
}

/// Central application state: the spectated room, its notification stream and
/// the beatmap collaborator.
pub struct AppState {
    config: Arc<AppConfig>,
    room: RwLock<RoomState>,
    sse: SseHub,
    feeds: DashMap<Uuid, FeedConnection>,
    beatmaps: Arc<dyn BeatmapProvider>,
    beatmap_task: Mutex<Option<AbortHandle>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, beatmaps: Arc<dyn BeatmapProvider>) -> SharedState {
        let room = RoomState::new(config.default_attributes());
        Arc::new(Self {
            sse: SseHub::new(config.sse_capacity()),
            config: Arc::new(config),
            room: RwLock::new(room),
            feeds: DashMap::new(),
            beatmaps,
            beatmap_task: Mutex::new(None),
        })
    }

    /// Application configuration loaded at startup.
    pub fn config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// Broadcast hub used for the viewer SSE stream.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// Registry of active ingest sockets keyed by connection id.
    pub fn feeds(&self) -> &DashMap<Uuid, FeedConnection> {
        &self.feeds
    }

    /// Beatmap collaborator.
    pub fn beatmaps(&self) -> Arc<dyn BeatmapProvider> {
        Arc::clone(&self.beatmaps)
    }

    /// Run `f` against a consistent view of the room.
    pub async fn read_room<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&RoomState) -> T,
    {
        let guard = self.room.read().await;
        f(&guard)
    }

    /// Run `f` with exclusive access to the room. The whole closure runs under
    /// one write-lock acquisition, so readers never observe a partial update.
    pub async fn with_room_mut<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut RoomState) -> T,
    {
        let mut guard = self.room.write().await;
        f(&mut guard)
    }

    /// Track the running beatmap acquisition, aborting the one it supersedes.
    ///
    /// Callers hold the room write lock so the stored handle always belongs to
    /// the request the room is awaiting.
    pub fn replace_beatmap_task(&self, handle: Option<AbortHandle>) {
        let mut guard = self
            .beatmap_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = std::mem::replace(&mut *guard, handle) {
            previous.abort();
        }
    }
}
