//! Boundary to the beatmap acquisition collaborator.

mod memory;
#[cfg(feature = "mirror")]
mod mirror;

use std::error::Error;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::state::{mods::BeatmapAttributes, room::BeatmapRef};

pub use self::memory::StaticBeatmapProvider;
#[cfg(feature = "mirror")]
pub use self::mirror::{MirrorBeatmapProvider, MirrorConfig};

/// Result alias for beatmap acquisition.
pub type BeatmapResult<T> = Result<T, BeatmapError>;

/// Failures reported by a beatmap provider.
#[derive(Debug, Error)]
pub enum BeatmapError {
    /// The provider does not know the beatmap.
    #[error("beatmap `{0}` not found")]
    NotFound(BeatmapRef),
    /// The provider could not be reached or answered garbage.
    #[error("beatmap provider unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl BeatmapError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        BeatmapError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

/// Resolves a beatmap reference into the attributes the spectator core needs.
///
/// Implementations own download, parsing and difficulty computation; the core
/// only consumes the outcome.
pub trait BeatmapProvider: Send + Sync {
    /// Resolve the attributes of `reference`.
    fn resolve(&self, reference: &BeatmapRef) -> BoxFuture<'static, BeatmapResult<BeatmapAttributes>>;
    /// Human readable provider name for logs and health output.
    fn name(&self) -> &'static str;
}
