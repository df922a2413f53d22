use dashmap::DashMap;
use futures::future::{self, BoxFuture, FutureExt};

use crate::{
    dao::beatmap::{BeatmapError, BeatmapProvider, BeatmapResult},
    state::{mods::BeatmapAttributes, room::BeatmapRef},
};

/// Provider answering from an in-memory table, seeded from configuration.
#[derive(Debug, Default)]
pub struct StaticBeatmapProvider {
    beatmaps: DashMap<BeatmapRef, BeatmapAttributes>,
}

impl StaticBeatmapProvider {
    /// Create a provider knowing `beatmaps`.
    pub fn new(beatmaps: impl IntoIterator<Item = (BeatmapRef, BeatmapAttributes)>) -> Self {
        Self {
            beatmaps: beatmaps.into_iter().collect(),
        }
    }
}

impl BeatmapProvider for StaticBeatmapProvider {
    fn resolve(&self, reference: &BeatmapRef) -> BoxFuture<'static, BeatmapResult<BeatmapAttributes>> {
        let result = self
            .beatmaps
            .get(reference)
            .map(|entry| *entry.value())
            .ok_or_else(|| BeatmapError::NotFound(reference.clone()));
        future::ready(result).boxed()
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_known_and_rejects_unknown() {
        let known = BeatmapRef("129891".into());
        let provider = StaticBeatmapProvider::new([(known.clone(), BeatmapAttributes::default())]);

        assert_eq!(
            provider.resolve(&known).await.unwrap(),
            BeatmapAttributes::default()
        );
        assert!(matches!(
            provider.resolve(&BeatmapRef("1".into())).await,
            Err(BeatmapError::NotFound(_))
        ));
    }
}
