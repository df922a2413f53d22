use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::{
    dao::beatmap::{BeatmapError, BeatmapProvider, BeatmapResult},
    state::{mods::BeatmapAttributes, room::BeatmapRef},
};

/// Runtime configuration describing how to reach the beatmap mirror.
#[derive(Debug, Clone)]
pub struct MirrorConfig {
    /// Mirror root, with or without a trailing slash.
    pub base_url: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
}

impl MirrorConfig {
    /// Construct a configuration from an explicit base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
        }
    }

    /// Attach a bearer token sent with every request.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

/// Attributes document served by the mirror.
#[derive(Debug, Deserialize)]
struct MirrorAttributes {
    #[serde(alias = "circle_size")]
    cs: f32,
    #[serde(alias = "approach_rate")]
    ar: f32,
    #[serde(alias = "overall_difficulty", alias = "accuracy")]
    od: f32,
    #[serde(alias = "drain")]
    hp: f32,
}

impl From<MirrorAttributes> for BeatmapAttributes {
    fn from(value: MirrorAttributes) -> Self {
        Self {
            cs: value.cs,
            ar: value.ar,
            od: value.od,
            hp: value.hp,
        }
    }
}

/// Provider fetching beatmap attributes from an HTTP mirror.
///
/// Successful lookups are memoised for the lifetime of the process.
#[derive(Clone)]
pub struct MirrorBeatmapProvider {
    client: Client,
    base_url: Arc<str>,
    api_key: Option<Arc<str>>,
    cache: Arc<DashMap<BeatmapRef, BeatmapAttributes>>,
}

impl MirrorBeatmapProvider {
    /// Build a provider for the configured mirror.
    pub fn new(config: MirrorConfig) -> BeatmapResult<Self> {
        let client = Client::builder().build().map_err(|source| {
            BeatmapError::unavailable("failed to build mirror client".into(), source)
        })?;

        Ok(Self {
            client,
            base_url: Arc::<str>::from(config.base_url.trim_end_matches('/')),
            api_key: config.api_key.map(Arc::<str>::from),
            cache: Arc::new(DashMap::new()),
        })
    }

    fn attributes_url(&self, reference: &BeatmapRef) -> String {
        format!("{}/beatmaps/{}/attributes", self.base_url, reference)
    }

    async fn fetch(self, reference: BeatmapRef) -> BeatmapResult<BeatmapAttributes> {
        if let Some(cached) = self.cache.get(&reference) {
            return Ok(*cached.value());
        }

        let url = self.attributes_url(&reference);
        let mut builder = self.client.get(&url);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key.as_ref());
        }

        let response = builder.send().await.map_err(|source| {
            BeatmapError::unavailable(format!("failed to query mirror for `{reference}`"), source)
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(BeatmapError::NotFound(reference)),
            status if status.is_success() => {
                let attributes: BeatmapAttributes = response
                    .json::<MirrorAttributes>()
                    .await
                    .map_err(|source| {
                        BeatmapError::unavailable(
                            format!("failed to decode mirror response for `{reference}`"),
                            source,
                        )
                    })?
                    .into();
                debug!(%reference, "resolved beatmap attributes from mirror");
                self.cache.insert(reference, attributes);
                Ok(attributes)
            }
            other => {
                let source = response.error_for_status().err();
                match source {
                    Some(source) => Err(BeatmapError::unavailable(
                        format!("mirror answered {other} for `{reference}`"),
                        source,
                    )),
                    None => Err(BeatmapError::NotFound(reference)),
                }
            }
        }
    }
}

impl BeatmapProvider for MirrorBeatmapProvider {
    fn resolve(&self, reference: &BeatmapRef) -> BoxFuture<'static, BeatmapResult<BeatmapAttributes>> {
        self.clone().fetch(reference.clone()).boxed()
    }

    fn name(&self) -> &'static str {
        "mirror"
    }
}
