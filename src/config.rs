//! Application-level configuration loading: beatmap collaborator settings and stream sizing.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::{mods::BeatmapAttributes, room::BeatmapRef};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SPECTATOR_SYNC_CONFIG_PATH";
/// Upper bound for a single beatmap acquisition.
const DEFAULT_BEATMAP_TIMEOUT_MS: u64 = 10_000;
/// Capacity of the viewer notification broadcast channel.
const DEFAULT_SSE_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    beatmap_mirror_url: Option<String>,
    beatmap_mirror_api_key: Option<String>,
    beatmap_timeout: Duration,
    sse_capacity: usize,
    default_attributes: BeatmapAttributes,
    beatmaps: Vec<(BeatmapRef, BeatmapAttributes)>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        mirror = app_config.beatmap_mirror_url.is_some(),
                        beatmaps = app_config.beatmaps.len(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Base URL of the beatmap mirror, when one is configured.
    pub fn beatmap_mirror_url(&self) -> Option<&str> {
        self.beatmap_mirror_url.as_deref()
    }

    /// Bearer token for the beatmap mirror.
    pub fn beatmap_mirror_api_key(&self) -> Option<&str> {
        self.beatmap_mirror_api_key.as_deref()
    }

    /// Upper bound for a single beatmap acquisition.
    pub fn beatmap_timeout(&self) -> Duration {
        self.beatmap_timeout
    }

    /// Capacity of the viewer notification channel.
    pub fn sse_capacity(&self) -> usize {
        self.sse_capacity
    }

    /// Attributes used until the picked beatmap resolves.
    pub fn default_attributes(&self) -> BeatmapAttributes {
        self.default_attributes
    }

    /// Beatmaps known without asking a mirror.
    pub fn beatmaps(&self) -> &[(BeatmapRef, BeatmapAttributes)] {
        &self.beatmaps
    }

    /// Override the acquisition timeout.
    pub fn with_beatmap_timeout(mut self, timeout: Duration) -> Self {
        self.beatmap_timeout = timeout;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            beatmap_mirror_url: None,
            beatmap_mirror_api_key: None,
            beatmap_timeout: Duration::from_millis(DEFAULT_BEATMAP_TIMEOUT_MS),
            sse_capacity: DEFAULT_SSE_CAPACITY,
            default_attributes: BeatmapAttributes::default(),
            beatmaps: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    beatmap_mirror_url: Option<String>,
    #[serde(default)]
    beatmap_mirror_api_key: Option<String>,
    #[serde(default = "default_beatmap_timeout_ms")]
    beatmap_timeout_ms: u64,
    #[serde(default = "default_sse_capacity")]
    sse_capacity: usize,
    #[serde(default)]
    default_attributes: Option<BeatmapAttributes>,
    #[serde(default)]
    beatmaps: Vec<RawBeatmap>,
}

#[derive(Debug, Deserialize)]
/// Preloaded beatmap entry inside the configuration file.
struct RawBeatmap {
    reference: String,
    #[serde(flatten)]
    attributes: BeatmapAttributes,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let beatmaps = value
            .beatmaps
            .into_iter()
            .map(|entry| (BeatmapRef(entry.reference), entry.attributes))
            .collect();
        Self {
            beatmap_mirror_url: value
                .beatmap_mirror_url
                .filter(|url| !url.trim().is_empty()),
            beatmap_mirror_api_key: value.beatmap_mirror_api_key,
            beatmap_timeout: Duration::from_millis(value.beatmap_timeout_ms),
            sse_capacity: value.sse_capacity.max(1),
            default_attributes: value.default_attributes.unwrap_or_default(),
            beatmaps,
        }
    }
}

fn default_beatmap_timeout_ms() -> u64 {
    DEFAULT_BEATMAP_TIMEOUT_MS
}

fn default_sse_capacity() -> usize {
    DEFAULT_SSE_CAPACITY
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_config_fills_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "beatmap_mirror_url": "  ",
                "beatmaps": [{ "reference": "75", "cs": 4.0, "ar": 6.0, "od": 7.0, "hp": 5.0 }]
            }"#,
        )
        .unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.beatmap_mirror_url(), None);
        assert_eq!(
            config.beatmap_timeout(),
            Duration::from_millis(DEFAULT_BEATMAP_TIMEOUT_MS)
        );
        assert_eq!(config.sse_capacity(), DEFAULT_SSE_CAPACITY);
        assert_eq!(config.default_attributes(), BeatmapAttributes::default());
        assert_eq!(config.beatmaps()[0].0, BeatmapRef("75".into()));
        assert_eq!(config.beatmaps()[0].1.od, 7.0);
    }
}
