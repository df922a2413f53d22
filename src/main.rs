//! Spectator Sync Back binary entrypoint wiring the ingest feed, room queries and SSE.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use spectator_sync_back::{
    config::AppConfig,
    dao::beatmap::{BeatmapProvider, StaticBeatmapProvider},
    routes,
    state::{AppState, SharedState},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let beatmaps = build_beatmap_provider(&config);
    info!(provider = beatmaps.name(), "beatmap provider ready");

    let app_state = AppState::new(config, beatmaps);
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the beatmap collaborator: the HTTP mirror when one is configured,
/// otherwise the beatmaps preloaded from configuration.
fn build_beatmap_provider(config: &AppConfig) -> Arc<dyn BeatmapProvider> {
    if let Some(provider) = config.beatmap_mirror_url().and_then(|url| mirror_provider(config, url)) {
        return provider;
    }
    Arc::new(StaticBeatmapProvider::new(config.beatmaps().iter().cloned()))
}

#[cfg(feature = "mirror")]
fn mirror_provider(config: &AppConfig, url: &str) -> Option<Arc<dyn BeatmapProvider>> {
    use spectator_sync_back::dao::beatmap::{MirrorBeatmapProvider, MirrorConfig};

    let mut mirror_config = MirrorConfig::new(url);
    if let Some(key) = config.beatmap_mirror_api_key() {
        mirror_config = mirror_config.with_api_key(key);
    }
    match MirrorBeatmapProvider::new(mirror_config) {
        Ok(provider) => Some(Arc::new(provider)),
        Err(err) => {
            warn!(%url, error = %err, "failed to set up beatmap mirror; using preloaded beatmaps");
            None
        }
    }
}

#[cfg(not(feature = "mirror"))]
fn mirror_provider(_config: &AppConfig, url: &str) -> Option<Arc<dyn BeatmapProvider>> {
    warn!(%url, "built without the `mirror` feature; using preloaded beatmaps");
    None
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
