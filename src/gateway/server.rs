use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::api::{self, AppState};
use super::embedded::{has_embedded_dashboard, static_handler};
use super::llm::ContentGenerator;
use super::settings::SettingsStore;
use crate::config::GatewayConfig;
use crate::provision::server::shutdown_signal;

/// Provisioning a site downloads WordPress core, so upstream calls get a long budget.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(600);

/// Build the full gateway router: API, health check and dashboard fallback.
/// Only GET and HEAD reach the dashboard; other methods get 405.
pub fn build_router(state: Arc<AppState>, token: &str, dev_mode: bool) -> Router {
    let mut app = api::api_router(token)
        .fallback(get(static_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    if dev_mode {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

/// The configured token, or a fresh random one.
pub fn resolve_token(config: &GatewayConfig) -> (String, bool) {
    match config.api_token.as_deref().map(str::trim) {
        Some(token) if !token.is_empty() => (token.to_string(), false),
        _ => (uuid::Uuid::new_v4().simple().to_string(), true),
    }
}

pub async fn start_server(config: GatewayConfig) -> Result<()> {
    let settings = SettingsStore::open(&config.settings_path, &config)
        .await
        .context("Failed to load gateway settings")?;
    let http = reqwest::Client::builder()
        .timeout(UPSTREAM_TIMEOUT)
        .build()
        .context("Failed to build HTTP client")?;
    let generator = ContentGenerator::new(http.clone(), &config.llm_base_url, &config.llm_model);

    let (token, generated) = resolve_token(&config);
    if generated {
        tracing::warn!(%token, "no gateway API token configured; generated one for this run");
    }
    if !has_embedded_dashboard() {
        tracing::warn!("no dashboard assets embedded; only the API is available");
    }

    let state = Arc::new(AppState {
        settings,
        http,
        generator,
    });
    let app = build_router(state, &token, config.dev);

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, settings = %config.settings_path.display(), "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("gateway shut down gracefully");
    Ok(())
}
