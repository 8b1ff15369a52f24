use std::sync::Arc;

use anyhow::{Context, Result, bail};
use axum::Router;
use tower_http::trace::TraceLayer;

use super::api::{self, AppState};
use super::exec::ProcessRunner;
use super::workflow::Provisioner;
use crate::config::ProvisionerConfig;

/// Build the provisioning router around an already-constructed provisioner.
pub fn build_router(provisioner: Provisioner, api_key: &str) -> Router {
    let state = Arc::new(AppState { provisioner });
    api::api_router(api_key)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the provisioning service and serve until Ctrl+C.
pub async fn start_server(config: ProvisionerConfig) -> Result<()> {
    let Some(api_key) = config.api_key.clone().filter(|k| !k.trim().is_empty()) else {
        bail!(
            "No API key configured for the provisioner. Set WP_SERVER_API_KEY or [provisioner].api_key."
        );
    };

    std::fs::create_dir_all(&config.state_dir).with_context(|| {
        format!(
            "Failed to create state directory {}",
            config.state_dir.display()
        )
    })?;

    let addr = format!("{}:{}", config.bind, config.port);
    tracing::info!(
        base_domain = %config.base_domain,
        sites_dir = %config.sites_dir.display(),
        "starting provisioner"
    );

    let provisioner = Provisioner::new(config, Arc::new(ProcessRunner));
    let app = build_router(provisioner, &api_key);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, "WordPress provisioning API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("provisioner shut down gracefully");
    Ok(())
}

/// Resolves on Ctrl+C. If the handler cannot be installed, never resolves.
pub(crate) async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutting down"),
        Err(e) => {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::exec::testing::RecordingRunner;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn test_router(dir: &std::path::Path) -> Router {
        let config = ProvisionerConfig {
            sites_dir: dir.to_path_buf(),
            state_dir: dir.join("state"),
            ..ProvisionerConfig::default()
        };
        build_router(
            Provisioner::new(config, Arc::new(RecordingRunner::new())),
            "k",
        )
    }

    #[tokio::test]
    async fn test_health_via_full_router() {
        let dir = tempfile::tempdir().unwrap();
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = test_router(dir.path()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_list_sites_mounted_behind_auth() {
        let dir = tempfile::tempdir().unwrap();
        let req = Request::builder()
            .uri("/list-sites")
            .header("authorization", "Bearer k")
            .body(Body::empty())
            .unwrap();
        let resp = test_router(dir.path()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let req = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let resp = test_router(dir.path()).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_start_without_api_key_fails() {
        let config = ProvisionerConfig {
            api_key: None,
            ..ProvisionerConfig::default()
        };
        let err = start_server(config).await.unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
    }
}
