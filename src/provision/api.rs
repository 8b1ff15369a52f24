use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};

use wpfleet_common::{
    AddDomainRequest, AddDomainResponse, CreateSiteRequest, CreateSiteResponse,
    DeleteSiteResponse, ErrorBody, ProvisionRecord, SiteList, SiteSummary,
};

use crate::auth::{BearerToken, require_bearer};
use crate::errors::ProvisionError;
use crate::provision::workflow::Provisioner;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub provisioner: Provisioner,
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    /// Map a workflow failure; server-side errors get `prefix` in front.
    fn from_provision(prefix: &str, err: ProvisionError) -> Self {
        match err {
            ProvisionError::Validation(msg) => ApiError::BadRequest(msg),
            e @ ProvisionError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            e @ (ProvisionError::Conflict { .. } | ProvisionError::DomainTaken { .. }) => {
                ApiError::Conflict(e.to_string())
            }
            e => {
                tracing::error!(error = %e, "{}", prefix);
                ApiError::Internal(format!("{}: {}", prefix, e))
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

/// All provisioning routes. Everything except `/health` requires the bearer key.
pub fn api_router(api_key: &str) -> Router<SharedState> {
    Router::new()
        .route("/create-wordpress", post(create_wordpress))
        .route("/add-domain", post(add_domain))
        .route("/delete-wordpress/{site_id}", delete(delete_wordpress))
        .route("/status/{site_id}", get(site_status))
        .route("/list-sites", get(list_sites))
        .route("/provisioning/{site_id}", get(provisioning_record))
        .route_layer(middleware::from_fn_with_state(
            BearerToken::new(api_key),
            require_bearer,
        ))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn create_wordpress(
    State(state): State<SharedState>,
    payload: Result<Json<CreateSiteRequest>, JsonRejection>,
) -> Result<Json<CreateSiteResponse>, ApiError> {
    let Json(req) = payload?;
    state
        .provisioner
        .create_site(&req)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_provision("Failed to create WordPress site", e))
}

async fn add_domain(
    State(state): State<SharedState>,
    payload: Result<Json<AddDomainRequest>, JsonRejection>,
) -> Result<Json<AddDomainResponse>, ApiError> {
    let Json(req) = payload?;
    state
        .provisioner
        .add_domain(&req)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_provision("Failed to add domain to WordPress site", e))
}

async fn delete_wordpress(
    State(state): State<SharedState>,
    Path(site_id): Path<String>,
) -> Result<Json<DeleteSiteResponse>, ApiError> {
    state
        .provisioner
        .delete_site(&site_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_provision("Failed to delete WordPress site", e))
}

async fn site_status(
    State(state): State<SharedState>,
    Path(site_id): Path<String>,
) -> Result<Json<SiteSummary>, ApiError> {
    state
        .provisioner
        .status_of(&site_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_provision("Failed to get WordPress site status", e))
}

async fn list_sites(State(state): State<SharedState>) -> Result<Json<SiteList>, ApiError> {
    state
        .provisioner
        .list_sites()
        .await
        .map(Json)
        .map_err(|e| ApiError::from_provision("Failed to list WordPress sites", e))
}

async fn provisioning_record(
    State(state): State<SharedState>,
    Path(site_id): Path<String>,
) -> Result<Json<ProvisionRecord>, ApiError> {
    state
        .provisioner
        .provisioning_record(&site_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_provision("Failed to read provisioning record", e))
}
