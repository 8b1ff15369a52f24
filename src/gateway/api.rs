use std::sync::{Arc, LazyLock};

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{any, get, post},
};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};

use wpfleet_common::{AddDomainRequest, CreateSiteRequest, ErrorBody};

use super::llm::ContentGenerator;
use super::settings::{SettingsStore, SettingsUpdate};
use super::upstream::ProvisionerClient;
use crate::auth::{BearerToken, require_bearer};
use crate::errors::GatewayError;

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\w+:|)//").expect("static regex"));

const CREATE_FAILED: &str = "Failed to create WordPress site on your server. Please check your server configuration and try again.";
const ADD_DOMAIN_FAILED: &str =
    "Failed to add domain to WordPress site. Please check your server configuration and try again.";

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub settings: SettingsStore,
    pub http: reqwest::Client,
    pub generator: ContentGenerator,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Client for the provisioner named in the current settings.
    async fn provisioner(&self) -> Result<ProvisionerClient, ApiError> {
        let (url, key) = self
            .settings
            .current()
            .await
            .provisioner_target()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        ProvisionerClient::new(self.http.clone(), &url, &key)
            .map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerateContentRequest {
    pub topics: Option<Value>,
    pub num_articles: Option<Value>,
}

/// `username` and `password` are accepted from the dashboard but never
/// checked against the site, so they are not deserialized.
#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ConnectRequest {
    pub url: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreateSubdomainRequest {
    pub name: Option<String>,
    pub subdomain: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct AddDomainBody {
    pub site_id: Option<String>,
    pub new_domain: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
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
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Log the real cause and answer with a fixed message. An upstream 404 stays a 404.
fn upstream_failure(context: &str, public: &str, err: GatewayError) -> ApiError {
    tracing::error!(error = %err, "{}", context);
    match err {
        GatewayError::Upstream {
            status: 404,
            message,
        } => ApiError::NotFound(message),
        _ => ApiError::Internal(public.to_string()),
    }
}

// ── Router ────────────────────────────────────────────────────────────

/// `/api/*` behind the bearer token, plus the public health check.
pub fn api_router(token: &str) -> Router<SharedState> {
    Router::new()
        .route("/api/generate-content", post(generate_content))
        .route("/api/wordpress/connect", post(connect_wordpress))
        .route("/api/wordpress/create-subdomain", post(create_subdomain))
        .route("/api/wordpress/add-domain", post(add_domain))
        .route("/api/wordpress/sites", get(list_sites))
        .route(
            "/api/wordpress/sites/{site_id}",
            get(site_status).delete(delete_site),
        )
        .route("/api/settings/save", post(save_settings))
        .route("/api/settings/get", get(get_settings))
        .route("/api/{*rest}", any(unknown_api_route))
        .route_layer(middleware::from_fn_with_state(
            BearerToken::new(token),
            require_bearer,
        ))
        .route("/health", get(health_check))
}

// ── Helpers ───────────────────────────────────────────────────────────

/// Host part of a URL, with or without a scheme.
pub fn host_of(url: &str) -> String {
    let rest = SCHEME_RE.replace(url.trim(), "");
    rest.split('/').next().unwrap_or_default().to_string()
}

/// Lowercase, with every character outside `[a-z0-9-]` replaced by `-`.
pub fn format_subdomain(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Non-empty text form of a JSON string or number; arrays are comma-joined.
fn as_text(value: &Option<Value>) -> Option<String> {
    let text = match value.as_ref()? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) if n.as_f64().is_some_and(|f| f > 0.0) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    };
    (!text.is_empty()).then_some(text)
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> &'static str {
    "ok"
}

async fn unknown_api_route() -> ApiError {
    ApiError::NotFound("Not found".into())
}

async fn generate_content(
    State(state): State<SharedState>,
    payload: Result<Json<GenerateContentRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let (Some(topics), Some(count)) = (as_text(&req.topics), as_text(&req.num_articles)) else {
        return Err(ApiError::BadRequest(
            "Topics and number of articles are required".into(),
        ));
    };
    let api_key = state
        .settings
        .current()
        .await
        .llm_key()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let articles = state
        .generator
        .generate(&api_key, &count, &topics)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "error generating content");
            ApiError::Internal("Failed to generate content".into())
        })?;
    tracing::info!(count = articles.len(), "generated article titles");
    Ok(Json(json!({ "articles": articles })))
}

async fn connect_wordpress(
    payload: Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let url = required(req.url)
        .ok_or_else(|| ApiError::BadRequest("WordPress site URL is required".into()))?;
    Ok(Json(json!({
        "success": true,
        "message": "Successfully connected to WordPress site",
        "siteInfo": {
            "name": host_of(&url),
            "url": url,
            "status": "active"
        }
    })))
}

async fn create_subdomain(
    State(state): State<SharedState>,
    payload: Result<Json<CreateSubdomainRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let client = state.provisioner().await?;
    let (Some(name), Some(subdomain)) = (required(req.name), required(req.subdomain)) else {
        return Err(ApiError::BadRequest(
            "Site name and subdomain are required".into(),
        ));
    };

    let admin = state.settings.current().await.admin_defaults();
    let request = CreateSiteRequest {
        subdomain: format_subdomain(&subdomain),
        site_name: name.clone(),
        admin_user: admin.username,
        admin_password: admin.password,
        admin_email: admin.email,
    };
    let created = client
        .create_site(&request)
        .await
        .map_err(|e| upstream_failure("error creating WordPress site", CREATE_FAILED, e))?;

    tracing::info!(site = %created.site_id, url = %created.url, "WordPress site created");
    Ok(Json(json!({
        "success": true,
        "message": "WordPress site created successfully with custom subdomain",
        "siteInfo": {
            "id": created.site_id,
            "name": name,
            "url": created.url,
            "adminUrl": created.admin_url,
            "status": "active",
            "articles": 0
        }
    })))
}

async fn add_domain(
    State(state): State<SharedState>,
    payload: Result<Json<AddDomainBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let client = state.provisioner().await?;
    let (Some(site_id), Some(domain)) = (required(req.site_id), required(req.new_domain)) else {
        return Err(ApiError::BadRequest("Site ID and new domain are required".into()));
    };

    let site_info = client
        .add_domain(&AddDomainRequest { site_id, domain })
        .await
        .map_err(|e| upstream_failure("error adding domain", ADD_DOMAIN_FAILED, e))?;

    Ok(Json(json!({
        "success": true,
        "message": "Domain added successfully to WordPress site",
        "siteInfo": site_info
    })))
}

async fn list_sites(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    let sites = state
        .provisioner()
        .await?
        .list_sites()
        .await
        .map_err(|e| {
            upstream_failure("error listing sites", "Failed to fetch WordPress sites", e)
        })?;
    Ok(Json(json!(sites)))
}

async fn site_status(
    State(state): State<SharedState>,
    Path(site_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let status = state
        .provisioner()
        .await?
        .status(&site_id)
        .await
        .map_err(|e| {
            upstream_failure(
                "error fetching site status",
                "Failed to fetch WordPress site status",
                e,
            )
        })?;
    Ok(Json(json!(status)))
}

async fn delete_site(
    State(state): State<SharedState>,
    Path(site_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let deleted = state
        .provisioner()
        .await?
        .delete_site(&site_id)
        .await
        .map_err(|e| upstream_failure("error deleting site", "Failed to delete WordPress site", e))?;
    Ok(Json(json!(deleted)))
}

async fn save_settings(
    State(state): State<SharedState>,
    payload: Result<Json<SettingsUpdate>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(update) = payload?;
    state.settings.save(update).await.map_err(|e| {
        tracing::error!(error = %e, "error saving settings");
        ApiError::Internal("Failed to save settings".into())
    })?;
    Ok(Json(json!({
        "success": true,
        "message": "Settings saved successfully"
    })))
}

async fn get_settings(State(state): State<SharedState>) -> Json<Value> {
    let settings = state.settings.current().await.masked();
    Json(json!({ "settings": settings }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "gw-token";

    async fn test_app(config: GatewayConfig) -> (TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsStore::open(dir.path().join("settings.json"), &config)
            .await
            .unwrap();
        let http = reqwest::Client::new();
        let state = Arc::new(AppState {
            settings,
            generator: ContentGenerator::new(http.clone(), &config.llm_base_url, &config.llm_model),
            http,
        });
        (dir, api_router(TOKEN).with_state(state))
    }

    fn wired(server: &MockServer) -> GatewayConfig {
        GatewayConfig {
            llm_base_url: server.uri(),
            llm_api_key: Some("sk-test".into()),
            provisioner_url: Some(server.uri()),
            provisioner_key: Some("prov-key".into()),
            ..GatewayConfig::default()
        }
    }

    fn authed(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", TOKEN));
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json<T: serde::de::DeserializeOwned>(body: Body) -> T {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://blog.example.org/path"), "blog.example.org");
        assert_eq!(host_of("//cdn.example.org/x"), "cdn.example.org");
        assert_eq!(host_of("example.org"), "example.org");
        assert_eq!(host_of("http://localhost:8080"), "localhost:8080");
    }

    #[test]
    fn test_format_subdomain() {
        assert_eq!(format_subdomain("My Blog_2"), "my-blog-2");
        assert_eq!(format_subdomain("demo"), "demo");
        assert_eq!(format_subdomain("Café"), "caf-");
    }

    #[tokio::test]
    async fn test_api_requires_token() {
        let (_dir, app) = test_app(GatewayConfig::default()).await;
        let req = Request::builder()
            .uri("/api/settings/get")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_missing_token_never_reaches_provisioner() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/create-wordpress"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let (_dir, app) = test_app(wired(&server)).await;

        let req = Request::builder()
            .method("POST")
            .uri("/api/wordpress/create-subdomain")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"name": "Demo", "subdomain": "demo"}).to_string(),
            ))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_api_route_is_json_404() {
        let (_dir, app) = test_app(GatewayConfig::default()).await;
        let resp = app
            .clone()
            .oneshot(authed("GET", "/api/nope", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: Value = body_json(resp.into_body()).await;
        assert_eq!(body["error"], "Not found");

        let req = Request::builder()
            .method("POST")
            .uri("/api/nope")
            .body(Body::empty())
            .unwrap();
        assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_400() {
        let (_dir, app) = test_app(GatewayConfig::default()).await;
        let resp = app
            .clone()
            .oneshot(authed(
                "POST",
                "/api/wordpress/connect",
                Some(json!({"url": ["not", "a", "string"]})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = body_json(resp.into_body()).await;
        assert!(body["error"].is_string());

        // No content type at all.
        let req = Request::builder()
            .method("POST")
            .uri("/api/settings/save")
            .header("authorization", format!("Bearer {}", TOKEN))
            .body(Body::from("{}"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = body_json(resp.into_body()).await;
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let (_dir, app) = test_app(GatewayConfig::default()).await;
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        assert_eq!(app.oneshot(req).await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_generate_content_requires_inputs() {
        let (_dir, app) = test_app(GatewayConfig::default()).await;
        let resp = app
            .oneshot(authed(
                "POST",
                "/api/generate-content",
                Some(json!({"topics": "tea"})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = body_json(resp.into_body()).await;
        assert_eq!(body["error"], "Topics and number of articles are required");
    }

    #[tokio::test]
    async fn test_generate_content_without_key_is_400() {
        let (_dir, app) = test_app(GatewayConfig::default()).await;
        let resp = app
            .oneshot(authed(
                "POST",
                "/api/generate-content",
                Some(json!({"topics": "tea", "numArticles": 3})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_generate_content_returns_articles() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"content": "1. Oolong basics\n\n2. Brewing matcha"}}]
            })))
            .mount(&server)
            .await;
        let (_dir, app) = test_app(wired(&server)).await;

        let resp = app
            .oneshot(authed(
                "POST",
                "/api/generate-content",
                Some(json!({"topics": "tea", "numArticles": 2})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = body_json(resp.into_body()).await;
        assert_eq!(
            body,
            json!({"articles": [
                {"id": 1, "title": "Oolong basics", "status": "generated"},
                {"id": 2, "title": "Brewing matcha", "status": "generated"}
            ]})
        );
    }

    #[tokio::test]
    async fn test_generate_content_upstream_failure_is_500() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let (_dir, app) = test_app(wired(&server)).await;
        let resp = app
            .oneshot(authed(
                "POST",
                "/api/generate-content",
                Some(json!({"topics": "tea", "numArticles": "2"})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = body_json(resp.into_body()).await;
        assert_eq!(body["error"], "Failed to generate content");
    }

    #[tokio::test]
    async fn test_connect_returns_site_info() {
        let (_dir, app) = test_app(GatewayConfig::default()).await;
        let resp = app
            .oneshot(authed(
                "POST",
                "/api/wordpress/connect",
                Some(json!({"url": "https://blog.example.org/", "username": "u", "password": "p"})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = body_json(resp.into_body()).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["siteInfo"]["name"], "blog.example.org");
        assert_eq!(body["siteInfo"]["status"], "active");
    }

    #[tokio::test]
    async fn test_connect_without_url_is_400() {
        let (_dir, app) = test_app(GatewayConfig::default()).await;
        let resp = app
            .oneshot(authed("POST", "/api/wordpress/connect", Some(json!({}))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_subdomain_without_server_config_is_400() {
        let (_dir, app) = test_app(GatewayConfig::default()).await;
        let resp = app
            .oneshot(authed(
                "POST",
                "/api/wordpress/create-subdomain",
                Some(json!({"name": "Demo", "subdomain": "demo"})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = body_json(resp.into_body()).await;
        assert_eq!(
            body["error"],
            "WordPress server configuration is missing. Please add your server details in the Settings page."
        );
    }

    #[tokio::test]
    async fn test_create_subdomain_formats_and_forwards() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/create-wordpress"))
            .and(body_partial_json(json!({
                "subdomain": "my-blog",
                "siteName": "My Blog",
                "adminUser": "admin",
                "adminPassword": "password",
                "adminEmail": "admin@example.com"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "site_id": "my-blog",
                "url": "http://my-blog.example.com",
                "admin_url": "http://my-blog.example.com/wp-admin/"
            })))
            .expect(1)
            .mount(&server)
            .await;
        let (_dir, app) = test_app(wired(&server)).await;

        let resp = app
            .oneshot(authed(
                "POST",
                "/api/wordpress/create-subdomain",
                Some(json!({"name": "My Blog", "subdomain": "My Blog"})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = body_json(resp.into_body()).await;
        assert_eq!(
            body["message"],
            "WordPress site created successfully with custom subdomain"
        );
        assert_eq!(
            body["siteInfo"],
            json!({
                "id": "my-blog",
                "name": "My Blog",
                "url": "http://my-blog.example.com",
                "adminUrl": "http://my-blog.example.com/wp-admin/",
                "status": "active",
                "articles": 0
            })
        );
    }

    #[tokio::test]
    async fn test_create_subdomain_upstream_failure_is_generic_500() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/create-wordpress"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"error": "Failed to create WordPress site: boom"})),
            )
            .mount(&server)
            .await;
        let (_dir, app) = test_app(wired(&server)).await;
        let resp = app
            .oneshot(authed(
                "POST",
                "/api/wordpress/create-subdomain",
                Some(json!({"name": "Demo", "subdomain": "demo"})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = body_json(resp.into_body()).await;
        assert_eq!(body["error"], CREATE_FAILED);
    }

    #[tokio::test]
    async fn test_add_domain_passes_site_info_through() {
        let server = MockServer::start().await;
        let upstream = json!({
            "id": "demo",
            "url": "http://blog.example.org",
            "adminUrl": "http://blog.example.org/wp-admin/",
            "status": "active"
        });
        Mock::given(method("POST"))
            .and(path("/add-domain"))
            .and(body_partial_json(json!({"siteId": "demo", "domain": "blog.example.org"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(&upstream))
            .mount(&server)
            .await;
        let (_dir, app) = test_app(wired(&server)).await;

        let resp = app
            .oneshot(authed(
                "POST",
                "/api/wordpress/add-domain",
                Some(json!({"siteId": "demo", "newDomain": "blog.example.org"})),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = body_json(resp.into_body()).await;
        assert_eq!(body["message"], "Domain added successfully to WordPress site");
        assert_eq!(body["siteInfo"], upstream);
    }

    #[tokio::test]
    async fn test_site_status_404_passes_through() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status/ghost"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"error": "WordPress site not found"})),
            )
            .mount(&server)
            .await;
        let (_dir, app) = test_app(wired(&server)).await;
        let resp = app
            .oneshot(authed("GET", "/api/wordpress/sites/ghost", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_sites_proxies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/list-sites"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "sites": [{"id": "demo", "name": "demo", "url": "http://demo.example.com", "status": "unknown", "articles": 0}]
            })))
            .mount(&server)
            .await;
        let (_dir, app) = test_app(wired(&server)).await;
        let resp = app
            .oneshot(authed("GET", "/api/wordpress/sites", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = body_json(resp.into_body()).await;
        assert_eq!(body["sites"][0]["id"], "demo");
        assert_eq!(body["sites"][0]["status"], "unknown");
    }

    #[tokio::test]
    async fn test_settings_save_then_get_masks_secrets() {
        let (_dir, app) = test_app(GatewayConfig::default()).await;
        let resp = app
            .clone()
            .oneshot(authed(
                "POST",
                "/api/settings/save",
                Some(json!({
                    "wpServerApiUrl": "http://wp:3001",
                    "wpServerApiKey": "super-secret-key",
                    "baseDomain": "example.com",
                    "defaultWpEmail": ""
                })),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = body_json(resp.into_body()).await;
        assert_eq!(
            body,
            json!({"success": true, "message": "Settings saved successfully"})
        );

        let resp = app
            .oneshot(authed("GET", "/api/settings/get", None))
            .await
            .unwrap();
        let body: Value = body_json(resp.into_body()).await;
        assert_eq!(body["settings"]["baseDomain"], "example.com");
        assert_eq!(body["settings"]["wpServerApiUrl"], "http://wp:3001");
        assert_eq!(body["settings"]["wpServerApiKey"], "********-key");
        assert_eq!(body["settings"]["defaultWpEmail"], "");
        assert_eq!(body["settings"]["contentSettings"]["minWordCount"], 800);
    }
}
