//! Bearer-token middleware shared by both servers.
//!
//! Attach with `axum::middleware::from_fn_with_state(BearerToken::new(..), require_bearer)`
//! as a `route_layer` on the routes that need it.

use axum::{
    Json,
    extract::{Request, State},
    http::{Method, StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use wpfleet_common::ErrorBody;

/// The expected secret.
#[derive(Clone)]
pub struct BearerToken(Arc<str>);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Arc::from(token.into()))
    }

    pub fn matches(&self, candidate: &str) -> bool {
        // Length check first; the byte fold keeps the comparison time flat.
        let expected = self.0.as_bytes();
        let candidate = candidate.as_bytes();
        expected.len() == candidate.len()
            && expected
                .iter()
                .zip(candidate)
                .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                == 0
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(********)")
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub async fn require_bearer(
    State(token): State<BearerToken>,
    req: Request,
    next: Next,
) -> Response {
    // CORS preflight carries no credentials.
    if req.method() == Method::OPTIONS {
        return next.run(req).await;
    }

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    let Some(provided) = header.and_then(|h| h.strip_prefix("Bearer ")) else {
        return unauthorized("Unauthorized: Missing or invalid API key");
    };

    if !token.matches(provided.trim()) {
        tracing::warn!(path = %req.uri().path(), "rejected request with invalid API key");
        return unauthorized("Unauthorized: Invalid API key");
    }

    next.run(req).await
}
