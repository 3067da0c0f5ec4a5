//! HTTP routes: search, profile lookup, liveness.
//!
//! Errors from the upstream client render as `{"detail": ...}` through
//! [`RelayError`]'s `IntoResponse`.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use scout_core::config::ServerConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::error::RelayError;
use crate::upstream::UpstreamClient;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

/// Build the HTTP router with CORS and request tracing.
pub fn build_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/search-people", get(search_people))
        .route("/profile/{identifier}", get(get_profile))
        .layer(cors_layer(server))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy for the configured origins. Unparseable origins are skipped.
pub fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origin = if server.allows_any_origin() {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = server
            .allowed_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// `GET /`
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Root working" }))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `GET /search-people?query=...` — every streamed record as one array.
pub async fn search_people(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, RelayError> {
    let query = params
        .query
        .ok_or_else(|| RelayError::InvalidInput("Missing 'query' parameter.".into()))?;

    let records = state.upstream.search_people(&query).await?;
    if records.is_empty() {
        return Ok(Json(json!({ "message": "No people found.", "results": [] })).into_response());
    }
    Ok(Json(records).into_response())
}

/// `GET /profile/{identifier}`
pub async fn get_profile(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> Result<Json<Value>, RelayError> {
    state.upstream.get_profile(&identifier).await.map(Json)
}
