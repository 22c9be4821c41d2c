//! Proxy router: page fetch plus a health check.

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::api::error::ApiError;
use crate::api::proxy::{self, ProxyState};
use crate::config::ProxyConfig;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /api/health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::config::APP_VERSION,
    })
}

/// Build the proxy router. Any origin may call it; only GET is routed.
pub fn proxy_router(config: &ProxyConfig) -> Result<Router, ApiError> {
    let state = ProxyState::new(config)?;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);

    let api = Router::new()
        .route("/proxy", get(proxy::fetch))
        .route("/health", get(health))
        .with_state(state);

    Ok(Router::new().nest("/api", api).layer(cors))
}
