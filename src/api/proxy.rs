//! `GET /api/proxy?url=<target>`: server-side page fetch for listing imports.
//!
//! Browsers cannot read most listing sites cross-origin, so the client asks
//! this endpoint for the raw page text instead.

use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::config::ProxyConfig;

/// Shared handler state: one pooled upstream client.
#[derive(Clone)]
pub struct ProxyState {
    client: reqwest::Client,
}

impl ProxyState {
    pub fn new(config: &ProxyConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::Internal(format!("HTTP client build failed: {e}")))?;
        Ok(Self { client })
    }
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub url: Option<String>,
}

/// Validate the `url` parameter: present, non-blank, absolute http(s).
pub fn validate_target(raw: Option<&str>) -> Result<reqwest::Url, ApiError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or(ApiError::UrlRequired)?;
    let url = reqwest::Url::parse(raw).map_err(|e| ApiError::InvalidTarget(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ApiError::InvalidTarget(format!("scheme {other}"))),
    }
}

pub async fn fetch(
    State(state): State<ProxyState>,
    Query(query): Query<ProxyQuery>,
) -> Result<Response, ApiError> {
    let target = validate_target(query.url.as_deref())?;
    tracing::debug!(host = target.host_str().unwrap_or(""), "Proxying page fetch");

    let upstream = state
        .client
        .get(target)
        .send()
        .await
        .map_err(|e| ApiError::UpstreamUnreachable(e.to_string()))?;

    let status = upstream.status();
    if !status.is_success() {
        let reason = status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| status.as_u16().to_string());
        return Err(ApiError::UpstreamStatus {
            status: status.as_u16(),
            reason,
        });
    }

    let content_type = upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| HeaderValue::from_str(v).ok())
        .unwrap_or_else(|| HeaderValue::from_static("text/plain; charset=utf-8"));

    // Raw bytes; the upstream charset label goes out with them.
    let body = upstream
        .bytes()
        .await
        .map_err(|e| ApiError::UpstreamUnreachable(e.to_string()))?;

    tracing::debug!(bytes = body.len(), "Proxy fetch complete");
    Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response())
}
