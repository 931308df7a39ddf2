// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Request gate middleware.
//!
//! Wraps every inbound request except static-asset paths: derives the
//! client key, consults the window tracker, and answers 429 before any
//! handler runs when the client is over its request budget.

use crate::handlers::{AppState, ErrorResponse};
use crate::limiter::GateDecision;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// Paths exempt from rate limiting.
const STATIC_PREFIX: &str = "/static";

/// Derive the client key from request headers and peer address.
///
/// Prefers the first entry of `X-Forwarded-For` (the original client
/// when a trusted reverse proxy appends to the chain), then `X-Real-IP`,
/// then the direct peer, then a fixed sentinel.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    if let Some(real_ip) = headers.get("x-real-ip").and_then(|v| v.to_str().ok()) {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_string();
        }
    }

    if let Some(addr) = peer {
        return addr.ip().to_string();
    }

    "unknown".to_string()
}

/// Rate-limiting middleware applied to the whole router.
pub async fn rate_limit_gate(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    if request.uri().path().starts_with(STATIC_PREFIX) {
        return next.run(request).await;
    }

    let key = client_key(request.headers(), Some(addr));
    state.metrics.requests_total.inc();

    match state.window.check_and_record(&key).await {
        GateDecision::Allowed { remaining } => {
            debug!(client = %key, remaining, "request allowed");
            next.run(request).await
        }
        GateDecision::Limited { retry_after } => {
            let retry_secs = retry_after.as_secs().max(1);
            state.metrics.rate_limited_total.inc();
            info!(client = %key, retry_after_secs = retry_secs, "request rate limited");
            (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", retry_secs.to_string())],
                Json(ErrorResponse {
                    error: "too many requests, please wait a moment".to_string(),
                    code: "RATE_LIMITED",
                    retry_after_secs: Some(retry_secs),
                }),
            )
                .into_response()
        }
    }
}
