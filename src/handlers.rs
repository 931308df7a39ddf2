// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the guestbook gate service.

use crate::config::Config;
use crate::limiter::WindowTracker;
use crate::metrics::Metrics;
use crate::pipeline::{AdmissionOutcome, AdmissionPipeline, Candidate, RejectReason};
use crate::store::EntryStore;
use axum::{
    extract::{ConnectInfo, Query, RawForm, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use percent_encoding::percent_decode;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error};

use crate::gate::client_key;

/// Hard cap on the page size of the listing endpoint.
const MAX_PAGE_SIZE: usize = 500;

/// Shared application state.
pub struct AppState {
    pub window: WindowTracker,
    pub pipeline: AdmissionPipeline,
    pub store: Arc<dyn EntryStore>,
    pub metrics: Metrics,
    pub config: Config,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

/// Submission response body. Silent discards produce exactly this body
/// too, so there is nothing here a bot could use to detect it was
/// filtered.
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub success: bool,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "guestbook-gate",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// List guestbook entries in reverse chronological order.
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Response {
    let limit = params.limit.unwrap_or(100).min(MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0);

    match state.store.list(limit, offset).await {
        Ok(entries) => Json(entries).into_response(),
        Err(err) => {
            error!(error = %err, "listing entries failed");
            internal_error()
        }
    }
}

/// Create a new guestbook entry.
///
/// The body is decoded field-by-field to raw bytes so the admission
/// pipeline's encoding check sees exactly what the client sent.
pub async fn create_entry(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    RawForm(body): RawForm,
) -> Response {
    let key = client_key(&headers, Some(addr));
    let candidate = parse_submission(&body);

    debug!(client = %key, "processing guestbook submission");

    match state.pipeline.submit(&key, &candidate).await {
        Ok(AdmissionOutcome::Accepted(_)) => {
            state.metrics.observe_outcome("accepted");
            submit_success()
        }
        Ok(AdmissionOutcome::AcceptedSilently) => {
            state.metrics.observe_outcome("silent_discard");
            submit_success()
        }
        Ok(AdmissionOutcome::Rejected(reason)) => {
            let (label, response) = reject_response(reason);
            state.metrics.observe_outcome(label);
            response
        }
        Err(err) => {
            state.metrics.observe_outcome("error");
            error!(client = %key, error = %err, "admission pipeline failed");
            internal_error()
        }
    }
}

/// Prometheus metrics endpoint.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.metrics.render() {
        Ok(body) => body.into_response(),
        Err(err) => {
            error!(error = %err, "rendering metrics failed");
            internal_error()
        }
    }
}

fn submit_success() -> Response {
    (StatusCode::CREATED, Json(SubmitResponse { success: true })).into_response()
}

fn reject_response(reason: RejectReason) -> (&'static str, Response) {
    match reason {
        RejectReason::ReadOnly => (
            "read_only",
            (
                StatusCode::FORBIDDEN,
                Json(ErrorResponse {
                    error: "the guestbook is currently read-only".to_string(),
                    code: "READ_ONLY",
                    retry_after_secs: None,
                }),
            )
                .into_response(),
        ),
        RejectReason::Cooldown { remaining_secs } => (
            "cooldown",
            (
                StatusCode::TOO_MANY_REQUESTS,
                [("Retry-After", remaining_secs.to_string())],
                Json(ErrorResponse {
                    error: "please wait before submitting another entry".to_string(),
                    code: "COOLDOWN",
                    retry_after_secs: Some(remaining_secs),
                }),
            )
                .into_response(),
        ),
        RejectReason::Encoding => (
            "encoding",
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: "submitted text is not valid UTF-8".to_string(),
                    code: "INVALID_ENCODING",
                    retry_after_secs: None,
                }),
            )
                .into_response(),
        ),
        RejectReason::Validation(err) => (
            "validation",
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: err.to_string(),
                    code: "VALIDATION_FAILED",
                    retry_after_secs: None,
                }),
            )
                .into_response(),
        ),
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "an internal error occurred".to_string(),
            code: "INTERNAL",
            retry_after_secs: None,
        }),
    )
        .into_response()
}

/// Extract the submission fields from a form-urlencoded body.
///
/// The honeypot field is named `website` so it looks attractive to
/// form-filling bots.
fn parse_submission(body: &[u8]) -> Candidate {
    let mut candidate = Candidate::default();

    for pair in body.split(|&b| b == b'&') {
        let mut parts = pair.splitn(2, |&b| b == b'=');
        let name = parts.next().unwrap_or(&[]);
        let value = parts.next().unwrap_or(&[]);

        let name = decode_component(name);
        match String::from_utf8_lossy(&name).as_ref() {
            "callsign" => candidate.callsign = decode_component(value),
            "message" => candidate.message = decode_component(value),
            "website" => candidate.honeypot = decode_component(value),
            _ => {}
        }
    }

    candidate
}

/// Percent-decode one form component, mapping `+` to space first.
fn decode_component(raw: &[u8]) -> Vec<u8> {
    let unplussed: Vec<u8> = raw
        .iter()
        .map(|&b| if b == b'+' { b' ' } else { b })
        .collect();
    percent_decode(&unplussed).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submission() {
        let candidate =
            parse_submission(b"callsign=OE8XBB&message=Hallo+aus+Wien%21&website=");
        assert_eq!(candidate.callsign, b"OE8XBB");
        assert_eq!(candidate.message, b"Hallo aus Wien!");
        assert!(candidate.honeypot.is_empty());
    }

    #[test]
    fn test_parse_submission_unknown_fields_ignored() {
        let candidate = parse_submission(b"callsign=DL1ABC&csrf=abc123&message=73");
        assert_eq!(candidate.callsign, b"DL1ABC");
        assert_eq!(candidate.message, b"73");
    }

    #[test]
    fn test_parse_submission_preserves_invalid_utf8() {
        // %FF is not valid UTF-8; the pipeline, not the parser, rejects it
        let candidate = parse_submission(b"callsign=%FF%FE&message=hi");
        assert_eq!(candidate.callsign, vec![0xff, 0xfe]);
    }

    #[test]
    fn test_parse_submission_missing_fields_default_empty() {
        let candidate = parse_submission(b"message=only");
        assert!(candidate.callsign.is_empty());
        assert_eq!(candidate.message, b"only");
        assert!(candidate.honeypot.is_empty());
    }

    #[test]
    fn test_decode_component_percent_and_plus() {
        assert_eq!(decode_component(b"Gr%C3%BC%C3%9Fe+aus+Wien"), "Grüße aus Wien".as_bytes());
    }
}
