// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Guestbook Gate Service
//!
//! Abuse-protection front for a ham-radio guestbook:
//!
//! - 30 requests / 60 s sliding window per client (default)
//! - 60 s cooldown between accepted entries per client
//! - Honeypot, encoding, sanitization, callsign/message validation,
//!   bad-word and URL filtering on submissions
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables:
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `RATE_LIMIT_REQUESTS`: Max requests per window per client (default: 30)
//! - `RATE_LIMIT_WINDOW`: Window length in seconds (default: 60)
//! - `ENTRY_COOLDOWN`: Seconds between accepted entries per client (default: 60)
//! - `READ_ONLY_MODE`: Start in read-only mode (default: false)

use axum::{
    middleware,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use guestbook_gate::{
    clock::{Clock, SystemClock},
    config::{Config, ContentConfig, RateLimitConfig, ReadOnlyFlag},
    filter::ContentFilter,
    gate::rate_limit_gate,
    handlers::{self, AppState},
    limiter::{CooldownTracker, WindowTracker},
    metrics::Metrics,
    pipeline::AdmissionPipeline,
    store::{EntryStore, MemoryStore},
    validator::EntryValidator,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Load configuration
    let config = load_config();
    info!(
        bind_addr = %config.bind_addr,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        cooldown_secs = config.rate_limit.cooldown_secs,
        read_only = config.content.read_only,
        "Starting guestbook gate"
    );

    // One monotonic clock shared by both trackers
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let window = WindowTracker::with_clock(&config.rate_limit, clock.clone());
    let cooldown = Arc::new(CooldownTracker::with_clock(&config.rate_limit, clock));

    let store: Arc<dyn EntryStore> = Arc::new(MemoryStore::new());
    let read_only = Arc::new(ReadOnlyFlag::new(config.content.read_only));
    let validator = EntryValidator::new(&config.content);
    let filter = ContentFilter::new(&config.filter)?;
    let pipeline = AdmissionPipeline::new(cooldown, validator, filter, store.clone(), read_only);
    let metrics = Metrics::new()?;

    let state = Arc::new(AppState {
        window,
        pipeline,
        store,
        metrics,
        config: config.clone(),
    });

    // Build router
    let mut app = Router::new()
        .route("/health", get(handlers::health))
        .route("/healthz", get(handlers::health))
        .route(
            "/api/entries",
            get(handlers::list_entries).post(handlers::create_entry),
        );

    if config.metrics.enabled {
        app = app.route(&config.metrics.path, get(handlers::metrics));
    }

    let app = app
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_gate,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Load configuration from environment variables.
fn load_config() -> Config {
    Config {
        bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        rate_limit: RateLimitConfig {
            max_requests: std::env::var("RATE_LIMIT_REQUESTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            window_secs: std::env::var("RATE_LIMIT_WINDOW")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            cooldown_secs: std::env::var("ENTRY_COOLDOWN")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            ..Default::default()
        },
        content: ContentConfig {
            read_only: std::env::var("READ_ONLY_MODE")
                .map(|v| v.to_lowercase() == "true")
                .unwrap_or(false),
            ..Default::default()
        },
        ..Default::default()
    }
}
