// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the guestbook gate.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Configuration for the guestbook gate service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Rate limiting and cooldown configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Content validation configuration
    #[serde(default)]
    pub content: ContentConfig,

    /// Bad-word and URL filter configuration
    #[serde(default)]
    pub filter: FilterConfig,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per client within the window (default: 30)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Sliding window length in seconds (default: 60)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Cooldown between accepted entries per client in seconds (default: 60)
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,

    /// Minimum interval between global tracker cleanups in seconds
    /// (default: 300)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

/// Content limits for submitted entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Maximum message length in characters (default: 300)
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,

    /// Maximum callsign length in characters (default: 15)
    #[serde(default = "default_max_callsign_length")]
    pub max_callsign_length: usize,

    /// Start in read-only mode (default: false)
    #[serde(default)]
    pub read_only: bool,
}

/// Denylist and URL detection configuration.
///
/// Both lists are data, not code: deployments localize or extend them
/// without touching the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Case-insensitive substrings that silently discard a message
    #[serde(default = "default_bad_words")]
    pub bad_words: Vec<String>,

    /// TLDs treated as URL evidence when preceded by a bare domain
    #[serde(default = "default_url_tlds")]
    pub url_tlds: Vec<String>,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path (default: /metrics)
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_max_requests() -> u32 {
    30
}

fn default_window_secs() -> u64 {
    60
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_cleanup_interval_secs() -> u64 {
    300
}

fn default_max_message_length() -> usize {
    300
}

fn default_max_callsign_length() -> usize {
    15
}

fn default_bad_words() -> Vec<String> {
    [
        // German offensive words (minimal list)
        "arschloch",
        "scheiße",
        "fick",
        "hurensohn",
        "wichser",
        // English offensive words
        "fuck",
        "shit",
        "asshole",
        "bitch",
        // Spam indicators
        "viagra",
        "casino",
        "crypto",
        "bitcoin",
        "make money",
        "click here",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_url_tlds() -> Vec<String> {
    ["com", "de", "org", "net", "io", "ru", "cn"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            rate_limit: RateLimitConfig::default(),
            content: ContentConfig::default(),
            filter: FilterConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            cooldown_secs: default_cooldown_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            max_message_length: default_max_message_length(),
            max_callsign_length: default_max_callsign_length(),
            read_only: false,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            bad_words: default_bad_words(),
            url_tlds: default_url_tlds(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            path: default_metrics_path(),
        }
    }
}

impl RateLimitConfig {
    /// Get the sliding window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Get the entry cooldown duration
    pub fn cooldown_duration(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    /// Get the minimum interval between global cleanups
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

/// Runtime read-only switch.
///
/// Seeded from [`ContentConfig::read_only`]; an operator-facing surface
/// may flip it at runtime, standing in for the persisted override the
/// settings collaborator owns.
#[derive(Debug)]
pub struct ReadOnlyFlag {
    enabled: AtomicBool,
}

impl ReadOnlyFlag {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}
