// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window request tracker and entry cooldown tracker.
//!
//! Both trackers key on an opaque client string (derived from the
//! network layer, see `gate`) and hold their state in memory only.
//! Client identifiers are never persisted.
//!
//! Expiry is lazy: every check purges timestamps that fell out of the
//! window before counting, so correctness does not depend on cleanup
//! cadence. A global cleanup additionally drops idle keys, at most once
//! per configured interval, to bound memory for long-gone clients.

use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Result of a request-gate check.
#[derive(Debug, Clone)]
pub enum GateDecision {
    /// Request is allowed
    Allowed {
        /// Remaining requests in the current window
        remaining: u32,
    },
    /// Request is rate limited
    Limited {
        /// Time until the oldest counted request falls out of the window
        retry_after: Duration,
    },
}

/// Per-client sliding-window request tracker.
///
/// Tracks the timestamps of recent requests per client key and answers
/// whether a key is over the configured threshold within the trailing
/// window.
pub struct WindowTracker {
    max_requests: usize,
    window: Duration,
    cleanup_interval: Duration,
    clock: Arc<dyn Clock>,
    windows: RwLock<HashMap<String, Vec<Instant>>>,
    last_cleanup: RwLock<Instant>,
}

impl WindowTracker {
    /// Create a tracker using the system clock.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a tracker with an injected clock.
    pub fn with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            max_requests: config.max_requests as usize,
            window: config.window_duration(),
            cleanup_interval: config.cleanup_interval(),
            clock,
            windows: RwLock::new(HashMap::new()),
            last_cleanup: RwLock::new(now),
        }
    }

    /// Record one request for a key.
    pub async fn record(&self, key: &str) {
        self.maybe_cleanup().await;
        let now = self.clock.now();
        let mut windows = self.windows.write().await;
        windows.entry(key.to_string()).or_default().push(now);
    }

    /// Check whether a key is over the threshold in the trailing window.
    ///
    /// Purges expired timestamps for the key before counting.
    pub async fn is_limited(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut windows = self.windows.write().await;
        match windows.get_mut(key) {
            Some(events) => {
                events.retain(|t| now.duration_since(*t) < self.window);
                events.len() >= self.max_requests
            }
            None => self.max_requests == 0,
        }
    }

    /// Check the threshold and record the request as one atomic step.
    ///
    /// The purge, the count, and the append happen under a single write
    /// lock so two concurrent requests from the same key cannot both
    /// slip past the threshold. A limited request is not recorded.
    pub async fn check_and_record(&self, key: &str) -> GateDecision {
        self.maybe_cleanup().await;
        let now = self.clock.now();
        let mut windows = self.windows.write().await;
        let events = windows.entry(key.to_string()).or_default();
        events.retain(|t| now.duration_since(*t) < self.window);

        if events.len() >= self.max_requests {
            // Timestamps are appended in order, so the first entry is
            // the next one to fall out of the window.
            let retry_after = events
                .first()
                .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
                .unwrap_or(self.window);
            debug!(client = %key, in_window = events.len(), "client over request threshold");
            GateDecision::Limited { retry_after }
        } else {
            events.push(now);
            GateDecision::Allowed {
                remaining: (self.max_requests - events.len()) as u32,
            }
        }
    }

    /// Drop keys whose windows are fully empty, at most once per
    /// cleanup interval. Skipping costs one timestamp comparison.
    async fn maybe_cleanup(&self) {
        let now = self.clock.now();
        {
            let last = self.last_cleanup.read().await;
            if now.duration_since(*last) < self.cleanup_interval {
                return;
            }
        }
        {
            let mut last = self.last_cleanup.write().await;
            // Another task may have cleaned up between the read and the
            // write lock.
            if now.duration_since(*last) < self.cleanup_interval {
                return;
            }
            *last = now;
        }

        let mut windows = self.windows.write().await;
        for events in windows.values_mut() {
            events.retain(|t| now.duration_since(*t) < self.window);
        }
        let before = windows.len();
        windows.retain(|_, events| !events.is_empty());
        if windows.len() < before {
            debug!(
                removed = before - windows.len(),
                remaining = windows.len(),
                "window tracker cleanup"
            );
        }
    }

    /// Number of keys currently tracked.
    pub async fn tracked_keys(&self) -> usize {
        self.windows.read().await.len()
    }
}

/// Per-client cooldown tracker for accepted entries.
///
/// Independent of the request-volume tracker: this gates successful
/// submissions specifically, one accepted entry per client per cooldown
/// period.
pub struct CooldownTracker {
    cooldown: Duration,
    cleanup_interval: Duration,
    clock: Arc<dyn Clock>,
    marks: RwLock<HashMap<String, Instant>>,
    last_cleanup: RwLock<Instant>,
}

impl CooldownTracker {
    /// Create a tracker using the system clock.
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a tracker with an injected clock.
    pub fn with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            cooldown: config.cooldown_duration(),
            cleanup_interval: config.cleanup_interval(),
            clock,
            marks: RwLock::new(HashMap::new()),
            last_cleanup: RwLock::new(now),
        }
    }

    /// Record that a key's submission was accepted now.
    ///
    /// Overwrites any previous mark for the key.
    pub async fn mark_accepted(&self, key: &str) {
        self.maybe_cleanup().await;
        let now = self.clock.now();
        self.marks.write().await.insert(key.to_string(), now);
    }

    /// Whether the key is still inside its cooldown period.
    pub async fn is_cooling_down(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.marks
            .read()
            .await
            .get(key)
            .is_some_and(|mark| now.duration_since(*mark) < self.cooldown)
    }

    /// Whole seconds left until the key may submit again; 0 if unmarked
    /// or expired.
    pub async fn remaining_secs(&self, key: &str) -> u64 {
        let now = self.clock.now();
        self.marks
            .read()
            .await
            .get(key)
            .map(|mark| {
                self.cooldown
                    .saturating_sub(now.duration_since(*mark))
                    .as_secs()
            })
            .unwrap_or(0)
    }

    /// Drop marks older than the cooldown, at most once per interval.
    async fn maybe_cleanup(&self) {
        let now = self.clock.now();
        {
            let last = self.last_cleanup.read().await;
            if now.duration_since(*last) < self.cleanup_interval {
                return;
            }
        }
        {
            let mut last = self.last_cleanup.write().await;
            if now.duration_since(*last) < self.cleanup_interval {
                return;
            }
            *last = now;
        }

        let mut marks = self.marks.write().await;
        let before = marks.len();
        marks.retain(|_, mark| now.duration_since(*mark) < self.cooldown);
        if marks.len() < before {
            debug!(
                removed = before - marks.len(),
                remaining = marks.len(),
                "cooldown tracker cleanup"
            );
        }
    }

    /// Number of keys currently marked.
    pub async fn tracked_keys(&self) -> usize {
        self.marks.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    fn config(max_requests: u32, window_secs: u64, cooldown_secs: u64) -> RateLimitConfig {
        RateLimitConfig {
            max_requests,
            window_secs,
            cooldown_secs,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_under_threshold_not_limited() {
        let clock = MockClock::new(Instant::now());
        let tracker = WindowTracker::with_clock(&config(5, 60, 60), Arc::new(clock));

        for _ in 0..4 {
            tracker.record("1.2.3.4").await;
        }
        assert!(!tracker.is_limited("1.2.3.4").await);
    }

    #[tokio::test]
    async fn test_threshold_reached_limits() {
        let clock = MockClock::new(Instant::now());
        let tracker = WindowTracker::with_clock(&config(5, 60, 60), Arc::new(clock));

        for _ in 0..5 {
            tracker.record("1.2.3.4").await;
        }
        assert!(tracker.is_limited("1.2.3.4").await);
        // Another key is unaffected
        assert!(!tracker.is_limited("5.6.7.8").await);
    }

    #[tokio::test]
    async fn test_window_expiry_unlimits() {
        let clock = MockClock::new(Instant::now());
        let handle = clock.clone();
        let tracker = WindowTracker::with_clock(&config(3, 60, 60), Arc::new(clock));

        for _ in 0..3 {
            tracker.record("1.2.3.4").await;
        }
        assert!(tracker.is_limited("1.2.3.4").await);

        // Exactly window_secs past the oldest event, all three expire
        handle.advance(Duration::from_secs(60));
        assert!(!tracker.is_limited("1.2.3.4").await);
    }

    #[tokio::test]
    async fn test_check_and_record_rejects_without_consuming() {
        let clock = MockClock::new(Instant::now());
        let handle = clock.clone();
        let tracker = WindowTracker::with_clock(&config(2, 60, 60), Arc::new(clock));

        assert!(matches!(
            tracker.check_and_record("k").await,
            GateDecision::Allowed { remaining: 1 }
        ));
        assert!(matches!(
            tracker.check_and_record("k").await,
            GateDecision::Allowed { remaining: 0 }
        ));

        // Limited, and the rejection does not extend the window
        let decision = tracker.check_and_record("k").await;
        match decision {
            GateDecision::Limited { retry_after } => {
                assert!(retry_after <= Duration::from_secs(60));
            }
            GateDecision::Allowed { .. } => panic!("third request should be limited"),
        }

        handle.advance(Duration::from_secs(60));
        assert!(matches!(
            tracker.check_and_record("k").await,
            GateDecision::Allowed { .. }
        ));
    }

    #[tokio::test]
    async fn test_sliding_window_is_not_bucketed() {
        let clock = MockClock::new(Instant::now());
        let handle = clock.clone();
        let tracker = WindowTracker::with_clock(&config(2, 60, 60), Arc::new(clock));

        tracker.record("k").await;
        handle.advance(Duration::from_secs(30));
        tracker.record("k").await;
        assert!(tracker.is_limited("k").await);

        // 31s later the first event has expired but the second has not:
        // a fixed bucket would have reset both.
        handle.advance(Duration::from_secs(31));
        assert!(!tracker.is_limited("k").await);
        tracker.record("k").await;
        assert!(tracker.is_limited("k").await);
    }

    #[tokio::test]
    async fn test_cleanup_drops_idle_keys() {
        let clock = MockClock::new(Instant::now());
        let handle = clock.clone();
        let cfg = RateLimitConfig {
            max_requests: 5,
            window_secs: 60,
            cooldown_secs: 60,
            cleanup_interval_secs: 300,
        };
        let tracker = WindowTracker::with_clock(&cfg, Arc::new(clock));

        tracker.record("idle-client").await;
        assert_eq!(tracker.tracked_keys().await, 1);

        // Past the cleanup interval, the next recorded event from any
        // client sweeps the idle key out.
        handle.advance(Duration::from_secs(301));
        tracker.record("fresh-client").await;
        assert_eq!(tracker.tracked_keys().await, 1);
        assert!(!tracker.is_limited("idle-client").await);
    }

    #[tokio::test]
    async fn test_cooldown_lifecycle() {
        let clock = MockClock::new(Instant::now());
        let handle = clock.clone();
        let tracker = CooldownTracker::with_clock(&config(5, 60, 60), Arc::new(clock));

        assert!(!tracker.is_cooling_down("k").await);
        assert_eq!(tracker.remaining_secs("k").await, 0);

        tracker.mark_accepted("k").await;
        assert!(tracker.is_cooling_down("k").await);
        assert_eq!(tracker.remaining_secs("k").await, 60);

        handle.advance(Duration::from_secs(25));
        assert_eq!(tracker.remaining_secs("k").await, 35);

        handle.advance(Duration::from_secs(35));
        assert!(!tracker.is_cooling_down("k").await);
        assert_eq!(tracker.remaining_secs("k").await, 0);
    }

    #[tokio::test]
    async fn test_cooldown_mark_overwrites() {
        let clock = MockClock::new(Instant::now());
        let handle = clock.clone();
        let tracker = CooldownTracker::with_clock(&config(5, 60, 60), Arc::new(clock));

        tracker.mark_accepted("k").await;
        handle.advance(Duration::from_secs(59));
        tracker.mark_accepted("k").await;

        // The new mark restarts the full cooldown
        handle.advance(Duration::from_secs(2));
        assert!(tracker.is_cooling_down("k").await);
        assert_eq!(tracker.remaining_secs("k").await, 58);
    }

    #[tokio::test]
    async fn test_cooldown_cleanup_drops_expired_marks() {
        let clock = MockClock::new(Instant::now());
        let handle = clock.clone();
        let cfg = RateLimitConfig {
            max_requests: 5,
            window_secs: 60,
            cooldown_secs: 60,
            cleanup_interval_secs: 300,
        };
        let tracker = CooldownTracker::with_clock(&cfg, Arc::new(clock));

        tracker.mark_accepted("old").await;
        handle.advance(Duration::from_secs(301));
        tracker.mark_accepted("new").await;

        assert_eq!(tracker.tracked_keys().await, 1);
        assert!(tracker.is_cooling_down("new").await);
    }
}
