// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Prometheus metrics.
//!
//! Counters are internal observability only: admission outcomes are
//! labeled here (including the silent-discard classes) while the HTTP
//! responses stay indistinguishable.

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Metrics registry and counters for the gate.
pub struct Metrics {
    registry: Registry,
    /// Requests seen by the request gate
    pub requests_total: IntCounter,
    /// Requests rejected by the request gate
    pub rate_limited_total: IntCounter,
    /// Admission pipeline outcomes, by class
    admission_outcomes: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounter::new(
            "guestbook_requests_total",
            "Requests seen by the request gate",
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let rate_limited_total = IntCounter::new(
            "guestbook_rate_limited_total",
            "Requests rejected by the request gate",
        )?;
        registry.register(Box::new(rate_limited_total.clone()))?;

        let admission_outcomes = IntCounterVec::new(
            Opts::new(
                "guestbook_admission_outcomes_total",
                "Admission pipeline outcomes by class",
            ),
            &["outcome"],
        )?;
        registry.register(Box::new(admission_outcomes.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            rate_limited_total,
            admission_outcomes,
        })
    }

    /// Count one admission outcome.
    pub fn observe_outcome(&self, outcome: &str) {
        self.admission_outcomes.with_label_values(&[outcome]).inc();
    }

    /// Render the registry in Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
