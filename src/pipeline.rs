// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Admission pipeline for guestbook submissions.
//!
//! An ordered sequence of checks over one candidate. The order is part
//! of the contract: it decides which failure a client observes and
//! which failures stay silent.
//!
//! 1. Read-only gate (visible rejection)
//! 2. Honeypot (silent acceptance)
//! 3. Entry cooldown (visible rejection, with remaining seconds)
//! 4. Encoding check (visible rejection)
//! 5. Sanitization (transforms only)
//! 6. Schema validation (visible rejection)
//! 7. Bad-word filter (silent acceptance)
//! 8. URL filter (silent acceptance)
//! 9. Persist, mark cooldown, accept
//!
//! Silent acceptance must be indistinguishable from real acceptance to
//! the caller: bots and content spammers get no feedback that they were
//! detected.

use crate::config::ReadOnlyFlag;
use crate::filter::ContentFilter;
use crate::limiter::CooldownTracker;
use crate::sanitize::sanitize;
use crate::store::{Entry, EntryStore, NewEntry, StoreError};
use crate::validator::{EntryValidator, ValidationError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// An in-flight submission, as decoded from the form body.
///
/// Fields are raw bytes: the encoding check is a pipeline step, not a
/// precondition.
#[derive(Debug, Clone, Default)]
pub struct Candidate {
    pub callsign: Vec<u8>,
    pub message: Vec<u8>,
    pub honeypot: Vec<u8>,
}

/// Outcome of one admission-pipeline run.
#[derive(Debug)]
pub enum AdmissionOutcome {
    /// The entry was persisted.
    Accepted(Entry),
    /// An abuse check fired. Nothing was persisted, no cooldown was
    /// marked, and the caller must render this exactly like `Accepted`.
    AcceptedSilently,
    /// A user-visible rejection.
    Rejected(RejectReason),
}

/// User-visible rejection reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The guestbook is in read-only mode.
    ReadOnly,
    /// The client already had an entry accepted within the cooldown
    /// period.
    Cooldown { remaining_secs: u64 },
    /// A field is not valid UTF-8.
    Encoding,
    /// A field failed schema validation.
    Validation(ValidationError),
}

/// Internal pipeline fault. The HTTP layer renders this as a generic,
/// detail-free error.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The admission pipeline. One instance is shared across all requests.
pub struct AdmissionPipeline {
    cooldown: Arc<CooldownTracker>,
    validator: EntryValidator,
    filter: ContentFilter,
    store: Arc<dyn EntryStore>,
    read_only: Arc<ReadOnlyFlag>,
}

impl AdmissionPipeline {
    pub fn new(
        cooldown: Arc<CooldownTracker>,
        validator: EntryValidator,
        filter: ContentFilter,
        store: Arc<dyn EntryStore>,
        read_only: Arc<ReadOnlyFlag>,
    ) -> Self {
        Self {
            cooldown,
            validator,
            filter,
            store,
            read_only,
        }
    }

    /// Run one candidate through the full check sequence.
    pub async fn submit(
        &self,
        key: &str,
        candidate: &Candidate,
    ) -> Result<AdmissionOutcome, AdmissionError> {
        if self.read_only.is_enabled() {
            return Ok(AdmissionOutcome::Rejected(RejectReason::ReadOnly));
        }

        if honeypot_triggered(&candidate.honeypot) {
            warn!(client = %key, "honeypot triggered, discarding silently");
            return Ok(AdmissionOutcome::AcceptedSilently);
        }

        if self.cooldown.is_cooling_down(key).await {
            let remaining_secs = self.cooldown.remaining_secs(key).await;
            return Ok(AdmissionOutcome::Rejected(RejectReason::Cooldown {
                remaining_secs,
            }));
        }

        let Ok(callsign) = std::str::from_utf8(&candidate.callsign) else {
            return Ok(AdmissionOutcome::Rejected(RejectReason::Encoding));
        };
        let Ok(message) = std::str::from_utf8(&candidate.message) else {
            return Ok(AdmissionOutcome::Rejected(RejectReason::Encoding));
        };

        let callsign = sanitize(callsign);
        let message = sanitize(message);

        let validated = match self.validator.validate(&callsign, &message) {
            Ok(validated) => validated,
            Err(err) => {
                return Ok(AdmissionOutcome::Rejected(RejectReason::Validation(err)));
            }
        };

        if self.filter.contains_bad_word(&validated.message) {
            warn!(client = %key, "bad word detected, discarding silently");
            return Ok(AdmissionOutcome::AcceptedSilently);
        }

        if self.filter.contains_url(&validated.message) {
            warn!(client = %key, "URL detected, discarding silently");
            return Ok(AdmissionOutcome::AcceptedSilently);
        }

        let entry = self
            .store
            .create(NewEntry {
                callsign: validated.callsign,
                message: validated.message,
            })
            .await?;
        self.cooldown.mark_accepted(key).await;

        info!(callsign = %entry.callsign, id = entry.id, "new guestbook entry");
        Ok(AdmissionOutcome::Accepted(entry))
    }
}

/// A honeypot field counts as filled only when it has non-whitespace
/// content; invalid bytes still count as content.
fn honeypot_triggered(raw: &[u8]) -> bool {
    !String::from_utf8_lossy(raw).trim().is_empty()
}
