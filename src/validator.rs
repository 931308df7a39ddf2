// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Schema validation for guestbook entries.
//!
//! Callsigns follow the amateur-radio grammar: 1-2 letter prefix, one
//! digit, 1-4 letter suffix, optionally followed by `/` and 1-4
//! alphanumerics (`/P`, `/QRP`, ...). Matching is case-insensitive and
//! the accepted form is normalized to uppercase.

use crate::config::ContentConfig;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static CALLSIGN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,2}[0-9][A-Z]{1,4}(?:/[A-Z0-9]{1,4})?$").unwrap());

/// Validation error types. Messages are user-facing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("callsign must not be empty")]
    EmptyCallsign,

    #[error("callsign must be at most {max} characters")]
    CallsignTooLong { max: usize },

    #[error("callsign is not a valid amateur radio callsign")]
    InvalidCallsign,

    #[error("message must not be empty")]
    EmptyMessage,

    #[error("message must be at most {max} characters")]
    MessageTooLong { max: usize },
}

/// A candidate that passed schema validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedEntry {
    /// Callsign in canonical (uppercase) form
    pub callsign: String,
    /// Trimmed message
    pub message: String,
}

/// Entry field validator.
pub struct EntryValidator {
    max_message_length: usize,
    max_callsign_length: usize,
}

impl EntryValidator {
    /// Create a validator with the given content limits.
    pub fn new(config: &ContentConfig) -> Self {
        Self {
            max_message_length: config.max_message_length,
            max_callsign_length: config.max_callsign_length,
        }
    }

    /// Validate sanitized callsign and message fields.
    pub fn validate(&self, callsign: &str, message: &str) -> Result<ValidatedEntry, ValidationError> {
        let callsign = self.validate_callsign(callsign)?;
        let message = self.validate_message(message)?;
        Ok(ValidatedEntry { callsign, message })
    }

    /// Validate and normalize a callsign.
    pub fn validate_callsign(&self, callsign: &str) -> Result<String, ValidationError> {
        let normalized = callsign.trim().to_uppercase();

        if normalized.is_empty() {
            return Err(ValidationError::EmptyCallsign);
        }
        if normalized.chars().count() > self.max_callsign_length {
            return Err(ValidationError::CallsignTooLong {
                max: self.max_callsign_length,
            });
        }
        // Shortest issued form is prefix + digit + two letters; anything
        // shorter ("D1A") is junk, not a callsign.
        let base = normalized.split('/').next().unwrap_or_default();
        if base.chars().count() < 4 {
            return Err(ValidationError::InvalidCallsign);
        }
        if !CALLSIGN_PATTERN.is_match(&normalized) {
            return Err(ValidationError::InvalidCallsign);
        }

        Ok(normalized)
    }

    /// Validate a message.
    pub fn validate_message(&self, message: &str) -> Result<String, ValidationError> {
        let trimmed = message.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::EmptyMessage);
        }
        if trimmed.chars().count() > self.max_message_length {
            return Err(ValidationError::MessageTooLong {
                max: self.max_message_length,
            });
        }

        Ok(trimmed.to_string())
    }
}
