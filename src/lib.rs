// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Guestbook Gate
//!
//! Abuse protection for a small public guestbook endpoint:
//!
//! - Per-client sliding-window request rate limiting
//! - Per-client cooldown between accepted entries
//! - Ordered admission pipeline for submitted entries (honeypot,
//!   encoding check, sanitization, callsign/message validation,
//!   bad-word filter, URL filter)
//! - Silent discard of bot traffic (honeypot, spam content) so that
//!   automated senders receive no signal they were detected

pub mod clock;
pub mod config;
pub mod filter;
pub mod gate;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod pipeline;
pub mod sanitize;
pub mod store;
pub mod validator;

pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use limiter::{CooldownTracker, GateDecision, WindowTracker};
pub use pipeline::{AdmissionOutcome, AdmissionPipeline, Candidate, RejectReason};
pub use store::{Entry, EntryStore, MemoryStore};
