// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Entry store collaborator.
//!
//! The gate only needs `create` on acceptance; `list`, `count` and
//! `delete` serve the surrounding read/admin surface. A database-backed
//! implementation lives outside this crate; [`MemoryStore`] is the
//! in-process reference used by the binary and the tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

/// A persisted guestbook entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: u64,
    pub callsign: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// A normalized, accepted record ready for persistence.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub callsign: String,
    pub message: String,
}

/// Store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// Record store contract.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Persist a new entry and return it with id and timestamp assigned.
    async fn create(&self, entry: NewEntry) -> Result<Entry, StoreError>;

    /// List entries in reverse chronological order.
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Entry>, StoreError>;

    /// Total number of entries.
    async fn count(&self) -> Result<u64, StoreError>;

    /// Delete an entry by id. Returns whether it existed.
    async fn delete(&self, id: u64) -> Result<bool, StoreError>;
}

/// In-memory entry store.
pub struct MemoryStore {
    entries: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn create(&self, entry: NewEntry) -> Result<Entry, StoreError> {
        let entry = Entry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            callsign: entry.callsign,
            message: entry.message,
            created_at: Utc::now(),
        };
        self.entries.write().await.push(entry.clone());
        Ok(entry)
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Entry>, StoreError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64, StoreError> {
        Ok(self.entries.read().await.len() as u64)
    }

    async fn delete(&self, id: u64) -> Result<bool, StoreError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        Ok(entries.len() < before)
    }
}
