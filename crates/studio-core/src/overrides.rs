//! Paid-override ledger
//!
//! Append-only, newest first, process lifetime only. Records are never
//! mutated after creation.

use crate::error::ValidationError;
use crate::types::{OverrideId, OverrideRecord, OverrideStatus, Submission};
use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

/// Message returned with every accepted request
pub const OVERRIDE_ACCEPTED_MESSAGE: &str =
    "Paid override request received. Team follow-up is pending.";

/// Storage for override records
pub trait OverrideStore: Send + Sync {
    /// Prepend a record
    fn append(&self, record: OverrideRecord);

    /// All records, newest first
    fn snapshot(&self) -> Vec<OverrideRecord>;

    /// Number of records
    fn len(&self) -> usize;

    /// Whether the store is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct InMemoryOverrideStore {
    records: RwLock<VecDeque<OverrideRecord>>,
}

impl InMemoryOverrideStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OverrideStore for InMemoryOverrideStore {
    fn append(&self, record: OverrideRecord) {
        self.records.write().push_front(record);
    }

    fn snapshot(&self) -> Vec<OverrideRecord> {
        self.records.read().iter().cloned().collect()
    }

    fn len(&self) -> usize {
        self.records.read().len()
    }
}

/// Receipt returned for an accepted request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverrideReceipt {
    /// Always true
    pub accepted: bool,
    /// Fixed acknowledgement
    pub message: String,
    /// Stored record
    pub record: OverrideRecord,
}

/// Validates and records override requests
#[derive(Clone)]
pub struct OverrideRegistry {
    store: Arc<dyn OverrideStore>,
}

impl std::fmt::Debug for OverrideRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverrideRegistry")
            .field("records", &self.store.len())
            .finish()
    }
}

impl Default for OverrideRegistry {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryOverrideStore::new()))
    }
}

impl OverrideRegistry {
    /// Create a registry over a store
    #[must_use]
    pub fn new(store: Arc<dyn OverrideStore>) -> Self {
        Self { store }
    }

    /// Record a request
    ///
    /// Requires a non-empty idea and contact email after trimming.
    pub fn record(
        &self,
        submission: Submission,
        contact_email: &str,
        notes: &str,
    ) -> Result<OverrideRecord, ValidationError> {
        let submission = submission
            .normalized()
            .map_err(|_| ValidationError::MissingContact)?;
        let email = contact_email.trim();
        if email.is_empty() {
            return Err(ValidationError::MissingContact);
        }
        let record = OverrideRecord {
            id: OverrideId::new(),
            created_at: Utc::now(),
            founder_name: submission.founder_name,
            target_user: submission.target_user,
            idea: submission.idea,
            email: email.to_string(),
            notes: notes.trim().to_string(),
            status: OverrideStatus::PendingContact,
        };
        self.store.append(record.clone());
        tracing::info!("Override {} recorded", record.id);
        Ok(record)
    }

    /// Wrap a record in a receipt
    #[must_use]
    pub fn receipt(record: OverrideRecord) -> OverrideReceipt {
        OverrideReceipt {
            accepted: true,
            message: OVERRIDE_ACCEPTED_MESSAGE.to_string(),
            record,
        }
    }

    /// All records, newest first
    #[must_use]
    pub fn records(&self) -> Vec<OverrideRecord> {
        self.store.snapshot()
    }
}
