//! In-memory audit log for authorization decisions.
//!
//! Bounded ring buffer owned by whoever constructs it (normally the
//! [`PolicyEngine`](super::PolicyEngine)). Appends are safe under concurrent
//! writers; once full, the oldest record is evicted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::models::{AuditRecord, AuditSeverity, Decision};

/// Default cap on in-memory records.
pub const DEFAULT_AUDIT_CAPACITY: usize = 10_000;

/// Filter for querying audit records.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Only records for this user.
    pub user_id: Option<String>,
    /// Only records with this decision.
    pub decision: Option<Decision>,
    /// Only records under this policy.
    pub policy: Option<String>,
    /// Only records at or above this severity.
    pub min_severity: Option<AuditSeverity>,
    /// Return at most this many records.
    pub limit: Option<usize>,
}

impl AuditFilter {
    /// A filter matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a user.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Restrict to a decision.
    #[must_use]
    pub const fn with_decision(mut self, decision: Decision) -> Self {
        self.decision = Some(decision);
        self
    }

    /// Restrict to a policy.
    #[must_use]
    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = Some(policy.into());
        self
    }

    /// Restrict to a minimum severity.
    #[must_use]
    pub const fn with_min_severity(mut self, severity: AuditSeverity) -> Self {
        self.min_severity = Some(severity);
        self
    }

    /// Cap the number of results.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check if a record matches this filter.
    pub fn matches(&self, record: &AuditRecord) -> bool {
        if let Some(ref user_id) = self.user_id {
            if &record.user_id != user_id {
                return false;
            }
        }

        if let Some(decision) = self.decision {
            if record.decision != decision {
                return false;
            }
        }

        if let Some(ref policy) = self.policy {
            if &record.policy != policy {
                return false;
            }
        }

        if let Some(min_severity) = self.min_severity {
            if record.severity < min_severity {
                return false;
            }
        }

        true
    }
}

/// Statistics about the audit log.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditStats {
    /// Records currently held.
    pub total_entries: usize,
    /// Allowed decisions.
    pub allowed: usize,
    /// Denied decisions.
    pub denied: usize,
    /// Record count per policy.
    pub by_policy: HashMap<String, usize>,
    /// Timestamp of the oldest held record.
    pub oldest_entry: Option<DateTime<Utc>>,
    /// Timestamp of the newest held record.
    pub newest_entry: Option<DateTime<Utc>>,
}

/// Bounded, append-only audit log.
#[derive(Debug, Clone)]
pub struct AuditLog {
    capacity: usize,
    entries: Arc<RwLock<VecDeque<AuditRecord>>>,
}

impl AuditLog {
    /// Create a log holding at most `capacity` records (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    /// Create with the default capacity.
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }

    /// Maximum number of records held.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a record, evicting from the front when full.
    pub async fn append(&self, record: AuditRecord) {
        let mut entries = self.entries.write().await;

        while entries.len() >= self.capacity {
            entries.pop_front();
        }

        entries.push_back(record);
    }

    /// All records in insertion order.
    pub async fn snapshot(&self) -> Vec<AuditRecord> {
        self.entries.read().await.iter().cloned().collect()
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the log is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Query records, newest first.
    pub async fn query(&self, filter: &AuditFilter) -> Vec<AuditRecord> {
        let entries = self.entries.read().await;
        let mut results: Vec<AuditRecord> = entries
            .iter()
            .rev()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        if let Some(limit) = filter.limit {
            results.truncate(limit);
        }

        results
    }

    /// Get statistics.
    pub async fn stats(&self) -> AuditStats {
        let entries = self.entries.read().await;

        let mut stats = AuditStats {
            total_entries: entries.len(),
            oldest_entry: entries.front().map(|r| r.timestamp),
            newest_entry: entries.back().map(|r| r.timestamp),
            ..AuditStats::default()
        };

        for record in entries.iter() {
            match record.decision {
                Decision::Allow => stats.allowed += 1,
                Decision::Deny => stats.denied += 1,
            }
            *stats.by_policy.entry(record.policy.clone()).or_default() += 1;
        }

        stats
    }

    /// Clear all records.
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Export matching records as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns the serialization error if a record cannot be encoded.
    pub async fn export_json(&self, filter: &AuditFilter) -> serde_json::Result<String> {
        let records = self.query(filter).await;
        serde_json::to_string_pretty(&records)
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::with_defaults()
    }
}
