//! Durable destination for authorization audit records.

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::models::AuditRecord;

/// Durable destination for authorization decisions.
///
/// Recording is best-effort: callers log and discard sink failures.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Persist one record.
    async fn record(&self, record: &AuditRecord) -> Result<()>;
}
