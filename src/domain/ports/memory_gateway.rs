//! Access to stored conversation memory.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::domain::models::PlanStep;

/// External collaborator that services `memory_access` steps.
#[async_trait]
pub trait MemoryGateway: Send + Sync {
    /// Serve a memory access step for `user_id`; the step's `scope` parameter selects what to read.
    async fn access(&self, user_id: &str, step: &PlanStep) -> Result<Value>;
}
