//! Plan execution seam shared by the executor and its backtracking wrapper.

use async_trait::async_trait;

use crate::domain::models::{Execution, Plan};

/// Strategy that turns a plan into an execution result.
///
/// Implementations never return errors: every failure is folded into the
/// returned [`Execution`].
#[async_trait]
pub trait PlanExecutor: Send + Sync {
    /// Execute `plan` for `user_id`.
    async fn execute_plan(&self, plan: &Plan, user_id: &str, session_id: Option<&str>)
        -> Execution;
}
