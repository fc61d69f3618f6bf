//! Single-retry fallback around any [`PlanExecutor`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::domain::models::{Execution, Plan, PlanStep, ReflectionDelta};
use crate::domain::ports::PlanExecutor;

/// Execution plus what backtracking did to get it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktrackOutcome {
    /// The execution that produced the response.
    pub execution: Execution,
    /// Attempts made and whether the fallback ran.
    pub reflection_delta: ReflectionDelta,
}

/// Runs a plan once and, on failure, runs a one-step respond-only fallback
/// exactly once.
pub struct BacktrackingExecutor {
    inner: Arc<dyn PlanExecutor>,
    fallback_response: String,
}

impl BacktrackingExecutor {
    /// Wrap `inner`; the fallback plan responds with `fallback_response`.
    pub fn new(inner: Arc<dyn PlanExecutor>, fallback_response: impl Into<String>) -> Self {
        Self {
            inner,
            fallback_response: fallback_response.into(),
        }
    }

    /// The plan used after a failed first attempt.
    pub fn fallback_plan(&self, failed: &Plan) -> Plan {
        Plan::from_steps(
            vec![PlanStep::respond("fallback-1", self.fallback_response.as_str())],
            format!(
                "Fallback after a failed {}-step plan",
                failed.steps.len()
            ),
        )
    }

    /// Execute `plan`, falling back once if it fails.
    pub async fn execute(
        &self,
        plan: &Plan,
        user_id: &str,
        session_id: Option<&str>,
    ) -> BacktrackOutcome {
        let first = self.inner.execute_plan(plan, user_id, session_id).await;
        if first.success {
            return BacktrackOutcome {
                execution: first,
                reflection_delta: ReflectionDelta::first_attempt_succeeded(),
            };
        }

        warn!(
            user_id = user_id,
            errors = first.errors.len(),
            "plan failed; applying respond-only fallback"
        );

        let fallback = self.fallback_plan(plan);
        let execution = self.inner.execute_plan(&fallback, user_id, session_id).await;

        info!(
            user_id = user_id,
            recovered = execution.success,
            "fallback plan executed"
        );

        BacktrackOutcome {
            reflection_delta: ReflectionDelta {
                attempts: 2,
                recovered: execution.success,
                original_errors: first.errors,
                fallback_plan_applied: true,
            },
            execution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{StepType, VerificationSummary};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails any plan with more than one step; counts calls.
    struct PickyExecutor {
        calls: AtomicU32,
        fallback_succeeds: bool,
    }

    #[async_trait]
    impl PlanExecutor for PickyExecutor {
        async fn execute_plan(&self, plan: &Plan, _user_id: &str, _session_id: Option<&str>) -> Execution {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let success = plan.steps.len() == 1 && self.fallback_succeeds;
            Execution {
                steps_executed: Vec::new(),
                success,
                output: plan.steps[0].description.clone(),
                tool_results: Vec::new(),
                errors: if success { vec![] } else { vec!["boom".to_string()] },
                verification_summary: VerificationSummary::default(),
            }
        }
    }

    fn two_step_plan() -> Plan {
        Plan::from_steps(
            vec![PlanStep::respond("a", "one"), PlanStep::respond("b", "two")],
            "two steps",
        )
    }

    #[tokio::test]
    async fn test_success_returns_first_attempt() {
        let inner = Arc::new(PickyExecutor {
            calls: AtomicU32::new(0),
            fallback_succeeds: true,
        });
        let exec = BacktrackingExecutor::new(inner.clone(), "sorry");
        let plan = Plan::from_steps(vec![PlanStep::respond("a", "fine")], "one");
        let outcome = exec.execute(&plan, "u1", None).await;

        assert_eq!(outcome.reflection_delta, ReflectionDelta::first_attempt_succeeded());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_recovers_with_fallback() {
        let inner = Arc::new(PickyExecutor {
            calls: AtomicU32::new(0),
            fallback_succeeds: true,
        });
        let exec = BacktrackingExecutor::new(inner.clone(), "sorry");
        let outcome = exec.execute(&two_step_plan(), "u1", Some("s")).await;

        assert_eq!(outcome.reflection_delta.attempts, 2);
        assert!(outcome.reflection_delta.recovered);
        assert!(outcome.reflection_delta.fallback_plan_applied);
        assert_eq!(outcome.reflection_delta.original_errors, vec!["boom".to_string()]);
        assert_eq!(outcome.execution.output, "sorry");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fallback_is_not_retried() {
        let inner = Arc::new(PickyExecutor {
            calls: AtomicU32::new(0),
            fallback_succeeds: false,
        });
        let exec = BacktrackingExecutor::new(inner.clone(), "sorry");
        let outcome = exec.execute(&two_step_plan(), "u1", None).await;

        assert!(!outcome.reflection_delta.recovered);
        assert_eq!(outcome.reflection_delta.attempts, 2);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_fallback_plan_shape() {
        let inner = Arc::new(PickyExecutor {
            calls: AtomicU32::new(0),
            fallback_succeeds: true,
        });
        let exec = BacktrackingExecutor::new(inner, "sorry");
        let plan = exec.fallback_plan(&two_step_plan());
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].step_type, StepType::Respond);
        assert!(plan.tools_needed.is_empty());
        assert!(!plan.memory_access_needed);
        assert!(plan.is_well_formed());
    }
}
