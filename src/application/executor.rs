//! Sequential plan executor.
//!
//! Steps run in list order; declared dependencies are not used for
//! ordering. Failures are per step: a denied policy check, a denied tool or
//! an unwired memory step is recorded and execution moves on. The plan only
//! fails when a required verification fails or a step raises an unexpected
//! error (tool invoker error, timeout, memory gateway error).

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::models::{
    Decision, Execution, ExecutionResult, Plan, PlanStep, StepType, ToolCallResult,
    ToolCallStatus, VerificationOutcome, VerificationStatus, VerificationSummary,
};
use crate::domain::ports::{
    MemoryGateway, PlanExecutor, ToolExecutionContext, ToolInvoker, ToolOutput,
};
use crate::services::planner::{POLICY_PARAM, POLICY_REFUSAL_PARAM};
use crate::services::policy_engine::{PolicyAction, PolicyEngine, COMMAND_EXECUTION};
use crate::services::verifiers::{run_verifier, status_mirror, VerifierRegistry};

/// Verifier name recorded when a tool call was refused by policy.
const POLICY_VERIFIER: &str = "policy";
/// Longest tool result excerpt included in a synthesized response.
const RESULT_EXCERPT_CHARS: usize = 160;

/// Result of one step before it is folded into the execution.
struct StepOutcome {
    success: bool,
    result: Option<Value>,
    error: Option<String>,
    /// Unexpected failure: fails the whole plan.
    fatal: bool,
}

impl StepOutcome {
    fn ok(result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            fatal: false,
        }
    }

    fn soft_failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            fatal: false,
        }
    }

    fn unexpected(error: impl Into<String>) -> Self {
        Self {
            fatal: true,
            ..Self::soft_failure(error)
        }
    }
}

/// Mutable state accumulated across one plan run.
struct RunState {
    steps_executed: Vec<ExecutionResult>,
    tool_results: Vec<ToolCallResult>,
    errors: Vec<String>,
    summary: VerificationSummary,
    success: bool,
    output: String,
}

impl RunState {
    fn new() -> Self {
        Self {
            steps_executed: Vec::new(),
            tool_results: Vec::new(),
            errors: Vec::new(),
            summary: VerificationSummary::default(),
            success: true,
            output: String::new(),
        }
    }

    fn into_execution(self) -> Execution {
        Execution {
            steps_executed: self.steps_executed,
            success: self.success,
            output: self.output,
            tool_results: self.tool_results,
            errors: self.errors,
            verification_summary: self.summary,
        }
    }
}

enum Invocation {
    Completed(ToolOutput),
    Failed(anyhow::Error),
    TimedOut(Duration),
}

/// Runs plans step by step against the policy engine, tool invoker and
/// verifier registry.
pub struct Executor {
    policy: Arc<PolicyEngine>,
    tools: Arc<dyn ToolInvoker>,
    verifiers: Arc<VerifierRegistry>,
    memory: Option<Arc<dyn MemoryGateway>>,
    tool_timeout: Option<Duration>,
}

impl Executor {
    /// Create an executor with no memory gateway and no tool timeout.
    pub fn new(
        policy: Arc<PolicyEngine>,
        tools: Arc<dyn ToolInvoker>,
        verifiers: Arc<VerifierRegistry>,
    ) -> Self {
        Self {
            policy,
            tools,
            verifiers,
            memory: None,
            tool_timeout: None,
        }
    }

    /// Wire `memory_access` steps to a gateway.
    #[must_use]
    pub fn with_memory(mut self, gateway: Arc<dyn MemoryGateway>) -> Self {
        self.memory = Some(gateway);
        self
    }

    /// Bound every tool invocation; an elapsed timeout fails that step.
    #[must_use]
    pub const fn with_tool_timeout(mut self, limit: Duration) -> Self {
        self.tool_timeout = Some(limit);
        self
    }

    /// The policy engine authorizing steps.
    pub const fn policy(&self) -> &Arc<PolicyEngine> {
        &self.policy
    }

    async fn run_step(
        &self,
        step: &PlanStep,
        user_id: &str,
        session_id: Option<&str>,
        state: &mut RunState,
    ) -> StepOutcome {
        match step.step_type {
            StepType::Respond => Self::respond(step, state),
            StepType::PolicyCheck => self.policy_check(step, user_id).await,
            StepType::ToolCall => self.tool_call(step, user_id, session_id, state).await,
            StepType::MemoryAccess => self.memory_access(step, user_id).await,
        }
    }

    fn respond(step: &PlanStep, state: &mut RunState) -> StepOutcome {
        let text = if let Some(policy) = step.param_str(POLICY_REFUSAL_PARAM) {
            debug!(step_id = %step.id, policy = policy, "responding with policy refusal");
            step.description.clone()
        } else {
            synthesize_response(&step.description, &state.tool_results)
        };
        state.output.clone_from(&text);
        StepOutcome::ok(json!({ "text": text }))
    }

    async fn policy_check(&self, step: &PlanStep, user_id: &str) -> StepOutcome {
        let policy = step.param_str(POLICY_PARAM).unwrap_or(COMMAND_EXECUTION);
        let verdict = self.policy.evaluate(COMMAND_EXECUTION, user_id);
        self.policy
            .record_decision(policy, user_id, verdict.decision, &verdict.reason)
            .await;

        if verdict.is_allowed() {
            StepOutcome::ok(json!({ "policy": policy, "decision": "allow" }))
        } else {
            info!(step_id = %step.id, policy = policy, user_id = user_id, "policy check denied");
            StepOutcome::soft_failure(format!(
                "policy check '{policy}' denied: {}",
                verdict.reason
            ))
        }
    }

    async fn memory_access(&self, step: &PlanStep, user_id: &str) -> StepOutcome {
        let Some(gateway) = &self.memory else {
            return StepOutcome::soft_failure("memory access is not wired");
        };
        match gateway.access(user_id, step).await {
            Ok(value) => StepOutcome::ok(value),
            Err(e) => StepOutcome::unexpected(format!("memory access failed: {e}")),
        }
    }

    async fn invoke(&self, tool_name: &str, params: &Value, ctx: &ToolExecutionContext) -> Invocation {
        let call = self.tools.execute(tool_name, params, ctx);
        let result = match self.tool_timeout {
            Some(limit) => match timeout(limit, call).await {
                Ok(result) => result,
                Err(_) => return Invocation::TimedOut(limit),
            },
            None => call.await,
        };
        match result {
            Ok(output) => Invocation::Completed(output),
            Err(e) => Invocation::Failed(e),
        }
    }

    async fn tool_call(
        &self,
        step: &PlanStep,
        user_id: &str,
        session_id: Option<&str>,
        state: &mut RunState,
    ) -> StepOutcome {
        let Some(tool_name) = step.tool_name.as_deref().filter(|n| !n.trim().is_empty()) else {
            return StepOutcome::unexpected("tool_call step has no tool name");
        };
        let params = step
            .tool_params
            .clone()
            .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
        let action = PolicyAction::tool(tool_name);

        let verdict = self.policy.evaluate(&action, user_id);
        if !verdict.is_allowed() {
            self.policy
                .record_decision(&action, user_id, Decision::Deny, &verdict.reason)
                .await;
            info!(step_id = %step.id, tool = tool_name, user_id = user_id, "tool call denied");

            let verification = VerificationOutcome::skipped(POLICY_VERIFIER);
            state.summary.record(verification.status);
            state.tool_results.push(ToolCallResult {
                tool_id: Uuid::new_v4().to_string(),
                tool_name: tool_name.to_string(),
                input: params,
                result: None,
                error: Some(verdict.reason.clone()),
                status: ToolCallStatus::PermissionDenied,
                timestamp: Utc::now(),
                verification: Some(verification),
                citations: Vec::new(),
            });
            return StepOutcome::soft_failure(format!(
                "permission denied for tool '{tool_name}': {}",
                verdict.reason
            ));
        }

        let ctx = ToolExecutionContext {
            user_id: user_id.to_string(),
            session_id: session_id.map(str::to_string),
            timestamp: Utc::now(),
        };
        debug!(step_id = %step.id, tool = tool_name, "invoking tool");
        let invocation = self.invoke(tool_name, &params, &ctx).await;

        self.policy
            .record_decision(&action, user_id, Decision::Allow, &verdict.reason)
            .await;

        let required = step.verification.as_ref().map_or(true, |v| v.required);
        let verifier_type = step
            .verification
            .as_ref()
            .and_then(|v| v.verifier_type.as_deref());
        let expected = step.verification.as_ref().and_then(|v| v.expected.as_ref());

        let (status, data, error, citations, verification, fatal) = match invocation {
            Invocation::Completed(output) => {
                let data = output.data.clone().unwrap_or(Value::Null);
                let verification = if output.success {
                    match self.verifiers.resolve(tool_name, verifier_type) {
                        Some(verifier) => run_verifier(verifier.as_ref(), &data, expected),
                        None => status_mirror(true, None),
                    }
                } else {
                    status_mirror(false, output.error.as_deref())
                };
                let status = tool_status(&output);
                (status, Some(data), output.error, output.citations, verification, false)
            }
            Invocation::Failed(e) => {
                let message = format!("tool '{tool_name}' failed: {e}");
                warn!(step_id = %step.id, tool = tool_name, error = %e, "tool invocation raised an error");
                let verification = status_mirror(false, Some(&message));
                (ToolCallStatus::Error, None, Some(message), Vec::new(), verification, true)
            }
            Invocation::TimedOut(limit) => {
                let message =
                    format!("tool '{tool_name}' timed out after {}ms", limit.as_millis());
                warn!(step_id = %step.id, tool = tool_name, "tool invocation timed out");
                let verification = status_mirror(false, Some(&message));
                (ToolCallStatus::Timeout, None, Some(message), Vec::new(), verification, true)
            }
        };

        debug!(
            step_id = %step.id,
            tool = tool_name,
            verifier = %verification.verifier,
            verification = ?verification.status,
            required = required,
            "tool result verified"
        );
        state.summary.record(verification.status);

        let verification_failed = verification.status == VerificationStatus::Failed;
        if verification_failed && required {
            state.success = false;
        }

        let step_success = status == ToolCallStatus::Success && !verification_failed;
        let step_error = error.clone().or_else(|| {
            verification_failed.then(|| verification.errors.join("; "))
        });

        state.tool_results.push(ToolCallResult {
            tool_id: Uuid::new_v4().to_string(),
            tool_name: tool_name.to_string(),
            input: params,
            result: data.clone(),
            error,
            status,
            timestamp: Utc::now(),
            verification: Some(verification),
            citations,
        });

        StepOutcome {
            success: step_success,
            result: data,
            error: step_error,
            fatal,
        }
    }
}

fn tool_status(output: &ToolOutput) -> ToolCallStatus {
    match output.status.as_deref() {
        Some("timeout") => ToolCallStatus::Timeout,
        Some("permission_denied") => ToolCallStatus::PermissionDenied,
        _ if output.success => ToolCallStatus::Success,
        _ => ToolCallStatus::Error,
    }
}

fn excerpt(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    if text.chars().count() > RESULT_EXCERPT_CHARS {
        let cut: String = text.chars().take(RESULT_EXCERPT_CHARS).collect();
        format!("{cut}...")
    } else {
        text
    }
}

/// Response text: the step description, then one line per successful tool result.
pub fn synthesize_response(description: &str, tool_results: &[ToolCallResult]) -> String {
    let mut text = description.trim().to_string();
    let successful: Vec<&ToolCallResult> = tool_results
        .iter()
        .filter(|r| r.status == ToolCallStatus::Success)
        .collect();

    if successful.is_empty() {
        return text;
    }
    if !text.is_empty() {
        text.push_str("\n\n");
    }
    text.push_str("Based on:");
    for result in successful {
        let body = result.result.as_ref().map(excerpt).unwrap_or_default();
        let _ = write!(text, "\n- {}: {body}", result.tool_name);
    }
    text
}

#[async_trait]
impl PlanExecutor for Executor {
    async fn execute_plan(&self, plan: &Plan, user_id: &str, session_id: Option<&str>) -> Execution {
        let mut state = RunState::new();

        for step in &plan.steps {
            let started = Instant::now();
            let outcome = self.run_step(step, user_id, session_id, &mut state).await;
            let duration = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            if let Some(error) = &outcome.error {
                state.errors.push(format!("{}: {error}", step.id));
            }
            if outcome.fatal {
                state.success = false;
            }

            state.steps_executed.push(ExecutionResult {
                step_id: step.id.clone(),
                step_type: step.step_type,
                duration,
                success: outcome.success,
                result: outcome.result,
                error: outcome.error,
            });
        }

        info!(
            user_id = user_id,
            steps = state.steps_executed.len(),
            success = state.success,
            errors = state.errors.len(),
            verified = state.summary.verified,
            verification_failed = state.summary.failed,
            "plan executed"
        );
        state.into_execution()
    }
}
