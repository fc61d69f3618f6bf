//! Execution results for steps, tool calls and whole plans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::plan::StepType;

/// Outcome status of a verification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    /// The result matched expectations.
    Verified,
    /// The result did not match expectations.
    Failed,
    /// No verification ran.
    Skipped,
}

/// Result of running a verifier (or the status mirror) over a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// Overall status.
    pub status: VerificationStatus,
    /// Name of the verifier that ran.
    pub verifier: String,
    /// Reasons for failure, empty unless failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Verifier-specific details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl VerificationOutcome {
    /// A passing outcome.
    pub fn verified(verifier: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Verified,
            verifier: verifier.into(),
            errors: Vec::new(),
            details: None,
        }
    }

    /// A failing outcome with reasons.
    pub fn failed(verifier: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            status: VerificationStatus::Failed,
            verifier: verifier.into(),
            errors,
            details: None,
        }
    }

    /// An outcome for a verification that did not run.
    pub fn skipped(verifier: impl Into<String>) -> Self {
        Self {
            status: VerificationStatus::Skipped,
            verifier: verifier.into(),
            errors: Vec::new(),
            details: None,
        }
    }

    /// Attach details.
    #[must_use]
    pub fn with_details(mut self, details: Option<Value>) -> Self {
        self.details = details;
        self
    }
}

/// Result of executing a single plan step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Id of the executed step.
    pub step_id: String,
    /// Step type, serialized as `type`.
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// Wall-clock duration in milliseconds.
    pub duration: u64,
    /// Whether the step succeeded.
    pub success: bool,
    /// Step output, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure reason, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Status of a tool invocation as seen by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCallStatus {
    /// The tool ran.
    Success,
    /// The tool or its invoker failed.
    Error,
    /// Policy refused the call.
    PermissionDenied,
    /// The call exceeded the tool timeout.
    Timeout,
}

/// Record of one tool invocation (or denied attempt).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Step id the call was made from.
    pub tool_id: String,
    /// Name of the invoked tool.
    pub tool_name: String,
    /// Parameters passed to the tool.
    pub input: Value,
    /// Data returned by the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error reported by the tool or executor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Invocation status.
    pub status: ToolCallStatus,
    /// When the call completed.
    pub timestamp: DateTime<Utc>,
    /// Verification of the returned data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationOutcome>,
    /// Citations returned with the data.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Value>,
}

/// Tally of verification outcomes across tool steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSummary {
    /// Number of verified results.
    pub verified: u32,
    /// Number of failed verifications.
    pub failed: u32,
    /// Number of skipped verifications.
    pub skipped: u32,
}

impl VerificationSummary {
    /// Count one outcome.
    pub fn record(&mut self, status: VerificationStatus) {
        match status {
            VerificationStatus::Verified => self.verified += 1,
            VerificationStatus::Failed => self.failed += 1,
            VerificationStatus::Skipped => self.skipped += 1,
        }
    }

    /// Sum of all counts.
    pub const fn total(&self) -> u32 {
        self.verified + self.failed + self.skipped
    }
}

/// Result of executing a whole plan.
///
/// `success` is false whenever a required verification failed or a step
/// raised an unexpected error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    /// Per-step results in execution order.
    pub steps_executed: Vec<ExecutionResult>,
    /// Overall plan success.
    pub success: bool,
    /// Synthesized response text.
    pub output: String,
    /// Tool calls made, including denied ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolCallResult>,
    /// Failures that made the plan unsuccessful, as `step: reason`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Verification tally over tool steps.
    pub verification_summary: VerificationSummary,
}

/// Record of what backtracking did for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflectionDelta {
    /// At least 1.
    pub attempts: u32,
    /// True when the fallback plan succeeded after a failure.
    pub recovered: bool,
    /// Errors from the first attempt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub original_errors: Vec<String>,
    /// Whether the fallback plan ran.
    pub fallback_plan_applied: bool,
}

impl ReflectionDelta {
    /// Delta for a request that needed no fallback.
    pub const fn first_attempt_succeeded() -> Self {
        Self {
            attempts: 1,
            recovered: false,
            original_errors: Vec::new(),
            fallback_plan_applied: false,
        }
    }
}
