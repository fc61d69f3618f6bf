//! Policy-first plan generation.
//!
//! Locked facts are consulted before anything task-specific: a recognised
//! refusal fact short-circuits to a single refusal step, a recognised guard
//! fact prepends a `policy_check` step. Only the keys in [`FACT_POLICIES`]
//! are enforced; other locked facts are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::models::{Intent, Plan, PlanStep, StepVerification, UserFact};

/// Annotation key on a refusal `respond` step.
pub const POLICY_REFUSAL_PARAM: &str = "policy_refusal";
/// Annotation key on a guard `policy_check` step.
pub const POLICY_PARAM: &str = "policy";

/// Locked-fact key: refuse to answer tool-less queries from guesswork.
pub const NEVER_GUESS: &str = "never_guess";
/// Locked-fact key: guard acting steps with a policy check.
pub const DO_NOT_REPEAT: &str = "do_not_repeat";

/// Behavior triggered by a locked fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactPolicy {
    /// Refuse tool-less queries instead of answering from guesswork.
    RefuseToollessQuery,
    /// Prepend a `policy_check` step ahead of acting steps.
    GuardStep,
}

/// Locked-fact keys the planner enforces.
pub const FACT_POLICIES: &[(&str, FactPolicy)] = &[
    (NEVER_GUESS, FactPolicy::RefuseToollessQuery),
    (DO_NOT_REPEAT, FactPolicy::GuardStep),
];

/// Look up the policy for a locked-fact key.
pub fn fact_policy(fact_key: &str) -> Option<FactPolicy> {
    FACT_POLICIES
        .iter()
        .find(|(key, _)| *key == fact_key)
        .map(|(_, policy)| *policy)
}

/// A tool the caller suggests for a tooling intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolHint {
    /// Tool to call.
    pub tool_name: String,
    /// Parameters for the call.
    #[serde(default = "empty_object")]
    pub params: Value,
    /// Verifier to apply to the result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier_type: Option<String>,
    /// Whether a failed verification fails the plan.
    #[serde(default = "default_true")]
    pub verification_required: bool,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

const fn default_true() -> bool {
    true
}

impl ToolHint {
    /// A hint requiring verification with the tool's default verifier.
    pub fn new(tool_name: impl Into<String>, params: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            params,
            verifier_type: None,
            verification_required: true,
        }
    }

    /// Choose the verifier.
    #[must_use]
    pub fn with_verifier(mut self, verifier_type: impl Into<String>) -> Self {
        self.verifier_type = Some(verifier_type.into());
        self
    }

    /// Record failed verification without failing the plan.
    #[must_use]
    pub const fn optional_verification(mut self) -> Self {
        self.verification_required = false;
        self
    }
}

/// Caller-supplied context for one planning pass.
#[derive(Debug, Clone, Default)]
pub struct PlanningContext {
    /// Active locked facts for the user.
    pub locked_facts: Vec<UserFact>,
    /// Suggested tools, in call order.
    pub tool_hints: Vec<ToolHint>,
    /// Scope for memory access steps.
    pub memory_scope: Option<String>,
}

impl PlanningContext {
    /// An empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only locked facts that are unexpired at `now`.
    pub fn from_facts(facts: &[UserFact], now: DateTime<Utc>) -> Self {
        Self {
            locked_facts: facts
                .iter()
                .filter(|f| f.is_active_lock(now))
                .cloned()
                .collect(),
            ..Self::default()
        }
    }

    /// Add a locked fact.
    #[must_use]
    pub fn with_locked_fact(mut self, fact: UserFact) -> Self {
        self.locked_facts.push(fact);
        self
    }

    /// Add a tool hint.
    #[must_use]
    pub fn with_tool_hint(mut self, hint: ToolHint) -> Self {
        self.tool_hints.push(hint);
        self
    }

    /// Add several tool hints.
    #[must_use]
    pub fn with_tool_hints(mut self, hints: impl IntoIterator<Item = ToolHint>) -> Self {
        self.tool_hints.extend(hints);
        self
    }

    /// Set the memory scope.
    #[must_use]
    pub fn with_memory_scope(mut self, scope: impl Into<String>) -> Self {
        self.memory_scope = Some(scope.into());
        self
    }

    /// Whether any locked fact maps to `policy`.
    pub fn has_policy(&self, policy: FactPolicy) -> bool {
        self.locked_facts
            .iter()
            .any(|f| fact_policy(&f.fact_key) == Some(policy))
    }
}

// Sequential step ids: step-1, step-2, ...
struct StepIds(usize);

impl StepIds {
    fn next(&mut self) -> String {
        self.0 += 1;
        format!("step-{}", self.0)
    }
}

/// Turns an intent into a plan.
#[derive(Debug, Clone, Copy, Default)]
pub struct Planner;

impl Planner {
    /// Create a planner.
    pub const fn new() -> Self {
        Self
    }

    /// Generate a plan for `intent`.
    pub fn generate_plan(&self, intent: &Intent, context: Option<&PlanningContext>) -> Plan {
        let empty = PlanningContext::default();
        let context = context.unwrap_or(&empty);

        let plan = if intent.is_toolless_query()
            && context.has_policy(FactPolicy::RefuseToollessQuery)
        {
            Self::refusal_plan()
        } else {
            Self::task_plan(intent, context)
        };

        debug!(
            category = intent.category.as_str(),
            steps = plan.steps.len(),
            complexity = ?plan.estimated_complexity,
            tools = ?plan.tools_needed,
            "plan generated"
        );
        plan
    }

    fn refusal_plan() -> Plan {
        let step = PlanStep::respond(
            "step-1",
            "I won't guess at this. Could you share the details you want me to use?",
        )
        .with_param(POLICY_REFUSAL_PARAM, NEVER_GUESS);

        Plan::from_steps(
            vec![step],
            "A locked never_guess preference forbids answering a tool-less query from guesswork",
        )
    }

    fn task_plan(intent: &Intent, context: &PlanningContext) -> Plan {
        let mut ids = StepIds(0);
        let mut steps = Vec::new();
        let mut reasons = vec![format!("{} intent", intent.category.as_str())];

        let guard_id = if context.has_policy(FactPolicy::GuardStep) {
            let id = ids.next();
            steps.push(
                PlanStep::policy_check(&id, "Confirm the reply will not repeat earlier content")
                    .with_param(POLICY_PARAM, DO_NOT_REPEAT),
            );
            reasons.push("guarded by do_not_repeat".to_string());
            Some(id)
        } else {
            None
        };

        let mut gathered = Vec::new();

        if intent.requires_memory {
            let id = ids.next();
            let mut step = PlanStep::memory_access(&id, "Recall relevant user memory");
            if let Some(scope) = &context.memory_scope {
                step = step.with_param("scope", scope.as_str());
            }
            steps.push(step);
            gathered.push(id);
            reasons.push("memory lookup required".to_string());
        }

        if intent.requires_tooling {
            if context.tool_hints.is_empty() {
                reasons.push("tooling requested but no tools were suggested".to_string());
            }
            for hint in &context.tool_hints {
                let id = ids.next();
                let mut verification = if hint.verification_required {
                    StepVerification::required()
                } else {
                    StepVerification::optional()
                };
                if let Some(kind) = &hint.verifier_type {
                    verification = verification.with_verifier(kind.as_str());
                }
                let mut step = PlanStep::tool_call(
                    &id,
                    format!("Call {}", hint.tool_name),
                    &hint.tool_name,
                    hint.params.clone(),
                )
                .with_verification(verification);
                if let Some(guard) = &guard_id {
                    step.add_dependency(guard.as_str());
                }
                steps.push(step);
                gathered.push(id);
            }
            if !context.tool_hints.is_empty() {
                reasons.push(format!("{} tool call(s)", context.tool_hints.len()));
            }
        }

        let description = if intent.description.trim().is_empty() {
            "Respond to the user".to_string()
        } else {
            intent.description.clone()
        };
        let mut respond = PlanStep::respond(ids.next(), description);
        if let Some(guard) = &guard_id {
            respond.add_dependency(guard.as_str());
        }
        for dep in gathered {
            respond.add_dependency(dep);
        }
        steps.push(respond);

        Plan::from_steps(steps, reasons.join("; "))
    }
}
