//! Plan domain model.
//!
//! A [`Plan`] is an ordered list of [`PlanStep`]s produced for one user turn.
//! Execution order is list order. Step `dependencies` describe a graph that
//! the constraint solver validates (missing nodes, cycles) but the executor
//! does not reorder by; guard steps rely on their list position.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashSet};

/// Kind of work a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    /// Produce the reply text.
    Respond,
    /// Invoke a registered tool.
    ToolCall,
    /// Read stored conversation memory.
    MemoryAccess,
    /// Evaluate a policy before acting.
    PolicyCheck,
}

impl StepType {
    /// Snake-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Respond => "respond",
            Self::ToolCall => "tool_call",
            Self::MemoryAccess => "memory_access",
            Self::PolicyCheck => "policy_check",
        }
    }

    /// Steps that act on behalf of the user and may be guarded.
    pub fn is_guardable(&self) -> bool {
        matches!(self, Self::Respond | Self::ToolCall)
    }
}

/// Verification requirements attached to a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepVerification {
    /// A failed verification fails the plan when set.
    pub required: bool,
    /// Verifier to use instead of the tool's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier_type: Option<String>,
    /// Expectations handed to the verifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
}

impl StepVerification {
    /// Verification whose failure fails the plan.
    pub fn required() -> Self {
        Self {
            required: true,
            verifier_type: None,
            expected: None,
        }
    }

    /// Verification whose failure is only recorded.
    pub fn optional() -> Self {
        Self {
            required: false,
            ..Self::required()
        }
    }

    /// Choose the verifier.
    #[must_use]
    pub fn with_verifier(mut self, verifier_type: impl Into<String>) -> Self {
        self.verifier_type = Some(verifier_type.into());
        self
    }

    /// Set the expectations.
    #[must_use]
    pub fn with_expected(mut self, expected: Value) -> Self {
        self.expected = Some(expected);
        self
    }
}

/// One unit of work within a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    /// Unique within the plan.
    pub id: String,
    /// Step kind, serialized as `type`.
    #[serde(rename = "type")]
    pub step_type: StepType,
    /// What the step does.
    pub description: String,
    /// Tool to invoke; required for tool steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Parameters passed to the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_params: Option<Value>,
    /// Ids of steps this one depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    /// How to verify the tool result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<StepVerification>,
    /// Free-form annotations, e.g. `policy_refusal` or `policy`.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl PlanStep {
    /// Create a step with no tool, dependencies or annotations.
    pub fn new(id: impl Into<String>, step_type: StepType, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            step_type,
            description: description.into(),
            tool_name: None,
            tool_params: None,
            dependencies: Vec::new(),
            verification: None,
            params: Map::new(),
        }
    }

    /// A respond step.
    pub fn respond(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(id, StepType::Respond, description)
    }

    /// A tool call step.
    pub fn tool_call(
        id: impl Into<String>,
        description: impl Into<String>,
        tool_name: impl Into<String>,
        tool_params: Value,
    ) -> Self {
        let mut step = Self::new(id, StepType::ToolCall, description);
        step.tool_name = Some(tool_name.into());
        step.tool_params = Some(tool_params);
        step
    }

    /// A memory access step.
    pub fn memory_access(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(id, StepType::MemoryAccess, description)
    }

    /// A policy check step.
    pub fn policy_check(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(id, StepType::PolicyCheck, description)
    }

    /// Add a dependency.
    #[must_use]
    pub fn with_dependency(mut self, step_id: impl Into<String>) -> Self {
        self.add_dependency(step_id);
        self
    }

    /// Attach verification requirements.
    #[must_use]
    pub fn with_verification(mut self, verification: StepVerification) -> Self {
        self.verification = Some(verification);
        self
    }

    /// Set an annotation in `params`.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Add a dependency unless it is already present.
    pub fn add_dependency(&mut self, step_id: impl Into<String>) {
        let step_id = step_id.into();
        if !self.dependencies.contains(&step_id) {
            self.dependencies.push(step_id);
        }
    }

    /// Look up a string annotation in `params`.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// Rough size of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// One step.
    #[default]
    Simple,
    /// Two or three steps.
    Moderate,
    /// Four or more steps.
    Complex,
}

impl Complexity {
    /// Complexity implied by a step count.
    pub const fn for_step_count(steps: usize) -> Self {
        match steps {
            0 | 1 => Self::Simple,
            2 | 3 => Self::Moderate,
            _ => Self::Complex,
        }
    }
}

/// An ordered, justified sequence of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Steps in execution order.
    pub steps: Vec<PlanStep>,
    /// Why the plan looks the way it does.
    pub reasoning: String,
    /// Derived from the step count.
    pub estimated_complexity: Complexity,
    /// Every tool named by a step.
    #[serde(default)]
    pub tools_needed: BTreeSet<String>,
    /// Whether any step reads memory.
    #[serde(default)]
    pub memory_access_needed: bool,
}

impl Plan {
    /// Build a plan, deriving complexity, tools and memory flags from the steps.
    pub fn from_steps(steps: Vec<PlanStep>, reasoning: impl Into<String>) -> Self {
        let mut plan = Self {
            steps,
            reasoning: reasoning.into(),
            estimated_complexity: Complexity::Simple,
            tools_needed: BTreeSet::new(),
            memory_access_needed: false,
        };
        plan.refresh_derived();
        plan
    }

    /// Recompute `estimated_complexity`, `tools_needed` and `memory_access_needed`.
    pub fn refresh_derived(&mut self) {
        self.estimated_complexity = Complexity::for_step_count(self.steps.len());
        self.tools_needed = self
            .steps
            .iter()
            .filter_map(|s| s.tool_name.clone())
            .collect();
        self.memory_access_needed = self
            .steps
            .iter()
            .any(|s| s.step_type == StepType::MemoryAccess);
    }

    /// Find a step by id.
    pub fn step(&self, id: &str) -> Option<&PlanStep> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Whether any step has the given type.
    pub fn has_step_type(&self, step_type: StepType) -> bool {
        self.steps.iter().any(|s| s.step_type == step_type)
    }

    /// Tool call steps in order.
    pub fn tool_steps(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps
            .iter()
            .filter(|s| s.step_type == StepType::ToolCall)
    }

    /// Shape check independent of the tool registry and the dependency graph.
    ///
    /// Returns one violation per problem; empty means the plan is well formed.
    pub fn validate(&self) -> Vec<SchemaViolation> {
        let mut violations = Vec::new();

        if self.steps.is_empty() {
            violations.push(SchemaViolation::plan("plan must contain at least one step"));
        }
        if self.reasoning.trim().is_empty() {
            violations.push(SchemaViolation::plan("plan reasoning must not be empty"));
        }

        let mut used_tools = HashSet::new();
        for (index, step) in self.steps.iter().enumerate() {
            if step.id.trim().is_empty() {
                violations.push(SchemaViolation::plan(format!(
                    "step at position {index} has an empty id"
                )));
            }
            if step.description.trim().is_empty() {
                violations.push(SchemaViolation::step(
                    &step.id,
                    "step description must not be empty",
                ));
            }

            if step.step_type == StepType::ToolCall {
                match step.tool_name.as_deref().map(str::trim) {
                    Some(name) if !name.is_empty() => {
                        used_tools.insert(name.to_string());
                    }
                    _ => violations.push(SchemaViolation::step(
                        &step.id,
                        "tool_call step requires a tool name",
                    )),
                }
                if !step.tool_params.as_ref().is_some_and(Value::is_object) {
                    violations.push(SchemaViolation::step(
                        &step.id,
                        "tool_call step requires tool params as an object",
                    ));
                }
            }
        }

        for tool in used_tools {
            if !self.tools_needed.contains(&tool) {
                violations.push(SchemaViolation::plan(format!(
                    "tool '{tool}' is used by a step but missing from tools_needed"
                )));
            }
        }

        violations
    }

    /// True when `validate` finds nothing.
    pub fn is_well_formed(&self) -> bool {
        self.validate().is_empty()
    }
}

/// A single plan-shape problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaViolation {
    /// What is wrong.
    pub message: String,
    /// Offending step, if the problem is step-level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}

impl SchemaViolation {
    fn plan(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            step_id: None,
        }
    }

    fn step(step_id: &str, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            step_id: Some(step_id.to_string()),
        }
    }
}
