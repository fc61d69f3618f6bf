//! Static analysis results for plans and scored plan candidates.

use serde::{Deserialize, Serialize};

use super::plan::Plan;

/// Classification of a constraint issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    /// Structural validation of the plan itself failed.
    Validation,
    /// A step depends on an id that is not in the plan.
    Dependency,
    /// Step dependencies form a cycle.
    Cycle,
    /// A tool step names a tool that is missing or unregistered.
    Tool,
    /// Duplicate step ids or similar shape problems.
    Structure,
}

impl IssueType {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Dependency => "dependency",
            Self::Cycle => "cycle",
            Self::Tool => "tool",
            Self::Structure => "structure",
        }
    }
}

/// One problem found while analyzing a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintIssue {
    /// Issue classification, serialized as `type`.
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    /// Human-readable description.
    pub message: String,
    /// Step the issue was found at, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_id: Option<String>,
}

impl ConstraintIssue {
    /// Create an issue not tied to a step.
    pub fn new(issue_type: IssueType, message: impl Into<String>) -> Self {
        Self {
            issue_type,
            message: message.into(),
            step_id: None,
        }
    }

    /// Attach the issue to a step.
    #[must_use]
    pub fn at_step(mut self, step_id: impl Into<String>) -> Self {
        self.step_id = Some(step_id.into());
        self
    }
}

/// Result of analyzing a plan. `valid` holds exactly when `issues` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintAnalysis {
    /// True when no issues were found.
    pub valid: bool,
    /// Issues in detection order.
    pub issues: Vec<ConstraintIssue>,
}

impl ConstraintAnalysis {
    /// Build an analysis, deriving `valid` from `issues`.
    pub fn from_issues(issues: Vec<ConstraintIssue>) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
        }
    }

    /// Whether any issue has the given type.
    pub fn has_issue_type(&self, issue_type: IssueType) -> bool {
        self.issues.iter().any(|i| i.issue_type == issue_type)
    }

    /// Issues of the given type.
    pub fn issues_of(&self, issue_type: IssueType) -> impl Iterator<Item = &ConstraintIssue> {
        self.issues
            .iter()
            .filter(move |i| i.issue_type == issue_type)
    }
}

/// Label identifying how a candidate was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateLabel {
    /// The planner's plan as generated.
    Primary,
    /// The primary plan with a policy check step prepended.
    PolicyGuard,
    /// A single respond step with no tools.
    RespondOnly,
}

impl CandidateLabel {
    /// Generation order; ties in score keep this order.
    pub const ALL: [Self; 3] = [Self::Primary, Self::PolicyGuard, Self::RespondOnly];

    /// Snake-case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::PolicyGuard => "policy_guard",
            Self::RespondOnly => "respond_only",
        }
    }
}

/// A scored alternative plan considered before selection. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanCandidate {
    /// `candidate-{label}`.
    pub id: String,
    /// How the candidate was generated.
    pub label: CandidateLabel,
    /// The candidate plan.
    pub plan: Plan,
    /// Issues found by the solver.
    pub issues: Vec<ConstraintIssue>,
    /// Full solver analysis.
    pub analysis: ConstraintAnalysis,
    /// In [0, 1].
    pub score: f64,
}
