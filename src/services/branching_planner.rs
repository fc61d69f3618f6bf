//! Candidate generation, scoring and selection.
//!
//! Candidates are built in a fixed order (primary, policy guard, respond
//! only), analyzed by the [`ConstraintSolver`] and scored. A stable sort keeps
//! generation order among equal scores.

use serde::Serialize;
use tracing::{debug, info};

use crate::domain::models::{
    CandidateLabel, Complexity, ConstraintAnalysis, Intent, IssueType, Plan, PlanCandidate,
    PlanStep, StepType,
};
use crate::services::constraint_solver::ConstraintSolver;
use crate::services::planner::{Planner, PlanningContext, POLICY_PARAM};

/// Upper bound on candidates per request.
pub const MAX_CANDIDATES: usize = 3;

const ISSUE_PENALTY: f64 = 0.12;
const ISSUE_PENALTY_CAP: f64 = 0.75;
const CYCLE_PENALTY: f64 = 0.25;
const VALIDATION_PENALTY: f64 = 0.20;
const MISSING_TOOLS_PENALTY: f64 = 0.20;
const MISSING_MEMORY_PENALTY: f64 = 0.05;
const COMPLEXITY_PENALTY: f64 = 0.05;

/// Score a plan for an intent given its analysis. Always within [0, 1].
#[allow(clippy::cast_precision_loss)]
pub fn score_plan(intent: &Intent, plan: &Plan, analysis: &ConstraintAnalysis) -> f64 {
    let mut score = 1.0;

    score -= (analysis.issues.len() as f64 * ISSUE_PENALTY).min(ISSUE_PENALTY_CAP);
    if analysis.has_issue_type(IssueType::Cycle) {
        score -= CYCLE_PENALTY;
    }
    if analysis.has_issue_type(IssueType::Validation) {
        score -= VALIDATION_PENALTY;
    }
    if intent.requires_tooling && !plan.has_step_type(StepType::ToolCall) {
        score -= MISSING_TOOLS_PENALTY;
    }
    if intent.requires_memory && !plan.has_step_type(StepType::MemoryAccess) {
        score -= MISSING_MEMORY_PENALTY;
    }
    if plan.estimated_complexity == Complexity::Complex {
        score -= COMPLEXITY_PENALTY;
    }

    score.clamp(0.0, 1.0)
}

/// Copy of `plan` with a guard `policy_check` step at the front that every
/// `respond` and `tool_call` step depends on.
pub fn with_policy_guard(plan: &Plan) -> Plan {
    let mut guard_id = "policy-guard".to_string();
    let mut suffix = 1;
    while plan.step(&guard_id).is_some() {
        suffix += 1;
        guard_id = format!("policy-guard-{suffix}");
    }

    let guard = PlanStep::policy_check(&guard_id, "Authorize before acting")
        .with_param(POLICY_PARAM, "policy_guard");

    let mut steps = Vec::with_capacity(plan.steps.len() + 1);
    steps.push(guard);
    for step in &plan.steps {
        let mut step = step.clone();
        if step.step_type.is_guardable() {
            step.add_dependency(guard_id.as_str());
        }
        steps.push(step);
    }

    let mut guarded = Plan {
        steps,
        reasoning: format!("{}; guarded by a policy check", plan.reasoning),
        ..plan.clone()
    };
    guarded.refresh_derived();
    guarded
}

/// Minimal one-step plan with no tools and no memory.
pub fn respond_only_plan(intent: &Intent) -> Plan {
    let description = if intent.description.trim().is_empty() {
        "Respond to the user directly".to_string()
    } else {
        intent.description.clone()
    };
    Plan::from_steps(
        vec![PlanStep::respond("step-1", description)],
        "Minimal safe response without tools or memory",
    )
}

/// Selected plan plus every scored candidate, best first.
#[derive(Debug, Clone, Serialize)]
pub struct BranchOutcome {
    /// Plan of the best-scoring candidate.
    pub plan: Plan,
    /// Candidates ranked by score.
    pub candidates: Vec<PlanCandidate>,
}

impl BranchOutcome {
    /// The winning candidate.
    pub fn selected(&self) -> Option<&PlanCandidate> {
        self.candidates.first()
    }
}

/// Generates and ranks alternative plans.
#[derive(Clone)]
pub struct BranchingPlanner {
    planner: Planner,
    solver: ConstraintSolver,
    max_candidates: usize,
}

impl BranchingPlanner {
    /// `max_candidates` is clamped to `1..=3`.
    pub fn new(planner: Planner, solver: ConstraintSolver, max_candidates: usize) -> Self {
        Self {
            planner,
            solver,
            max_candidates: max_candidates.clamp(1, MAX_CANDIDATES),
        }
    }

    /// Candidates generated per pass.
    pub const fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    /// The solver used for scoring.
    pub const fn solver(&self) -> &ConstraintSolver {
        &self.solver
    }

    /// Generate, score and rank candidates for `intent`.
    pub fn generate(&self, intent: &Intent, context: Option<&PlanningContext>) -> BranchOutcome {
        let primary = self.planner.generate_plan(intent, context);

        let mut candidates: Vec<PlanCandidate> = CandidateLabel::ALL
            .iter()
            .take(self.max_candidates)
            .map(|label| {
                let plan = match label {
                    CandidateLabel::Primary => primary.clone(),
                    CandidateLabel::PolicyGuard => with_policy_guard(&primary),
                    CandidateLabel::RespondOnly => respond_only_plan(intent),
                };
                self.candidate(*label, plan, intent)
            })
            .collect();

        // Vec::sort_by is stable.
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

        let plan = candidates
            .first()
            .map_or_else(|| primary.clone(), |c| c.plan.clone());

        if let Some(best) = candidates.first() {
            info!(
                selected = best.label.as_str(),
                score = best.score,
                candidates = candidates.len(),
                "plan candidate selected"
            );
        }

        BranchOutcome { plan, candidates }
    }

    fn candidate(&self, label: CandidateLabel, plan: Plan, intent: &Intent) -> PlanCandidate {
        let analysis = self.solver.analyze(&plan);
        let score = score_plan(intent, &plan, &analysis);
        debug!(
            label = label.as_str(),
            score = score,
            issues = analysis.issues.len(),
            "candidate scored"
        );
        PlanCandidate {
            id: format!("candidate-{}", label.as_str()),
            label,
            issues: analysis.issues.clone(),
            analysis,
            plan,
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::StaticToolRegistry;
    use crate::domain::models::{ConstraintIssue, IntentCategory};
    use crate::services::constraint_solver::ConstraintSolverConfig;
    use crate::services::planner::ToolHint;
    use serde_json::json;
    use std::sync::Arc;

    fn branching(max: usize) -> BranchingPlanner {
        let solver = ConstraintSolver::new(
            Arc::new(StaticToolRegistry::from_names(["web_search"])),
            ConstraintSolverConfig::default(),
        );
        BranchingPlanner::new(Planner::new(), solver, max)
    }

    #[test]
    fn test_score_penalties() {
        let intent = Intent::new(IntentCategory::Query, "x").with_tooling(true);
        let plan = respond_only_plan(&intent);
        let clean = ConstraintAnalysis::from_issues(vec![]);
        assert!((score_plan(&intent, &plan, &clean) - 0.8).abs() < 1e-9);

        let cyclic = ConstraintAnalysis::from_issues(vec![ConstraintIssue::new(
            IssueType::Cycle,
            "loop",
        )]);
        let expected = 1.0 - 0.12 - 0.25 - 0.20;
        assert!((score_plan(&intent, &plan, &cyclic) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_score_clamps_to_zero() {
        let intent = Intent::new(IntentCategory::Query, "x")
            .with_tooling(true)
            .with_memory(true);
        let plan = respond_only_plan(&intent);
        let issues = (0..10)
            .map(|_| ConstraintIssue::new(IssueType::Validation, "bad"))
            .chain(std::iter::once(ConstraintIssue::new(IssueType::Cycle, "loop")))
            .collect();
        let analysis = ConstraintAnalysis::from_issues(issues);
        assert!(score_plan(&intent, &plan, &analysis).abs() < f64::EPSILON);
    }

    #[test]
    fn test_guard_wraps_acting_steps() {
        let plan = Plan::from_steps(
            vec![
                PlanStep::memory_access("m", "recall"),
                PlanStep::tool_call("t", "search", "web_search", json!({})),
                PlanStep::respond("r", "answer"),
            ],
            "base",
        );
        let guarded = with_policy_guard(&plan);
        assert_eq!(guarded.steps[0].step_type, StepType::PolicyCheck);
        let guard_id = guarded.steps[0].id.clone();
        assert!(!guarded.steps[1].dependencies.contains(&guard_id));
        assert!(guarded.steps[2].dependencies.contains(&guard_id));
        assert!(guarded.steps[3].dependencies.contains(&guard_id));
    }

    #[test]
    fn test_guard_id_is_unique() {
        let plan = Plan::from_steps(vec![PlanStep::respond("policy-guard", "hi")], "base");
        let guarded = with_policy_guard(&plan);
        assert_eq!(guarded.steps[0].id, "policy-guard-2");
    }

    #[test]
    fn test_tooling_intent_keeps_tool_plan_on_top() {
        let intent = Intent::new(IntentCategory::Query, "news").with_tooling(true);
        let ctx = PlanningContext::new().with_tool_hint(ToolHint::new("web_search", json!({})));
        let outcome = branching(3).generate(&intent, Some(&ctx));

        assert_eq!(outcome.candidates.len(), 3);
        assert_eq!(outcome.candidates[0].label, CandidateLabel::Primary);
        assert!(outcome.plan.has_step_type(StepType::ToolCall));
        assert_eq!(
            outcome.candidates.last().map(|c| c.label),
            Some(CandidateLabel::RespondOnly)
        );
        assert!(outcome
            .candidates
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_equal_scores_keep_generation_order() {
        let intent = Intent::new(IntentCategory::Conversation, "hello");
        let outcome = branching(3).generate(&intent, None);
        let labels: Vec<_> = outcome.candidates.iter().map(|c| c.label).collect();
        assert_eq!(
            labels,
            vec![
                CandidateLabel::Primary,
                CandidateLabel::PolicyGuard,
                CandidateLabel::RespondOnly
            ]
        );
    }

    #[test]
    fn test_max_candidates_truncates() {
        let intent = Intent::new(IntentCategory::Conversation, "hello");
        assert_eq!(branching(1).generate(&intent, None).candidates.len(), 1);
        assert_eq!(branching(0).max_candidates(), 1);
        assert_eq!(branching(9).max_candidates(), 3);
    }
}
