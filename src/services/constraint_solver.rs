//! Static structural validation of plans.
//!
//! All checks run in one pass and every applicable issue is collected; the
//! solver never repairs a plan.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use crate::domain::models::{ConstraintAnalysis, ConstraintIssue, IssueType, Plan, StepType};
use crate::domain::ports::ToolRegistry;

/// Configuration for the constraint solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstraintSolverConfig {
    /// Report `tool_call` steps whose tool is not in the registry.
    pub require_registered_tools: bool,
}

/// Validates plan shape, ids, dependencies, tools and cycles.
#[derive(Clone)]
pub struct ConstraintSolver {
    tools: Arc<dyn ToolRegistry>,
    config: ConstraintSolverConfig,
}

// Iterative DFS over the dependency graph from `root`; returns the step whose
// dependency closes a cycle. Frames are (node, index of next dependency).
fn find_back_edge<'a>(
    root: &'a str,
    graph: &HashMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
) -> Option<(&'a str, &'a str)> {
    let mut stack: Vec<(&'a str, usize)> = vec![(root, 0)];
    visited.insert(root);
    rec_stack.insert(root);

    while let Some(frame) = stack.last_mut() {
        let (node, next) = *frame;
        let neighbor = graph.get(node).and_then(|deps| deps.get(next)).copied();

        let Some(neighbor) = neighbor else {
            rec_stack.remove(node);
            stack.pop();
            continue;
        };
        frame.1 += 1;

        if rec_stack.contains(neighbor) {
            return Some((node, neighbor));
        }
        if visited.insert(neighbor) {
            rec_stack.insert(neighbor);
            stack.push((neighbor, 0));
        }
    }

    None
}

impl ConstraintSolver {
    /// Create a solver checking tools against `tools`.
    pub fn new(tools: Arc<dyn ToolRegistry>, config: ConstraintSolverConfig) -> Self {
        Self { tools, config }
    }

    /// The solver configuration.
    pub const fn config(&self) -> ConstraintSolverConfig {
        self.config
    }

    /// Analyze a plan. `valid` is true iff no issue was found.
    pub fn analyze(&self, plan: &Plan) -> ConstraintAnalysis {
        let mut issues: Vec<ConstraintIssue> = plan
            .validate()
            .into_iter()
            .map(|v| {
                let issue = ConstraintIssue::new(IssueType::Validation, v.message);
                match v.step_id {
                    Some(step_id) => issue.at_step(step_id),
                    None => issue,
                }
            })
            .collect();

        issues.extend(Self::duplicate_ids(plan));
        issues.extend(Self::missing_dependencies(plan));

        if self.config.require_registered_tools {
            issues.extend(self.unregistered_tools(plan));
        }

        if let Some(cycle) = Self::detect_cycle(plan) {
            issues.push(cycle);
        }

        let analysis = ConstraintAnalysis::from_issues(issues);
        debug!(
            steps = plan.steps.len(),
            valid = analysis.valid,
            issues = analysis.issues.len(),
            "plan analyzed"
        );
        analysis
    }

    fn duplicate_ids(plan: &Plan) -> Vec<ConstraintIssue> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut issues = Vec::new();

        for step in &plan.steps {
            if !seen.insert(step.id.as_str()) && reported.insert(step.id.as_str()) {
                issues.push(
                    ConstraintIssue::new(
                        IssueType::Structure,
                        format!("duplicate step id '{}'", step.id),
                    )
                    .at_step(&step.id),
                );
            }
        }

        issues
    }

    fn missing_dependencies(plan: &Plan) -> Vec<ConstraintIssue> {
        let ids: HashSet<&str> = plan.steps.iter().map(|s| s.id.as_str()).collect();
        let mut issues = Vec::new();

        for step in &plan.steps {
            for dep in &step.dependencies {
                if !ids.contains(dep.as_str()) {
                    issues.push(
                        ConstraintIssue::new(
                            IssueType::Dependency,
                            format!("step '{}' depends on unknown step '{dep}'", step.id),
                        )
                        .at_step(&step.id),
                    );
                }
            }
        }

        issues
    }

    fn unregistered_tools(&self, plan: &Plan) -> Vec<ConstraintIssue> {
        plan.steps
            .iter()
            .filter(|s| s.step_type == StepType::ToolCall)
            .filter_map(|s| {
                let name = s.tool_name.as_deref()?;
                if self.tools.exists(name) {
                    None
                } else {
                    Some(
                        ConstraintIssue::new(
                            IssueType::Tool,
                            format!("tool '{name}' is not registered"),
                        )
                        .at_step(&s.id),
                    )
                }
            })
            .collect()
    }

    /// First back-edge found by DFS over step id → dependency ids, visiting
    /// steps in plan order. O(V + E).
    fn detect_cycle(plan: &Plan) -> Option<ConstraintIssue> {
        let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
        for step in &plan.steps {
            graph
                .entry(step.id.as_str())
                .or_insert_with(|| step.dependencies.iter().map(String::as_str).collect());
        }

        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for step in &plan.steps {
            let id = step.id.as_str();
            if visited.contains(id) {
                continue;
            }
            if let Some((from, to)) = find_back_edge(id, &graph, &mut visited, &mut rec_stack) {
                return Some(
                    ConstraintIssue::new(
                        IssueType::Cycle,
                        format!("dependency cycle: step '{from}' depends on '{to}' which leads back to it"),
                    )
                    .at_step(from),
                );
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::StaticToolRegistry;
    use crate::domain::models::PlanStep;
    use serde_json::json;

    fn solver(require_registered_tools: bool) -> ConstraintSolver {
        let registry = StaticToolRegistry::from_names(["web_search"]);
        ConstraintSolver::new(
            Arc::new(registry),
            ConstraintSolverConfig {
                require_registered_tools,
            },
        )
    }

    #[test]
    fn test_valid_plan() {
        let plan = Plan::from_steps(
            vec![
                PlanStep::tool_call("t1", "search", "web_search", json!({"q": "x"})),
                PlanStep::respond("r1", "answer").with_dependency("t1"),
            ],
            "search then answer",
        );
        let analysis = solver(true).analyze(&plan);
        assert!(analysis.valid, "{:?}", analysis.issues);
    }

    #[test]
    fn test_empty_plan_is_invalid() {
        let analysis = solver(false).analyze(&Plan::from_steps(vec![], "nothing"));
        assert!(!analysis.valid);
        assert!(analysis.has_issue_type(IssueType::Validation));
    }

    #[test]
    fn test_missing_dependency() {
        let plan = Plan::from_steps(
            vec![PlanStep::respond("r1", "answer").with_dependency("ghost")],
            "answer",
        );
        let analysis = solver(false).analyze(&plan);
        let issue = analysis.issues_of(IssueType::Dependency).next().unwrap();
        assert_eq!(issue.step_id.as_deref(), Some("r1"));
    }

    #[test]
    fn test_mutual_dependency_is_cycle() {
        let plan = Plan::from_steps(
            vec![
                PlanStep::respond("a", "first").with_dependency("b"),
                PlanStep::respond("b", "second").with_dependency("a"),
            ],
            "loop",
        );
        let analysis = solver(false).analyze(&plan);
        assert!(analysis.has_issue_type(IssueType::Cycle));
        assert_eq!(analysis.issues.len(), 1);
        let cycle = analysis.issues_of(IssueType::Cycle).next().unwrap();
        assert_eq!(cycle.step_id.as_deref(), Some("b"));
    }

    fn chain(len: usize) -> Vec<PlanStep> {
        (0..len)
            .map(|i| {
                let step = PlanStep::respond(format!("s{i}"), "link");
                if i == 0 {
                    step
                } else {
                    step.with_dependency(format!("s{}", i - 1))
                }
            })
            .collect()
    }

    #[test]
    fn test_very_long_chain_is_valid() {
        // Deep enough to overflow a default test thread if the search recursed.
        let plan = Plan::from_steps(chain(100_000), "long chain");
        let analysis = solver(false).analyze(&plan);
        assert!(analysis.valid, "issues: {:?}", analysis.issues.first());
    }

    #[test]
    fn test_very_long_chain_closed_into_cycle() {
        let mut steps = chain(100_000);
        steps[0].add_dependency("s99999");
        let plan = Plan::from_steps(steps, "long loop");
        let analysis = solver(false).analyze(&plan);
        let cycle = analysis.issues_of(IssueType::Cycle).next().unwrap();
        assert_eq!(cycle.step_id.as_deref(), Some("s1"));
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let plan = Plan::from_steps(
            vec![PlanStep::respond("a", "me").with_dependency("a")],
            "self",
        );
        assert!(solver(false).analyze(&plan).has_issue_type(IssueType::Cycle));
    }

    #[test]
    fn test_duplicate_ids_reported_once() {
        let plan = Plan::from_steps(
            vec![
                PlanStep::respond("a", "one"),
                PlanStep::respond("a", "two"),
                PlanStep::respond("a", "three"),
            ],
            "dupes",
        );
        let analysis = solver(false).analyze(&plan);
        assert_eq!(analysis.issues_of(IssueType::Structure).count(), 1);
    }

    #[test]
    fn test_unregistered_tool_only_when_required() {
        let plan = Plan::from_steps(
            vec![PlanStep::tool_call("t1", "run", "shell", json!({"cmd": "ls"}))],
            "run",
        );
        assert!(solver(false).analyze(&plan).valid);
        let analysis = solver(true).analyze(&plan);
        assert!(analysis.has_issue_type(IssueType::Tool));
    }

    #[test]
    fn test_issues_accumulate() {
        let plan = Plan::from_steps(
            vec![
                PlanStep::respond("a", "").with_dependency("b"),
                PlanStep::respond("b", "x").with_dependency("a"),
                PlanStep::respond("c", "y").with_dependency("missing"),
                PlanStep::respond("c", "z"),
            ],
            "messy",
        );
        let analysis = solver(false).analyze(&plan);
        assert!(analysis.has_issue_type(IssueType::Validation));
        assert!(analysis.has_issue_type(IssueType::Structure));
        assert!(analysis.has_issue_type(IssueType::Dependency));
        assert!(analysis.has_issue_type(IssueType::Cycle));
    }
}
