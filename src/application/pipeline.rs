//! End-to-end handling of one classified user turn.
//!
//! Resolve authority, load locked facts into a planning context, branch and
//! select a plan, then execute it with a single fallback.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::application::backtracking_executor::BacktrackingExecutor;
use crate::application::executor::Executor;
use crate::domain::models::{
    Config, Execution, Intent, Plan, PlanCandidate, ReflectionDelta, RelationshipContext,
};
use crate::domain::ports::{
    AuditSink, MemoryGateway, RelationshipRepository, ToolInvoker, ToolRegistry, UserFactSource,
};
use crate::services::audit_log::AuditLog;
use crate::services::authority_resolver::{
    AuthorityResolver, ExplicitSettings, HistorySignals, ResolveOptions,
};
use crate::services::branching_planner::BranchingPlanner;
use crate::services::constraint_solver::{ConstraintSolver, ConstraintSolverConfig};
use crate::services::planner::{Planner, PlanningContext, ToolHint};
use crate::services::policy_engine::PolicyEngine;
use crate::services::verifiers::VerifierRegistry;

/// One user turn, already classified.
#[derive(Debug, Clone)]
pub struct DecisionRequest {
    /// Requesting user; empty or `anonymous` is never persisted.
    pub user_id: String,
    /// Session the turn belongs to.
    pub session_id: Option<String>,
    /// Classified intent.
    pub intent: Intent,
    /// Relationship settings supplied with the request.
    pub explicit: Option<ExplicitSettings>,
    /// Interaction history for the heuristics layer.
    pub history: Option<HistorySignals>,
    /// Tools the upstream classifier suggests.
    pub tool_hints: Vec<ToolHint>,
    /// Scope for memory access steps.
    pub memory_scope: Option<String>,
}

impl DecisionRequest {
    /// A request with no session, settings, history or hints.
    pub fn new(user_id: impl Into<String>, intent: Intent) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: None,
            intent,
            explicit: None,
            history: None,
            tool_hints: Vec::new(),
            memory_scope: None,
        }
    }

    /// Set the session id.
    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Add a tool hint.
    #[must_use]
    pub fn with_tool_hint(mut self, hint: ToolHint) -> Self {
        self.tool_hints.push(hint);
        self
    }

    /// Supply explicit relationship settings.
    #[must_use]
    pub fn with_explicit(mut self, explicit: ExplicitSettings) -> Self {
        self.explicit = Some(explicit);
        self
    }

    /// Supply interaction history.
    #[must_use]
    pub const fn with_history(mut self, history: HistorySignals) -> Self {
        self.history = Some(history);
        self
    }

    /// Set the memory scope.
    #[must_use]
    pub fn with_memory_scope(mut self, scope: impl Into<String>) -> Self {
        self.memory_scope = Some(scope.into());
        self
    }
}

/// Everything decided and done for one turn.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    /// Resolved relationship context.
    pub relationship: RelationshipContext,
    /// Relationship storage failed and `relationship` is the safe default.
    pub degraded: bool,
    /// The selected plan.
    pub plan: Plan,
    /// Every candidate considered, in generation order.
    pub candidates: Vec<PlanCandidate>,
    /// Execution that produced the response.
    pub execution: Execution,
    /// What backtracking did.
    pub reflection_delta: ReflectionDelta,
}

/// Collaborators the pipeline cannot build itself.
#[derive(Clone)]
pub struct PipelinePorts {
    /// Registered tools.
    pub tool_registry: Arc<dyn ToolRegistry>,
    /// Invokes tools.
    pub tool_invoker: Arc<dyn ToolInvoker>,
    /// Relationship rows.
    pub relationships: Arc<dyn RelationshipRepository>,
    /// User facts.
    pub facts: Arc<dyn UserFactSource>,
    /// Durable audit destination, if any.
    pub audit_sink: Option<Arc<dyn AuditSink>>,
    /// Memory gateway for memory access steps, if any.
    pub memory: Option<Arc<dyn MemoryGateway>>,
}

/// Wires resolver, planners and executors into one call.
pub struct DecisionPipeline {
    resolver: AuthorityResolver,
    facts: Arc<dyn UserFactSource>,
    planner: BranchingPlanner,
    executor: BacktrackingExecutor,
    policy: Arc<PolicyEngine>,
}

impl DecisionPipeline {
    /// Assemble a pipeline from prebuilt components.
    pub fn new(
        resolver: AuthorityResolver,
        facts: Arc<dyn UserFactSource>,
        planner: BranchingPlanner,
        executor: BacktrackingExecutor,
        policy: Arc<PolicyEngine>,
    ) -> Self {
        Self {
            resolver,
            facts,
            planner,
            executor,
            policy,
        }
    }

    /// Build every component from configuration plus injected ports.
    pub fn from_config(config: &Config, ports: PipelinePorts) -> Self {
        let audit_log = AuditLog::new(config.audit.max_entries);
        let mut policy = PolicyEngine::new(config.policy.clone(), audit_log);
        if let Some(sink) = ports.audit_sink {
            policy = policy.with_sink(sink);
        }
        let policy = Arc::new(policy);

        let solver = ConstraintSolver::new(
            ports.tool_registry,
            ConstraintSolverConfig {
                require_registered_tools: config.planner.require_registered_tools,
            },
        );
        let planner = BranchingPlanner::new(Planner::new(), solver, config.planner.max_candidates);

        let mut executor = Executor::new(
            Arc::clone(&policy),
            ports.tool_invoker,
            Arc::new(VerifierRegistry::with_builtins()),
        );
        if let Some(memory) = ports.memory {
            executor = executor.with_memory(memory);
        }
        if let Some(ms) = config.executor.tool_timeout_ms {
            executor = executor.with_tool_timeout(Duration::from_millis(ms));
        }
        let executor =
            BacktrackingExecutor::new(Arc::new(executor), config.executor.fallback_response.as_str());

        let resolver =
            AuthorityResolver::new(ports.relationships, config.authority.heuristics.clone());

        Self::new(resolver, ports.facts, planner, executor, policy)
    }

    /// The shared policy engine.
    pub const fn policy(&self) -> &Arc<PolicyEngine> {
        &self.policy
    }

    /// The authority resolver.
    pub const fn resolver(&self) -> &AuthorityResolver {
        &self.resolver
    }

    /// Handle independent requests concurrently; results keep request order.
    pub async fn handle_all(&self, requests: Vec<DecisionRequest>) -> Vec<DecisionOutcome> {
        join_all(requests.into_iter().map(|request| self.handle(request))).await
    }

    /// Resolve, plan, execute and fall back for one turn. Never fails.
    #[instrument(skip(self, request), fields(user_id = %request.user_id))]
    pub async fn handle(&self, request: DecisionRequest) -> DecisionOutcome {
        let now = Utc::now();

        let facts = match self.facts.list_locked_facts(&request.user_id).await {
            Ok(facts) => facts,
            Err(e) => {
                warn!(error = %e, "locked facts unavailable; planning without them");
                Vec::new()
            }
        };

        let options = ResolveOptions {
            explicit: request.explicit,
            history: request.history,
            now: Some(now),
        };
        let resolution = self
            .resolver
            .resolve_detailed(&request.user_id, &facts, &options)
            .await;

        let mut context =
            PlanningContext::from_facts(&facts, now).with_tool_hints(request.tool_hints);
        context.memory_scope = request.memory_scope;

        let branch = self.planner.generate(&request.intent, Some(&context));
        let outcome = self
            .executor
            .execute(&branch.plan, &request.user_id, request.session_id.as_deref())
            .await;

        info!(
            relationship_type = resolution.context.relationship_type.as_str(),
            degraded = resolution.degraded,
            steps = branch.plan.steps.len(),
            success = outcome.execution.success,
            fallback = outcome.reflection_delta.fallback_plan_applied,
            "decision handled"
        );

        DecisionOutcome {
            relationship: resolution.context,
            degraded: resolution.degraded,
            plan: branch.plan,
            candidates: branch.candidates,
            execution: outcome.execution,
            reflection_delta: outcome.reflection_delta,
        }
    }
}
