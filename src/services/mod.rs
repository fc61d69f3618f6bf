//! Decision-core services: planning, validation, policy, verification and
//! authority resolution.

pub mod audit_log;
pub mod authority_resolver;
pub mod branching_planner;
pub mod constraint_solver;
pub mod planner;
pub mod policy_engine;
pub mod verifiers;

pub use audit_log::{AuditFilter, AuditLog, AuditStats, DEFAULT_AUDIT_CAPACITY};
pub use authority_resolver::{
    AuthorityResolver, ExplicitSettings, HistorySignals, Resolution, ResolveOptions,
};
pub use branching_planner::{BranchOutcome, BranchingPlanner};
pub use constraint_solver::{ConstraintSolver, ConstraintSolverConfig};
pub use planner::{FactPolicy, Planner, PlanningContext, ToolHint};
pub use policy_engine::{PolicyAction, PolicyContext, PolicyEngine, PolicyVerdict, PolicyViolation};
pub use verifiers::{Verifier, VerifierRegistry, VerifierReport};
