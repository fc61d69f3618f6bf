//! Vigil - decision core for an autonomous agent
//!
//! Vigil turns a classified user intent into a plan, validates and ranks
//! candidate plans, executes the chosen plan with per-step authorization and
//! result verification, and resolves how much behavioral authority the
//! current user holds.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, port traits and errors
//! - **Service Layer** (`services`): planning, constraint solving, policy,
//!   verification and authority resolution
//! - **Application Layer** (`application`): executors and the decision pipeline
//! - **Adapters** (`adapters`): in-memory implementations of the ports
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vigil::adapters::memory::{
//!     InMemoryFactStore, InMemoryRelationshipRepository, StaticToolRegistry,
//! };
//! use vigil::application::{DecisionPipeline, DecisionRequest, PipelinePorts};
//! use vigil::domain::models::{Intent, IntentCategory};
//!
//! let pipeline = DecisionPipeline::from_config(&vigil::ConfigLoader::load()?, PipelinePorts {
//!     tool_registry: Arc::new(StaticToolRegistry::from_names(["web_search"])),
//!     tool_invoker: my_invoker,
//!     relationships: Arc::new(InMemoryRelationshipRepository::new()),
//!     facts: Arc::new(InMemoryFactStore::new()),
//!     audit_sink: None,
//!     memory: None,
//! });
//! let outcome = pipeline
//!     .handle(DecisionRequest::new("user-1", Intent::new(IntentCategory::Query, "hi")))
//!     .await;
//! ```

pub mod adapters;
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{
    BacktrackOutcome, BacktrackingExecutor, DecisionOutcome, DecisionPipeline, DecisionRequest,
    Executor, PipelinePorts,
};
pub use domain::errors::{FactStoreError, RepositoryError};
pub use domain::models::{
    Config, Execution, Intent, IntentCategory, Plan, PlanCandidate, PlanStep,
    RelationshipContext, UserFact,
};
pub use domain::ports::{
    AuditSink, MemoryGateway, PlanExecutor, RelationshipRepository, ToolInvoker, ToolRegistry,
    UserFactSource,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::logging::{LogConfig, Logger};
pub use services::{
    AuthorityResolver, BranchingPlanner, ConstraintSolver, Planner, PlanningContext,
    PolicyEngine, VerifierRegistry,
};
