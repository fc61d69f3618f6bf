//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces collaborators outside the core must implement:
//! - ToolRegistry: tool existence and metadata
//! - ToolInvoker: tool invocation
//! - RelationshipRepository: persisted relationship rows
//! - UserFactSource: authority-tagged user facts
//! - AuditSink: durable authorization records
//! - MemoryGateway: memory access steps
//! - PlanExecutor: execution strategies
//!
//! These traits keep the decision core independent of storage, transport
//! and tool implementations.

pub mod audit_sink;
pub mod memory_gateway;
pub mod plan_executor;
pub mod relationship_repository;
pub mod tool_invoker;
pub mod tool_registry;
pub mod user_fact_source;

pub use audit_sink::AuditSink;
pub use memory_gateway::MemoryGateway;
pub use plan_executor::PlanExecutor;
pub use relationship_repository::RelationshipRepository;
pub use tool_invoker::{ToolExecutionContext, ToolInvoker, ToolOutput};
pub use tool_registry::{ToolMetadata, ToolRegistry};
pub use user_fact_source::UserFactSource;
