//! In-memory implementations of the collaborator ports.
//!
//! Suitable for embedding the core without external storage and for tests.
//! State lives behind `tokio::sync::RwLock` so adapters can be shared via `Arc`.

pub mod audit_sink;
pub mod fact_store;
pub mod relationship_repository;
pub mod tool_registry;

pub use audit_sink::InMemoryAuditSink;
pub use fact_store::InMemoryFactStore;
pub use relationship_repository::InMemoryRelationshipRepository;
pub use tool_registry::StaticToolRegistry;
