//! Domain layer for the Vigil decision core
//!
//! This module contains the core models, the collaborator ports and the
//! domain error types.

pub mod errors;
pub mod models;
pub mod ports;

// Re-export error types for convenient access
pub use errors::{FactStoreError, RepositoryError, RepositoryResult};
