//! Domain errors for the Vigil decision core.
//!
//! Expected conditions (denials, invalid plans, failed verification) are
//! typed results, not errors. These types cover collaborator failures.

use thiserror::Error;

/// Errors raised by relationship repositories.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backing store could not be reached.
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    /// No row exists for the user.
    #[error("Relationship row not found for user: {0}")]
    NotFound(String),

    /// A row could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Errors raised by user-fact stores.
#[derive(Debug, Error)]
pub enum FactStoreError {
    /// A fact would overwrite one held at higher authority.
    #[error("Fact '{fact_key}' for user {user_id} is held at {existing} authority and cannot be overwritten by a {attempted} fact")]
    AuthorityConflict {
        /// User the fact belongs to.
        user_id: String,
        /// Key of the conflicting fact.
        fact_key: String,
        /// Authority of the stored fact.
        existing: String,
        /// Authority of the rejected write.
        attempted: String,
    },

    /// The backing store could not be reached.
    #[error("Fact store unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
