//! Persistence of relationship rows.

use async_trait::async_trait;

use crate::domain::errors::RepositoryResult;
use crate::domain::models::{RelationshipPatch, RelationshipRecord};

/// Persistence for per-user relationship rows.
#[async_trait]
pub trait RelationshipRepository: Send + Sync {
    /// Fetch the row for a user, `None` when the user has never been seen.
    async fn get(&self, user_id: &str) -> RepositoryResult<Option<RelationshipRecord>>;

    /// Insert a new row. Replaces any existing row for the same user.
    async fn create(&self, record: RelationshipRecord) -> RepositoryResult<RelationshipRecord>;

    /// Apply a patch to an existing row and return the updated row.
    ///
    /// # Errors
    /// Returns `RepositoryError::NotFound` when no row exists.
    async fn update(
        &self,
        user_id: &str,
        patch: &RelationshipPatch,
    ) -> RepositoryResult<RelationshipRecord>;

    /// Delete the row; returns whether one existed.
    async fn delete(&self, user_id: &str) -> RepositoryResult<bool>;
}
