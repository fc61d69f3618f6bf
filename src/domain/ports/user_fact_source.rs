//! Source of user facts for planning and authority resolution.

use async_trait::async_trait;

use crate::domain::errors::FactStoreError;
use crate::domain::models::UserFact;

/// Read access to a user's facts.
#[async_trait]
pub trait UserFactSource: Send + Sync {
    /// Facts with `authority = locked` for the user.
    async fn list_locked_facts(&self, user_id: &str) -> Result<Vec<UserFact>, FactStoreError>;

    /// All facts ordered locked → explicit → inferred → ephemeral, then newest first.
    async fn list_facts_ordered(&self, user_id: &str) -> Result<Vec<UserFact>, FactStoreError>;
}
