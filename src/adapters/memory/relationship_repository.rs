//! In-memory relationship rows.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::{RepositoryError, RepositoryResult};
use crate::domain::models::{RelationshipPatch, RelationshipRecord};
use crate::domain::ports::RelationshipRepository;

/// Relationship rows keyed by user id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRelationshipRepository {
    rows: Arc<RwLock<HashMap<String, RelationshipRecord>>>,
}

impl InMemoryRelationshipRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row directly, bypassing the resolver.
    pub async fn insert(&self, record: RelationshipRecord) {
        self.rows
            .write()
            .await
            .insert(record.user_id.clone(), record);
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }
}

#[async_trait]
impl RelationshipRepository for InMemoryRelationshipRepository {
    async fn get(&self, user_id: &str) -> RepositoryResult<Option<RelationshipRecord>> {
        Ok(self.rows.read().await.get(user_id).cloned())
    }

    async fn create(&self, record: RelationshipRecord) -> RepositoryResult<RelationshipRecord> {
        self.rows
            .write()
            .await
            .insert(record.user_id.clone(), record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        user_id: &str,
        patch: &RelationshipPatch,
    ) -> RepositoryResult<RelationshipRecord> {
        let mut rows = self.rows.write().await;
        let record = rows
            .get_mut(user_id)
            .ok_or_else(|| RepositoryError::NotFound(user_id.to_string()))?;
        patch.apply_to(record, Utc::now());
        Ok(record.clone())
    }

    async fn delete(&self, user_id: &str) -> RepositoryResult<bool> {
        Ok(self.rows.write().await.remove(user_id).is_some())
    }
}
