//! In-memory user-fact store.
//!
//! Enforces the authority invariant on upsert: a fact may only be replaced
//! by one of equal or higher authority, and a locked fact only by another
//! locked fact.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::errors::FactStoreError;
use crate::domain::models::{sort_by_authority, FactAuthority, UserFact};
use crate::domain::ports::UserFactSource;

/// User facts keyed by user and fact key.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFactStore {
    // user id -> fact key -> fact
    facts: Arc<RwLock<HashMap<String, HashMap<String, UserFact>>>>,
}

impl InMemoryFactStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a fact.
    ///
    /// # Errors
    /// Returns `FactStoreError::AuthorityConflict` when an existing fact
    /// outranks the incoming one.
    pub async fn upsert(&self, fact: UserFact) -> Result<UserFact, FactStoreError> {
        let mut facts = self.facts.write().await;
        let user_facts = facts.entry(fact.vi_user_id.clone()).or_default();

        if let Some(existing) = user_facts.get(&fact.fact_key) {
            if existing.authority.outranks(fact.authority) {
                return Err(FactStoreError::AuthorityConflict {
                    user_id: fact.vi_user_id.clone(),
                    fact_key: fact.fact_key.clone(),
                    existing: existing.authority.as_str().to_string(),
                    attempted: fact.authority.as_str().to_string(),
                });
            }
        }

        user_facts.insert(fact.fact_key.clone(), fact.clone());
        Ok(fact)
    }

    /// Remove a fact; returns whether it existed.
    pub async fn remove(&self, user_id: &str, fact_key: &str) -> bool {
        self.facts
            .write()
            .await
            .get_mut(user_id)
            .and_then(|f| f.remove(fact_key))
            .is_some()
    }
}

#[async_trait]
impl UserFactSource for InMemoryFactStore {
    async fn list_locked_facts(&self, user_id: &str) -> Result<Vec<UserFact>, FactStoreError> {
        let facts = self.list_facts_ordered(user_id).await?;
        Ok(facts
            .into_iter()
            .filter(|f| f.authority == FactAuthority::Locked)
            .collect())
    }

    async fn list_facts_ordered(&self, user_id: &str) -> Result<Vec<UserFact>, FactStoreError> {
        let mut facts: Vec<UserFact> = self
            .facts
            .read()
            .await
            .get(user_id)
            .map(|f| f.values().cloned().collect())
            .unwrap_or_default();
        sort_by_authority(&mut facts);
        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_locked_fact_cannot_be_downgraded() {
        let store = InMemoryFactStore::new();
        store
            .upsert(UserFact::locked("u1", "relationship_type", json!({"type": "owner"})))
            .await
            .unwrap();

        let err = store
            .upsert(UserFact::new(
                "u1",
                "relationship_type",
                FactAuthority::Inferred,
                json!({"type": "public"}),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, FactStoreError::AuthorityConflict { .. }));

        let locked = store.list_locked_facts("u1").await.unwrap();
        assert_eq!(locked[0].value_str(), Some("owner"));
    }

    #[tokio::test]
    async fn test_equal_or_higher_authority_replaces() {
        let store = InMemoryFactStore::new();
        store
            .upsert(UserFact::new("u1", "tone", FactAuthority::Inferred, json!("warm")))
            .await
            .unwrap();
        store
            .upsert(UserFact::new("u1", "tone", FactAuthority::Explicit, json!("direct")))
            .await
            .unwrap();
        let facts = store.list_facts_ordered("u1").await.unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].value_str(), Some("direct"));
    }

    #[tokio::test]
    async fn test_ordering() {
        let store = InMemoryFactStore::new();
        store
            .upsert(UserFact::new("u1", "a", FactAuthority::Ephemeral, json!(1)))
            .await
            .unwrap();
        store
            .upsert(UserFact::locked("u1", "never_guess", json!(true)))
            .await
            .unwrap();
        store
            .upsert(UserFact::new("u1", "b", FactAuthority::Explicit, json!(1)))
            .await
            .unwrap();

        let facts = store.list_facts_ordered("u1").await.unwrap();
        let tiers: Vec<_> = facts.iter().map(|f| f.authority).collect();
        assert_eq!(
            tiers,
            vec![FactAuthority::Locked, FactAuthority::Explicit, FactAuthority::Ephemeral]
        );
        assert!(store.remove("u1", "a").await);
        assert!(store.list_facts_ordered("nobody").await.unwrap().is_empty());
    }
}
