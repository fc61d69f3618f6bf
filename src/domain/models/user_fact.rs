//! User facts: authority-tagged key/value knowledge about a user.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Authority tier of a fact. Higher tiers cannot be overwritten by lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactAuthority {
    /// Set by the owner; overrides everything below it.
    Locked,
    /// Stated directly by the user.
    Explicit,
    /// Derived from behavior.
    Inferred,
    /// Valid for the current session only.
    Ephemeral,
}

impl FactAuthority {
    /// Priority rank; 0 is the highest authority.
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Locked => 0,
            Self::Explicit => 1,
            Self::Inferred => 2,
            Self::Ephemeral => 3,
        }
    }

    /// Whether this tier is strictly higher than `other`.
    pub const fn outranks(&self, other: Self) -> bool {
        self.rank() < other.rank()
    }

    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Explicit => "explicit",
            Self::Inferred => "inferred",
            Self::Ephemeral => "ephemeral",
        }
    }
}

/// A fact about a user, created upstream and read-only in the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFact {
    /// Unique fact id.
    pub fact_id: Uuid,
    /// User the fact is about.
    pub vi_user_id: String,
    /// Key such as `relationship_type` or `never_guess`.
    pub fact_key: String,
    /// Kind of fact, `preference` by default.
    pub fact_type: String,
    /// Authority tier.
    pub authority: FactAuthority,
    /// Scope the fact applies in, `global` by default.
    pub scope: String,
    /// Fact value.
    pub value: Value,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Where the fact came from.
    pub source: String,
    /// When the fact was created.
    pub created_at: DateTime<Utc>,
    /// When the fact last changed.
    pub updated_at: DateTime<Utc>,
    /// Expiry; `None` never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserFact {
    /// Create a global preference fact stamped now.
    pub fn new(
        user_id: impl Into<String>,
        fact_key: impl Into<String>,
        authority: FactAuthority,
        value: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            fact_id: Uuid::new_v4(),
            vi_user_id: user_id.into(),
            fact_key: fact_key.into(),
            fact_type: "preference".to_string(),
            authority,
            scope: "global".to_string(),
            value,
            confidence: 1.0,
            source: "user".to_string(),
            created_at: now,
            updated_at: now,
            expires_at: None,
        }
    }

    /// Create a locked fact.
    pub fn locked(user_id: impl Into<String>, fact_key: impl Into<String>, value: Value) -> Self {
        Self::new(user_id, fact_key, FactAuthority::Locked, value)
    }

    /// Set the fact type.
    #[must_use]
    pub fn with_fact_type(mut self, fact_type: impl Into<String>) -> Self {
        self.fact_type = fact_type.into();
        self
    }

    /// Set the expiry.
    #[must_use]
    pub const fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Override the update time.
    #[must_use]
    pub const fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    /// Whether the authority is `Locked`.
    pub fn is_locked(&self) -> bool {
        self.authority == FactAuthority::Locked
    }

    /// Whether the fact has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Fact is locked and still in force at `now`.
    pub fn is_active_lock(&self, now: DateTime<Utc>) -> bool {
        self.is_locked() && !self.is_expired(now)
    }

    /// Read the value as a string, accepting either `"x"` or `{"type": "x"}`
    /// / `{"value": "x"}` shapes.
    pub fn value_str(&self) -> Option<&str> {
        match &self.value {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map
                .get("type")
                .or_else(|| map.get("value"))
                .and_then(Value::as_str),
            _ => None,
        }
    }
}

/// Order facts locked → explicit → inferred → ephemeral, newest first within a tier.
pub fn sort_by_authority(facts: &mut [UserFact]) {
    facts.sort_by(|a, b| {
        a.authority
            .rank()
            .cmp(&b.authority.rank())
            .then_with(|| b.updated_at.cmp(&a.updated_at))
    });
}
