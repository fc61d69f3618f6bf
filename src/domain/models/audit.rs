//! Authorization audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of an authorization decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    /// The action may proceed.
    Allow,
    /// The action is refused.
    Deny,
}

impl Decision {
    /// Lowercase wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
        }
    }

    /// `Allow` when `allowed`, otherwise `Deny`.
    pub const fn from_allowed(allowed: bool) -> Self {
        if allowed {
            Self::Allow
        } else {
            Self::Deny
        }
    }

    /// Severity attached to a record of this decision.
    pub const fn severity(&self) -> AuditSeverity {
        match self {
            Self::Allow => AuditSeverity::Info,
            Self::Deny => AuditSeverity::Block,
        }
    }
}

/// Severity of an audit record, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    /// Routine allowed decision.
    Info,
    /// Allowed, but worth attention.
    Warning,
    /// The action was denied.
    Block,
}

/// One recorded authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record id.
    pub id: Uuid,
    /// When the decision was made.
    pub timestamp: DateTime<Utc>,
    /// Policy or action the decision was made under, e.g. `tool:web_search`.
    pub policy: String,
    /// User the decision applies to.
    pub user_id: String,
    /// Allow or deny.
    pub decision: Decision,
    /// Human-readable reason for the decision.
    pub reason: String,
    /// Derived from the decision.
    pub severity: AuditSeverity,
}

impl AuditRecord {
    /// Create a record stamped now, with severity derived from `decision`.
    pub fn new(
        policy: impl Into<String>,
        user_id: impl Into<String>,
        decision: Decision,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            policy: policy.into(),
            user_id: user_id.into(),
            decision,
            reason: reason.into(),
            severity: decision.severity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deny_records_are_block_severity() {
        let record = AuditRecord::new("tool:rm", "u1", Decision::Deny, "blocked tool");
        assert_eq!(record.severity, AuditSeverity::Block);
        let record = AuditRecord::new("tool:ls", "u1", Decision::Allow, "ok");
        assert_eq!(record.severity, AuditSeverity::Info);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(AuditSeverity::Info < AuditSeverity::Warning);
        assert!(AuditSeverity::Warning < AuditSeverity::Block);
    }
}
