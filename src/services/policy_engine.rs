//! Action authorization and decision auditing.
//!
//! Rules:
//! - `command_execution` is denied for an empty or anonymous user.
//! - `tool:<name>` is denied iff `<name>` is on the blocklist (exact match).
//! - Any other action string is allowed. Unclassified actions fail open.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::models::{AuditRecord, Decision, PolicyConfig};
use crate::domain::ports::AuditSink;
use crate::services::audit_log::AuditLog;

/// Action string prefix for tool authorization.
pub const TOOL_ACTION_PREFIX: &str = "tool:";
/// Action authorized by `policy_check` steps.
pub const COMMAND_EXECUTION: &str = "command_execution";

/// Parsed form of an action string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PolicyAction {
    /// `command_execution`.
    CommandExecution,
    /// `tool:<name>`.
    Tool(String),
    /// Anything else; allowed.
    Unclassified(String),
}

impl PolicyAction {
    /// Classify an action string.
    pub fn parse(action: &str) -> Self {
        if action == COMMAND_EXECUTION {
            Self::CommandExecution
        } else if let Some(name) = action.strip_prefix(TOOL_ACTION_PREFIX) {
            Self::Tool(name.to_string())
        } else {
            Self::Unclassified(action.to_string())
        }
    }

    /// Action string for invoking a tool.
    pub fn tool(name: &str) -> String {
        format!("{TOOL_ACTION_PREFIX}{name}")
    }
}

/// Result of evaluating one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyVerdict {
    /// Allow or deny.
    pub decision: Decision,
    /// Why.
    pub reason: String,
}

impl PolicyVerdict {
    fn allow(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Allow,
            reason: reason.into(),
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            decision: Decision::Deny,
            reason: reason.into(),
        }
    }

    /// Whether the decision is `Allow`.
    pub fn is_allowed(&self) -> bool {
        self.decision == Decision::Allow
    }
}

/// Context passed to [`PolicyEngine::check`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolicyContext {
    /// User the check is for.
    pub user_id: String,
    /// Action being checked.
    #[serde(default)]
    pub action: Option<String>,
    /// Extra caller data; not interpreted.
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// A policy violation found by [`PolicyEngine::check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyViolation {
    /// Rule that was violated.
    pub rule: String,
    /// Human-readable description.
    pub message: String,
}

/// Whether a user id carries no identity.
pub fn is_anonymous(user_id: &str) -> bool {
    let trimmed = user_id.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("anonymous")
}

/// Authorizes actions and records decisions.
pub struct PolicyEngine {
    config: PolicyConfig,
    blocked_tools: HashSet<String>,
    audit_log: AuditLog,
    sink: Option<Arc<dyn AuditSink>>,
}

impl PolicyEngine {
    /// Create an engine from config, recording into `audit_log`.
    pub fn new(config: PolicyConfig, audit_log: AuditLog) -> Self {
        let blocked_tools = config.blocked_tools.iter().cloned().collect();
        Self {
            config,
            blocked_tools,
            audit_log,
            sink: None,
        }
    }

    /// Create an engine with default configuration and audit capacity.
    pub fn with_defaults() -> Self {
        Self::new(PolicyConfig::default(), AuditLog::with_defaults())
    }

    /// Forward every recorded decision to a durable sink as well.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Evaluate an action for a user, with the reason for the decision.
    pub fn evaluate(&self, action: &str, user_id: &str) -> PolicyVerdict {
        match PolicyAction::parse(action) {
            PolicyAction::CommandExecution => {
                if is_anonymous(user_id) {
                    PolicyVerdict::deny("command execution requires an identified user")
                } else {
                    PolicyVerdict::allow("identified user")
                }
            }
            PolicyAction::Tool(name) => {
                if self.blocked_tools.contains(&name) {
                    PolicyVerdict::deny(format!("tool '{name}' is blocked"))
                } else {
                    PolicyVerdict::allow(format!("tool '{name}' is not blocked"))
                }
            }
            PolicyAction::Unclassified(raw) => {
                debug!(action = %raw, "unclassified action allowed by default");
                PolicyVerdict::allow("unclassified action")
            }
        }
    }

    /// Whether `user_id` may perform `action`.
    pub fn authorize(&self, action: &str, user_id: &str) -> bool {
        let verdict = self.evaluate(action, user_id);
        debug!(
            action = action,
            user_id = user_id,
            decision = verdict.decision.as_str(),
            reason = %verdict.reason,
            "authorization evaluated"
        );
        verdict.is_allowed()
    }

    /// Context-level policy check. No context rules exist yet, so this is always empty.
    pub fn check(&self, _context: &PolicyContext) -> Vec<PolicyViolation> {
        Vec::new()
    }

    /// Record a decision. Never fails: sink errors are logged and dropped.
    pub async fn record_decision(
        &self,
        policy: &str,
        user_id: &str,
        decision: Decision,
        reason: &str,
    ) {
        if !self.config.record_decisions {
            return;
        }

        let record = AuditRecord::new(policy, user_id, decision, reason);

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.record(&record).await {
                warn!(policy = policy, error = %e, "audit sink rejected decision record");
            }
        }

        self.audit_log.append(record).await;
    }

    /// Snapshot of recorded decisions, oldest first.
    pub async fn get_audit_log(&self) -> Vec<AuditRecord> {
        self.audit_log.snapshot().await
    }

    /// Drop every recorded decision.
    pub async fn clear_audit_log(&self) {
        self.audit_log.clear().await;
    }

    /// The in-memory audit log.
    pub const fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    /// Tools denied by configuration.
    pub fn blocked_tools(&self) -> impl Iterator<Item = &str> {
        self.blocked_tools.iter().map(String::as_str)
    }
}
