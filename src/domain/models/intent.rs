//! Classified user intent, produced upstream of the decision core.

use serde::{Deserialize, Serialize};

/// Category assigned to a user utterance by the upstream classifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    /// A question to answer.
    Query,
    /// An instruction to carry out.
    Command,
    /// Small talk or open conversation.
    Conversation,
    /// A follow-up clarifying an earlier turn.
    Clarification,
    /// Categories introduced upstream that the core does not special-case.
    #[serde(untagged)]
    Other(String),
}

impl IntentCategory {
    /// Snake-case wire name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Query => "query",
            Self::Command => "command",
            Self::Conversation => "conversation",
            Self::Clarification => "clarification",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Parse case-insensitively; unknown names become `Other`.
    pub fn parse_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "query" => Self::Query,
            "command" => Self::Command,
            "conversation" => Self::Conversation,
            "clarification" => Self::Clarification,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Classification of a single user utterance. Read-only inside the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    /// Classified category.
    pub category: IntentCategory,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
    /// The request needs an external tool.
    pub requires_tooling: bool,
    /// The request needs stored conversation memory.
    pub requires_memory: bool,
    /// Free-text description of the request.
    #[serde(default)]
    pub description: String,
}

impl Intent {
    /// Create an intent with full confidence that needs neither tools nor memory.
    pub fn new(category: IntentCategory, description: impl Into<String>) -> Self {
        Self {
            category,
            confidence: 1.0,
            requires_tooling: false,
            requires_memory: false,
            description: description.into(),
        }
    }

    /// Set the confidence, clamped to [0, 1].
    #[must_use]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Set whether tools are required.
    #[must_use]
    pub const fn with_tooling(mut self, requires_tooling: bool) -> Self {
        self.requires_tooling = requires_tooling;
        self
    }

    /// Set whether memory is required.
    #[must_use]
    pub const fn with_memory(mut self, requires_memory: bool) -> Self {
        self.requires_memory = requires_memory;
        self
    }

    /// A query that needs no tools to answer.
    pub fn is_toolless_query(&self) -> bool {
        self.category == IntentCategory::Query && !self.requires_tooling
    }
}
