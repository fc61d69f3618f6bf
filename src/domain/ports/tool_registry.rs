//! Tool-existence oracle.

use serde::{Deserialize, Serialize};

/// Description of a tool available to plans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolMetadata {
    /// Registered tool name.
    pub name: String,
    /// What the tool does.
    #[serde(default)]
    pub description: String,
    /// Generic verifier kind for results of this tool, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verifier_type: Option<String>,
}

impl ToolMetadata {
    /// Describe a tool with no verifier.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            verifier_type: None,
        }
    }

    /// Set the verifier kind.
    #[must_use]
    pub fn with_verifier_type(mut self, verifier_type: impl Into<String>) -> Self {
        self.verifier_type = Some(verifier_type.into());
        self
    }
}

/// Read-only view of the registered tools.
///
/// Lookups are synchronous so plan analysis stays a pure function.
pub trait ToolRegistry: Send + Sync {
    /// Whether a tool with this exact name is registered.
    fn exists(&self, tool_name: &str) -> bool;

    /// Metadata for every registered tool.
    fn list_metadata(&self) -> Vec<ToolMetadata>;
}
