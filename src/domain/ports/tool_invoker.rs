//! Tool-invocation oracle.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller identity passed along with every tool invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolExecutionContext {
    /// User the call is made for.
    pub user_id: String,
    /// Session the call belongs to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// When the call was issued.
    pub timestamp: DateTime<Utc>,
}

/// What a tool reported back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the tool reports success.
    pub success: bool,
    /// Returned data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error reported by the tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Tool-specific status string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Sources backing the data.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Value>,
}

impl ToolOutput {
    /// A successful output carrying `data`.
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            ..Default::default()
        }
    }

    /// A failed output carrying `error`.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Attach citations.
    #[must_use]
    pub fn with_citations(mut self, citations: Vec<Value>) -> Self {
        self.citations = citations;
        self
    }
}

/// Invokes tools on behalf of the executor.
///
/// Returning `Err` means the invocation itself blew up (transport failure,
/// panic-equivalent); a tool that ran and reported failure returns
/// `Ok(ToolOutput { success: false, .. })`.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Invoke `tool_name` with `params`.
    async fn execute(
        &self,
        tool_name: &str,
        params: &Value,
        context: &ToolExecutionContext,
    ) -> Result<ToolOutput>;
}
