//! Fixed tool registry built at startup.

use std::collections::BTreeMap;

use crate::domain::ports::{ToolMetadata, ToolRegistry};

/// Tool registry backed by a fixed map of metadata.
#[derive(Debug, Clone, Default)]
pub struct StaticToolRegistry {
    tools: BTreeMap<String, ToolMetadata>,
}

impl StaticToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with bare metadata for each name.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(Self::new(), |registry, name| {
            let name = name.into();
            registry.with_tool(ToolMetadata::new(name, ""))
        })
    }

    /// Add a tool.
    #[must_use]
    pub fn with_tool(mut self, metadata: ToolMetadata) -> Self {
        self.register(metadata);
        self
    }

    /// Add or replace a tool.
    pub fn register(&mut self, metadata: ToolMetadata) {
        self.tools.insert(metadata.name.clone(), metadata);
    }

    /// Metadata for a tool.
    pub fn get(&self, tool_name: &str) -> Option<&ToolMetadata> {
        self.tools.get(tool_name)
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether no tools are registered.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolRegistry for StaticToolRegistry {
    fn exists(&self, tool_name: &str) -> bool {
        self.tools.contains_key(tool_name)
    }

    fn list_metadata(&self) -> Vec<ToolMetadata> {
        self.tools.values().cloned().collect()
    }
}
