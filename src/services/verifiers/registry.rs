//! Typed verifier lookup by tool name or generic kind.

use std::collections::HashMap;
use std::sync::Arc;

use super::{
    DatabaseVerifier, FilesystemVerifier, HttpVerifier, SearchVerifier, ShellVerifier, Verifier,
};
use crate::domain::models::VerificationOutcome;

/// Name reported by the default fallback when no verifier is registered.
pub const STATUS_MIRROR: &str = "status_mirror";

/// Default fallback: mirror the tool's own success flag.
pub fn status_mirror(tool_success: bool, error: Option<&str>) -> VerificationOutcome {
    if tool_success {
        VerificationOutcome::verified(STATUS_MIRROR)
    } else {
        let message = error.unwrap_or("tool reported failure").to_string();
        VerificationOutcome::failed(STATUS_MIRROR, vec![message])
    }
}

/// Tool-name aliases registered by [`VerifierRegistry::with_builtins`].
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("web_search", "search"),
    ("search_web", "search"),
    ("run_command", "shell"),
    ("execute_command", "shell"),
    ("http_request", "http"),
    ("fetch_url", "http"),
    ("sql_query", "database"),
    ("database_query", "database"),
    ("read_file", "filesystem"),
    ("write_file", "filesystem"),
    ("file_exists", "filesystem"),
];

/// Map from key to verifier.
///
/// Tool names and generic kinds share one key space; populate it before
/// sharing the registry behind an `Arc`.
#[derive(Clone, Default)]
pub struct VerifierRegistry {
    verifiers: HashMap<String, Arc<dyn Verifier>>,
}

impl VerifierRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the five generic kinds and common tool aliases.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let generics: [Arc<dyn Verifier>; 5] = [
            Arc::new(SearchVerifier),
            Arc::new(ShellVerifier),
            Arc::new(HttpVerifier),
            Arc::new(DatabaseVerifier),
            Arc::new(FilesystemVerifier),
        ];
        for verifier in generics {
            let key = verifier.name().to_string();
            registry.register(key, verifier);
        }
        for (alias, kind) in BUILTIN_ALIASES {
            if let Some(verifier) = registry.get_generic(kind) {
                registry.register(*alias, verifier);
            }
        }
        registry
    }

    /// Register (or replace) the verifier for a key.
    pub fn register(&mut self, key: impl Into<String>, verifier: Arc<dyn Verifier>) {
        self.verifiers.insert(key.into(), verifier);
    }

    /// Verifier registered for a tool name.
    pub fn get(&self, tool_name: &str) -> Option<Arc<dyn Verifier>> {
        self.verifiers.get(tool_name).cloned()
    }

    /// Verifier registered for a generic kind such as `search` or `http`.
    pub fn get_generic(&self, verifier_type: &str) -> Option<Arc<dyn Verifier>> {
        self.verifiers.get(verifier_type).cloned()
    }

    /// An explicit `verifier_type` wins over the tool-name lookup.
    pub fn resolve(&self, tool_name: &str, verifier_type: Option<&str>) -> Option<Arc<dyn Verifier>> {
        verifier_type
            .and_then(|kind| self.get_generic(kind))
            .or_else(|| self.get(tool_name))
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.verifiers.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty()
    }
}

impl std::fmt::Debug for VerifierRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&str> = self.verifiers.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("VerifierRegistry").field("keys", &keys).finish()
    }
}
