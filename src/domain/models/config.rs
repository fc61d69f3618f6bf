//! Configuration model with per-field defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure for Vigil
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Action authorization configuration
    #[serde(default)]
    pub policy: PolicyConfig,

    /// In-memory audit log configuration
    #[serde(default)]
    pub audit: AuditConfig,

    /// Plan generation and candidate selection
    #[serde(default)]
    pub planner: PlannerConfig,

    /// Plan execution
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Behavioral-authority resolution
    #[serde(default)]
    pub authority: AuthorityConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Rotation for file output: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// Action authorization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PolicyConfig {
    /// Tool names denied for every user (exact match)
    #[serde(default)]
    pub blocked_tools: Vec<String>,

    /// Whether decisions are written to the audit log
    #[serde(default = "default_true")]
    pub record_decisions: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            blocked_tools: Vec::new(),
            record_decisions: default_true(),
        }
    }
}

/// Audit log configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditConfig {
    /// Maximum records kept in memory; oldest are evicted first
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

const fn default_max_entries() -> usize {
    10_000
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

/// Planner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PlannerConfig {
    /// Number of candidates the branching planner generates (1-3)
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Reject tool_call steps whose tool is not registered
    #[serde(default)]
    pub require_registered_tools: bool,
}

const fn default_max_candidates() -> usize {
    3
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_candidates: default_max_candidates(),
            require_registered_tools: false,
        }
    }
}

/// Executor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExecutorConfig {
    /// Per tool call timeout in milliseconds; no timeout when unset
    #[serde(default)]
    pub tool_timeout_ms: Option<u64>,

    /// Text used by the respond-only fallback plan
    #[serde(default = "default_fallback_response")]
    pub fallback_response: String,
}

fn default_fallback_response() -> String {
    "I couldn't complete that request, so here is what I can safely tell you without acting on it."
        .to_string()
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            tool_timeout_ms: None,
            fallback_response: default_fallback_response(),
        }
    }
}

/// Authority resolution configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuthorityConfig {
    /// History heuristics applied on top of the persisted row
    #[serde(default)]
    pub heuristics: HeuristicsConfig,
}

/// History heuristics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HeuristicsConfig {
    /// Heuristics only run when enabled and history is supplied
    #[serde(default)]
    pub enabled: bool,

    /// Trust added per successful session signal
    #[serde(default = "default_trust_per_session_success")]
    pub trust_per_session_success: f64,

    /// Trust added per console-owner signal
    #[serde(default = "default_trust_per_console_owner")]
    pub trust_per_console_owner: f64,

    /// Console-owner signals needed before promotion to owner
    #[serde(default = "default_owner_promotion_threshold")]
    pub owner_promotion_threshold: u32,
}

const fn default_trust_per_session_success() -> f64 {
    2.0
}

const fn default_trust_per_console_owner() -> f64 {
    10.0
}

const fn default_owner_promotion_threshold() -> u32 {
    3
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            trust_per_session_success: default_trust_per_session_success(),
            trust_per_console_owner: default_trust_per_console_owner(),
            owner_promotion_threshold: default_owner_promotion_threshold(),
        }
    }
}
