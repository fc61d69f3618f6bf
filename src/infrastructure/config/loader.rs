//! Layered configuration loading and validation.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::services::branching_planner::MAX_CANDIDATES;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `logging.level` is not a known level.
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// `logging.format` is not a known format.
    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    /// `logging.rotation` is not a known policy.
    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    /// `audit.max_entries` is zero.
    #[error("Invalid audit max_entries: 0. Must be at least 1")]
    ZeroAuditCapacity,

    /// `planner.max_candidates` is outside `1..=3`.
    #[error("Invalid max_candidates: {0}. Must be between 1 and 3")]
    InvalidMaxCandidates(usize),

    /// A blocked tool name is blank.
    #[error("Blocked tool names cannot be empty")]
    EmptyBlockedTool,

    /// `executor.tool_timeout_ms` is zero.
    #[error("Invalid tool_timeout_ms: 0. Omit it to disable the timeout")]
    ZeroToolTimeout,

    /// `authority.heuristics.owner_promotion_threshold` is zero.
    #[error("Invalid owner_promotion_threshold: 0. Must be at least 1")]
    ZeroPromotionThreshold,

    /// Any other validation failure.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .vigil/config.yaml (project config)
    /// 3. .vigil/local.yaml (local overrides, optional)
    /// 4. Environment variables (VIGIL_* prefix, `__` separates nested keys)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".vigil/config.yaml"))
            .merge(Yaml::file(".vigil/local.yaml"))
            .merge(Env::prefixed("VIGIL_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.audit.max_entries == 0 {
            return Err(ConfigError::ZeroAuditCapacity);
        }

        if config.planner.max_candidates == 0 || config.planner.max_candidates > MAX_CANDIDATES {
            return Err(ConfigError::InvalidMaxCandidates(
                config.planner.max_candidates,
            ));
        }

        if config.policy.blocked_tools.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::EmptyBlockedTool);
        }

        if config.executor.tool_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroToolTimeout);
        }

        if config.executor.fallback_response.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "executor fallback_response cannot be empty".to_string(),
            ));
        }

        let heuristics = &config.authority.heuristics;
        if heuristics.owner_promotion_threshold == 0 {
            return Err(ConfigError::ZeroPromotionThreshold);
        }
        if heuristics.trust_per_session_success < 0.0 || heuristics.trust_per_console_owner < 0.0 {
            return Err(ConfigError::ValidationFailed(
                "history heuristics cannot lower trust".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.audit.max_entries, 10_000);
        assert_eq!(config.planner.max_candidates, 3);
        assert!(!config.planner.require_registered_tools);
        assert!(config.policy.record_decisions);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
logging:
  level: debug
  format: pretty
policy:
  blocked_tools: [rm, sudo]
planner:
  max_candidates: 2
  require_registered_tools: true
executor:
  tool_timeout_ms: 2500
authority:
  heuristics:
    enabled: true
    owner_promotion_threshold: 5
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.policy.blocked_tools, vec!["rm", "sudo"]);
        assert!(config.policy.record_decisions);
        assert_eq!(config.planner.max_candidates, 2);
        assert!(config.planner.require_registered_tools);
        assert_eq!(config.executor.tool_timeout_ms, Some(2500));
        assert!(config.authority.heuristics.enabled);
        assert_eq!(config.authority.heuristics.owner_promotion_threshold, 5);
        assert_eq!(config.audit.max_entries, 10_000);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "loud"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidLogFormat(_))
        ));
    }

    #[test]
    fn test_validate_invalid_rotation() {
        let mut config = Config::default();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRotation(_))
        ));
    }

    #[test]
    fn test_validate_zero_audit_capacity() {
        let mut config = Config::default();
        config.audit.max_entries = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ZeroAuditCapacity)
        ));
    }

    #[test]
    fn test_validate_max_candidates_bounds() {
        let mut config = Config::default();
        config.planner.max_candidates = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxCandidates(0))
        ));

        config.planner.max_candidates = 4;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidMaxCandidates(4))
        ));
    }

    #[test]
    fn test_validate_empty_blocked_tool() {
        let mut config = Config::default();
        config.policy.blocked_tools = vec!["rm".to_string(), "  ".to_string()];
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::EmptyBlockedTool)
        ));
    }

    #[test]
    fn test_validate_zero_tool_timeout() {
        let mut config = Config::default();
        config.executor.tool_timeout_ms = Some(0);
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ZeroToolTimeout)
        ));
    }

    #[test]
    fn test_validate_zero_promotion_threshold() {
        let mut config = Config::default();
        config.authority.heuristics.owner_promotion_threshold = 0;
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::ZeroPromotionThreshold)
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "planner:\n  max_candidates: 1\naudit:\n  max_entries: 50").unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.planner.max_candidates, 1);
        assert_eq!(config.audit.max_entries, 50);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_from_file_rejects_invalid() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "planner:\n  max_candidates: 7").unwrap();
        file.flush().unwrap();

        assert!(ConfigLoader::load_from_file(file.path()).is_err());
    }

    #[test]
    fn test_env_override() {
        temp_env::with_vars(
            [
                ("VIGIL_LOGGING__LEVEL", Some("debug")),
                ("VIGIL_AUDIT__MAX_ENTRIES", Some("25")),
            ],
            || {
                let config = ConfigLoader::load().unwrap();
                assert_eq!(config.logging.level, "debug");
                assert_eq!(config.audit.max_entries, 25);
            },
        );
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "planner:\n  max_candidates: 2\nlogging:\n  level: info\n  format: pretty"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "logging:\n  level: warn").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.logging.level, "warn", "Override should win");
        assert_eq!(
            config.logging.format, "pretty",
            "Base value should persist when not overridden"
        );
        assert_eq!(config.planner.max_candidates, 2);
    }
}
