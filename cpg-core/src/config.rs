// cpg-core/src/config.rs
// ============================================================================
// Module: Orchestrator Configuration
// Description: Strict, fail-closed TOML configuration loading for the
//              orchestration core.
// Purpose: Drive event queue sizing, evaluation cadence, governance switches,
//          and trace retention from a single validated source.
// Dependencies: serde, toml, thiserror
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with a hard size ceiling and an
//! explicit [`OrchestratorConfig::validate`] pass; missing or malformed
//! configuration fails closed rather than falling back to silent defaults
//! for anything safety-relevant.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::HashAlgorithm;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "cpg-orchestrator.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "CPG_ORCHESTRATOR_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum total path length accepted for the config path.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Governance switches (C11), each independently toggleable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Whether the idempotency check is enforced.
    pub idempotency_enabled: bool,
    /// Whether the authorization check is enforced.
    pub authorization_enabled: bool,
    /// Whether the final policy-gate re-check is enforced.
    pub policy_gate_enabled: bool,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            idempotency_enabled: true,
            authorization_enabled: true,
            policy_gate_enabled: true,
        }
    }
}

/// Decision trace (C12) persistence and retention settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Whether the Decision Tracer records anything at all.
    pub enabled: bool,
    /// Whether traces are persisted via `DecisionTraceRepository` (as
    /// opposed to kept only for the current cycle).
    pub persist: bool,
    /// Days a persisted trace is retained before `delete_older_than` may
    /// prune it. Ignored when `persist` is `false`.
    pub retention_days: u32,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            persist: true,
            retention_days: 90,
        }
    }
}

/// Top-level orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Bounded capacity of the Process Orchestrator's (C14) event queue.
    pub event_queue_capacity: usize,
    /// Interval, in milliseconds, between periodic reevaluation ticks.
    pub evaluation_interval_ms: u64,
    /// Governance switches.
    pub governance: GovernanceConfig,
    /// Tracing switches.
    pub tracing: TracingConfig,
    /// Hash algorithm used for idempotency keys and content/graph hashes.
    pub hash_algorithm: HashAlgorithm,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            event_queue_capacity: 1024,
            evaluation_interval_ms: 1000,
            governance: GovernanceConfig::default(),
            tracing: TracingConfig::default(),
            hash_algorithm: HashAlgorithm::Sha256,
        }
    }
}

impl OrchestratorConfig {
    /// Loads configuration from `path`, or `CPG_ORCHESTRATOR_CONFIG`, or
    /// `cpg-orchestrator.toml` in the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on any I/O, size, parse, or validation
    /// failure. Never falls back to defaults on a missing or unreadable
    /// file.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency, failing closed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when any field is out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_queue_capacity == 0 {
            return Err(ConfigError::Invalid("event_queue_capacity must be nonzero".to_string()));
        }
        if self.evaluation_interval_ms == 0 {
            return Err(ConfigError::Invalid("evaluation_interval_ms must be nonzero".to_string()));
        }
        if self.tracing.persist && self.tracing.retention_days == 0 {
            return Err(ConfigError::Invalid(
                "tracing.retention_days must be nonzero when tracing.persist is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while loading or validating [`OrchestratorConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the explicit argument, the environment
/// override, or the default filename, in that order.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(OrchestratorConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        let mut config = OrchestratorConfig::default();
        config.event_queue_capacity = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn persisted_tracing_requires_nonzero_retention() {
        let mut config = OrchestratorConfig::default();
        config.tracing.persist = true;
        config.tracing.retention_days = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn toml_round_trip_parses_partial_overrides() {
        let toml_text = r#"
            event_queue_capacity = 256

            [governance]
            policy_gate_enabled = false
        "#;
        let config: OrchestratorConfig = toml::from_str(toml_text).expect("toml should parse");
        assert_eq!(config.event_queue_capacity, 256);
        assert!(!config.governance.policy_gate_enabled);
        assert!(config.governance.idempotency_enabled);
    }
}
