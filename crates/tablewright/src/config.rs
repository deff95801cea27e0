//! Engine configuration

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::logging::LoggingConfig;
use crate::result::{EngineError, EngineResult};
use crate::retry::RetryPolicy;
use crate::wait::WaitOptions;

/// Default navigation timeout (30 seconds)
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Default timeout for a single driver call (10 seconds)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 10_000;

/// Timing and retry behaviour shared by every page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Retry policy for intercepted interactions
    pub retry: RetryPolicy,
    /// Readiness waits (selector waits, settle waits)
    pub wait: WaitOptions,
    /// Deadline for navigation
    pub navigation_timeout_ms: u64,
    /// Deadline for any single driver call
    pub action_timeout_ms: u64,
    /// Log output
    pub logging: LoggingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            wait: WaitOptions::default(),
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            logging: LoggingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Create config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry policy
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set wait options
    #[must_use]
    pub const fn with_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn with_navigation_timeout(mut self, timeout_ms: u64) -> Self {
        self.navigation_timeout_ms = timeout_ms;
        self
    }

    /// Set per-action timeout
    #[must_use]
    pub const fn with_action_timeout(mut self, timeout_ms: u64) -> Self {
        self.action_timeout_ms = timeout_ms;
        self
    }

    /// Navigation timeout as Duration
    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Action timeout as Duration
    #[must_use]
    pub const fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    /// Parse YAML
    pub fn from_yaml_str(yaml: &str) -> EngineResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file (`.json` as JSON, anything else as YAML)
    pub fn from_path(path: impl AsRef<Path>) -> EngineResult<Self> {
        let config: Self = load_document(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would stall or never retry
    pub fn validate(&self) -> EngineResult<()> {
        if self.retry.max_attempts == 0 {
            return Err(EngineError::Config {
                message: "retry.max_attempts must be at least 1".to_string(),
            });
        }
        if self.wait.poll_interval_ms == 0 {
            return Err(EngineError::Config {
                message: "wait.poll_interval_ms must be positive".to_string(),
            });
        }
        if self.action_timeout_ms == 0 || self.navigation_timeout_ms == 0 {
            return Err(EngineError::Config {
                message: "timeouts must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Read and deserialize a YAML or JSON file
pub(crate) fn load_document<T: DeserializeOwned>(path: &Path) -> EngineResult<T> {
    let text = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        Ok(serde_json::from_str(&text)?)
    } else {
        Ok(serde_yaml_ng::from_str(&text)?)
    }
}
