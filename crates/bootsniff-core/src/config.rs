//! Sniff session configuration.
//!
//! All values have defaults so an empty `sniff:` section is valid. The
//! attempt threshold and watermark are explicit parameters of every session
//! rather than process-wide constants.

use bootsniff_proto::PatternSet;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors from validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Retry budget, watermark and timing for the sniff loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SniffConfig {
    /// Soft errors tolerated before the session fails.
    pub threshold_attempts: u32,

    /// Quiet rounds that must be exceeded before the boot is considered settled.
    pub good_watermark: u32,

    /// Per-round classifier timeout.
    pub round_timeout_secs: u64,

    /// How long to wait for the machine to confirm standby after power off.
    pub standby_timeout_secs: u64,

    pub monitor: MonitorConfig,
}

impl Default for SniffConfig {
    fn default() -> Self {
        Self {
            threshold_attempts: 3,
            good_watermark: 15,
            round_timeout_secs: 30,
            standby_timeout_secs: 120,
            monitor: MonitorConfig::default(),
        }
    }
}

impl SniffConfig {
    pub fn round_timeout(&self) -> Duration {
        Duration::from_secs(self.round_timeout_secs)
    }

    pub fn standby_timeout(&self) -> Duration {
        Duration::from_secs(self.standby_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold_attempts == 0 {
            return Err(ConfigError::Invalid(
                "sniff.threshold_attempts must be at least 1".to_string(),
            ));
        }
        if self.round_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "sniff.round_timeout_secs must be at least 1".to_string(),
            ));
        }
        self.monitor.validate()
    }
}

/// Scripted interaction with the kernel debug monitor (xmon).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Pause after entering the monitor before the first command.
    pub entry_delay_ms: u64,

    /// How long each step waits for the monitor prompt to come back.
    pub prompt_timeout_secs: u64,

    /// Prompt printed by the monitor when it is ready for a command.
    pub prompt: String,

    pub steps: Vec<MonitorStep>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            entry_delay_ms: 2000,
            prompt_timeout_secs: 10,
            prompt: ".*mon> ".to_string(),
            steps: vec![
                MonitorStep::new("backtrace", "t", 3000),
                MonitorStep::new("registers", "r", 3000),
                MonitorStep::new("special_registers", "S", 5000),
                MonitorStep::new("exception_registers", "e", 5000),
            ],
        }
    }
}

impl MonitorConfig {
    pub fn entry_delay(&self) -> Duration {
        Duration::from_millis(self.entry_delay_ms)
    }

    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }

    /// Compiles the monitor prompt into a single-pattern set.
    pub fn prompt_set(&self) -> Result<PatternSet, ConfigError> {
        PatternSet::new([self.prompt.as_str()]).map_err(|source| ConfigError::Pattern {
            pattern: self.prompt.clone(),
            source,
        })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.steps.is_empty() {
            return Err(ConfigError::Invalid(
                "sniff.monitor.steps must not be empty".to_string(),
            ));
        }
        self.prompt_set().map(|_| ())
    }
}

/// One command sent to the debug monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorStep {
    /// Label used in the failure message (e.g. `backtrace`).
    pub name: String,
    /// Command line sent to the monitor.
    pub command: String,
    /// Pause between sending the command and waiting for the prompt.
    #[serde(default)]
    pub settle_ms: u64,
}

impl MonitorStep {
    pub fn new(name: impl Into<String>, command: impl Into<String>, settle_ms: u64) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            settle_ms,
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}
