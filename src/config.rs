//! Runtime Settings
//!
//! Settings are read from a YAML file. Every field has a default, so a
//! partial file (or no file at all) yields a usable configuration.
//!
//! # Example YAML Format
//!
//! ```yaml
//! engine:
//!   default_timeout_secs: 300
//!   backoff_base: 2.0
//!   backoff_unit_ms: 1000
//!   max_backoff_ms: 60000
//!   continue_on_failure: false
//!   strict_placeholders: false
//! reconcile:
//!   max_rounds: 2
//!   auto_correct: true
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level settings.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineSettings,
    pub reconcile: ReconcileSettings,
}

/// Execution engine settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Timeout applied to tasks that declare none
    pub default_timeout_secs: u64,
    /// Base of the exponential retry delay (`base^attempts`)
    pub backoff_base: f64,
    /// Length of one backoff unit in milliseconds
    pub backoff_unit_ms: u64,
    /// Upper bound on a single retry delay in milliseconds
    pub max_backoff_ms: u64,
    /// Keep walking the task list after a task's terminal failure
    pub continue_on_failure: bool,
    /// Fail a task when a placeholder cannot be resolved
    pub strict_placeholders: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_timeout_secs: 600,
            backoff_base: 2.0,
            backoff_unit_ms: 1000,
            max_backoff_ms: 60_000,
            continue_on_failure: false,
            strict_placeholders: false,
        }
    }
}

impl EngineSettings {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }

    /// Delay before the next attempt, given the attempts made so far.
    ///
    /// Capped at `max_backoff_ms`; a base that overflows yields the cap.
    pub fn backoff_delay(&self, base: f64, attempts: u32) -> Duration {
        let exponent = i32::try_from(attempts).unwrap_or(i32::MAX);
        let millis = base.max(0.0).powi(exponent) * self.backoff_unit_ms as f64;
        let millis = if millis.is_nan() {
            0.0
        } else {
            millis.min(self.max_backoff_ms as f64)
        };
        Duration::from_millis(millis as u64)
    }
}

/// Registry reconciliation settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ReconcileSettings {
    /// Maximum number of generator correction rounds
    pub max_rounds: usize,
    /// Rewrite names that have a substring match in the registry
    pub auto_correct: bool,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            max_rounds: 2,
            auto_correct: true,
        }
    }
}

impl Settings {
    /// Loads settings from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: display.clone(),
            source,
        })?;

        let settings: Settings = serde_yaml::from_str(&content).map_err(|source| {
            ConfigError::Parse {
                path: display.clone(),
                source,
            }
        })?;

        info!("Loaded settings from {}", display);
        Ok(settings)
    }

    /// Loads settings, falling back to defaults when the file is missing
    /// or unreadable.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("{}; using default settings", e);
                Self::default()
            }
        }
    }
}
