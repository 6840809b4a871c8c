//! Engine settings schema.
//!
//! Every section is optional in the file; omitted fields take the defaults
//! below.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::interpolation::MissingPolicy;

/// Root settings for the configuration engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Placeholder resolution.
    pub interpolation: InterpolationSettings,

    /// Property registry tuning.
    pub registry: RegistrySettings,

    /// Background polling.
    pub polling: PollingSettings,

    /// Cascading resource names.
    pub cascade: CascadeSettings,

    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct InterpolationSettings {
    /// What to do with `${key}` when the key is unset and has no default.
    pub missing: MissingPolicy,
}

/// When property listeners are driven.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationMode {
    /// A notifier thread re-resolves observed handles after each mutation.
    #[default]
    Eager,
    /// Handles re-resolve on the next read; listeners run on that thread.
    Lazy,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RegistrySettings {
    /// Number of striped recomputation locks.
    pub shard_count: usize,

    /// Separator for list and set properties.
    pub list_delimiter: String,

    pub notification: NotificationMode,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            shard_count: 16,
            list_delimiter: ",".to_string(),
            notification: NotificationMode::Eager,
        }
    }
}

/// Whether `execute` blocks on a first successful poll.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InitialMode {
    #[default]
    Sync,
    Async,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PollingSettings {
    /// Fixed period between polls once the first one succeeded.
    pub period_ms: u64,

    /// Delay before retrying a failed initial poll.
    pub retry_delay_ms: u64,

    /// Upper bound for exponential retry backoff. Unset or equal to
    /// `retry_delay_ms` means a fixed retry delay.
    pub max_retry_delay_ms: Option<u64>,

    pub initial: InitialMode,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            period_ms: 30_000,
            retry_delay_ms: 1_000,
            max_retry_delay_ms: None,
            initial: InitialMode::Sync,
        }
    }
}

impl PollingSettings {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms.unwrap_or(self.retry_delay_ms))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CascadeSettings {
    /// Joins the base name and each resolved parameter.
    pub separator: String,

    /// Placeholder templates such as `${env}`, most general first.
    pub parameters: Vec<String>,
}

impl Default for CascadeSettings {
    fn default() -> Self {
        Self {
            separator: "-".to_string(),
            parameters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub level: String,

    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}
