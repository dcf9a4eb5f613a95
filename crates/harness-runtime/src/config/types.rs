//! Configuration types.

use super::ConfigError;
use harness_component::DEFAULT_MAX_RECOVERY_ATTEMPTS;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default processing-loop failure threshold.
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 5;

/// Default backoff table, in milliseconds.
pub const DEFAULT_BACKOFF_MS: [u64; 5] = [100, 500, 1000, 2000, 5000];

/// Tuning knobs for one [`HarnessComponent`](crate::HarnessComponent).
///
/// Every field is optional in TOML; missing ones take the defaults below.
///
/// ```
/// use harness_runtime::HarnessConfig;
///
/// let config = HarnessConfig::from_toml("max_consecutive_errors = 2").unwrap();
/// assert_eq!(config.max_consecutive_errors, 2);
/// assert_eq!(config.max_recovery_attempts, 3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HarnessConfig {
    /// Supervised recovery budget.
    pub max_recovery_attempts: u32,

    /// Consecutive `process()` failures after which the loop gives up.
    pub max_consecutive_errors: u32,

    /// Delay after the n-th consecutive failure is `backoff_ms[n - 1]`;
    /// the last entry repeats.
    pub backoff_ms: Vec<u64>,

    /// Bounded wait for the loop task inside `stop()`.
    pub stop_timeout_ms: u64,

    /// Timeout used by `send()` when none is given.
    pub send_timeout_ms: u64,

    /// Buffer capacity used by [`connect`](crate::connect) when none is given.
    pub default_buffer_capacity: usize,

    /// Number of recent iteration timings kept for avg/min/max.
    pub processing_window: usize,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            max_recovery_attempts: DEFAULT_MAX_RECOVERY_ATTEMPTS,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
            backoff_ms: DEFAULT_BACKOFF_MS.to_vec(),
            stop_timeout_ms: 5000,
            send_timeout_ms: 1000,
            default_buffer_capacity: 100,
            processing_window: 100,
        }
    }
}

impl HarnessConfig {
    /// Serializes to TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserializes from TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is malformed.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_consecutive_errors == 0 {
            return Err(ConfigError::invalid_value(
                "max_consecutive_errors",
                "must be at least 1",
            ));
        }
        if self.processing_window == 0 {
            return Err(ConfigError::invalid_value(
                "processing_window",
                "must be at least 1",
            ));
        }
        if self.backoff_ms.is_empty() {
            return Err(ConfigError::invalid_value("backoff_ms", "must not be empty"));
        }
        if self.backoff_ms.windows(2).any(|w| w[1] < w[0]) {
            return Err(ConfigError::invalid_value(
                "backoff_ms",
                "must be non-decreasing",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }

    #[must_use]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// The backoff table as durations.
    #[must_use]
    pub fn backoff(&self) -> Vec<Duration> {
        self.backoff_ms.iter().copied().map(Duration::from_millis).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.max_recovery_attempts, 3);
        assert_eq!(config.max_consecutive_errors, 5);
        assert_eq!(config.backoff_ms, vec![100, 500, 1000, 2000, 5000]);
        assert_eq!(config.stop_timeout(), Duration::from_secs(5));
        assert_eq!(config.send_timeout(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = HarnessConfig::from_toml(
            r#"
stop_timeout_ms = 250
backoff_ms = [10, 20]
"#,
        )
        .unwrap();

        assert_eq!(config.stop_timeout_ms, 250);
        assert_eq!(config.backoff(), vec![Duration::from_millis(10), Duration::from_millis(20)]);
        assert_eq!(config.send_timeout_ms, 1000);
    }

    #[test]
    fn toml_roundtrip() {
        let config = HarnessConfig {
            processing_window: 7,
            ..HarnessConfig::default()
        };
        let text = config.to_toml().unwrap();
        assert_eq!(HarnessConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cases = [
            (
                HarnessConfig {
                    max_consecutive_errors: 0,
                    ..HarnessConfig::default()
                },
                "max_consecutive_errors",
            ),
            (
                HarnessConfig {
                    processing_window: 0,
                    ..HarnessConfig::default()
                },
                "processing_window",
            ),
            (
                HarnessConfig {
                    backoff_ms: vec![],
                    ..HarnessConfig::default()
                },
                "backoff_ms",
            ),
            (
                HarnessConfig {
                    backoff_ms: vec![500, 100],
                    ..HarnessConfig::default()
                },
                "backoff_ms",
            ),
        ];

        for (config, expected) in cases {
            match config.validate() {
                Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected InvalidValue for {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    fn zero_recovery_budget_is_allowed() {
        let config = HarnessConfig {
            max_recovery_attempts: 0,
            ..HarnessConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
