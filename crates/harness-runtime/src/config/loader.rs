//! Layered configuration loading.
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. Config file, when one is given and exists
//! 3. Environment variables (`HARNESS_*`)
//!
//! Each layer overrides the previous. The merged result is validated
//! before it is returned.

use super::{ConfigError, HarnessConfig};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Overrides `$field` from the integer environment variable `$var`.
macro_rules! parse_env_int {
    ($field:expr, $var:literal) => {
        if let Ok(val) = std::env::var($var) {
            $field = val
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_env_var($var, "expected non-negative integer"))?;
        }
    };
}

/// Configuration loader with builder pattern.
///
/// # Example
///
/// ```no_run
/// use harness_runtime::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_file("harness.toml")
///     .skip_env_vars()
///     .load()?;
/// # Ok::<(), harness_runtime::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    skip_env: bool,
}

impl ConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TOML file to layer over the defaults.
    ///
    /// A missing file is not an error.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Skips environment variable loading.
    ///
    /// Useful for testing with deterministic config.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Loads, merges and validates configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file exists but cannot be read or
    /// parsed, an environment variable is malformed, or the result fails
    /// [`HarnessConfig::validate`].
    pub fn load(&self) -> Result<HarnessConfig, ConfigError> {
        let mut config = HarnessConfig::default();

        if let Some(ref path) = self.file {
            if let Some(file_config) = Self::load_file(path)? {
                debug!(path = %path.display(), "Loaded harness config");
                config = file_config;
            }
        }

        if !self.skip_env {
            Self::apply_env_vars(&mut config)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads a config file, returning None if it doesn't exist.
    fn load_file(path: &Path) -> Result<Option<HarnessConfig>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config =
            HarnessConfig::from_toml(&content).map_err(|e| ConfigError::parse_toml(path, e))?;

        Ok(Some(config))
    }

    fn apply_env_vars(config: &mut HarnessConfig) -> Result<(), ConfigError> {
        parse_env_int!(config.max_recovery_attempts, "HARNESS_MAX_RECOVERY_ATTEMPTS");
        parse_env_int!(config.max_consecutive_errors, "HARNESS_MAX_CONSECUTIVE_ERRORS");
        parse_env_int!(config.stop_timeout_ms, "HARNESS_STOP_TIMEOUT_MS");
        parse_env_int!(config.send_timeout_ms, "HARNESS_SEND_TIMEOUT_MS");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("harness.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_defaults_only() {
        let config = ConfigLoader::new().skip_env_vars().load().unwrap();
        assert_eq!(config, HarnessConfig::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let path = create_config_file(
            temp.path(),
            r#"
max_recovery_attempts = 1
backoff_ms = [5, 5, 50]
"#,
        );

        let config = ConfigLoader::new()
            .with_file(&path)
            .skip_env_vars()
            .load()
            .unwrap();

        assert_eq!(config.max_recovery_attempts, 1);
        assert_eq!(config.backoff_ms, vec![5, 5, 50]);
        assert_eq!(config.max_consecutive_errors, 5);
    }

    #[test]
    fn missing_file_ok() {
        let config = ConfigLoader::new()
            .with_file("/nonexistent/path/harness.toml")
            .skip_env_vars()
            .load()
            .unwrap();

        assert_eq!(config, HarnessConfig::default());
    }

    #[test]
    fn malformed_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let path = create_config_file(temp.path(), "max_recovery_attempts = \"many\"");

        let err = ConfigLoader::new()
            .with_file(&path)
            .skip_env_vars()
            .load()
            .unwrap_err();

        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains("harness.toml"));
    }

    #[test]
    fn invalid_file_values_fail_validation() {
        let temp = TempDir::new().unwrap();
        let path = create_config_file(temp.path(), "backoff_ms = [1000, 10]");

        let err = ConfigLoader::new()
            .with_file(&path)
            .skip_env_vars()
            .load()
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                field: "backoff_ms",
                ..
            }
        ));
    }

    #[test]
    fn env_var_override() {
        // Only test in this crate that touches HARNESS_* variables.
        std::env::set_var("HARNESS_STOP_TIMEOUT_MS", "250");
        std::env::set_var("HARNESS_MAX_CONSECUTIVE_ERRORS", " 2 ");

        let config = ConfigLoader::new().load();

        std::env::set_var("HARNESS_SEND_TIMEOUT_MS", "soon");
        let bad = ConfigLoader::new().load();

        std::env::remove_var("HARNESS_STOP_TIMEOUT_MS");
        std::env::remove_var("HARNESS_MAX_CONSECUTIVE_ERRORS");
        std::env::remove_var("HARNESS_SEND_TIMEOUT_MS");

        let config = config.unwrap();
        assert_eq!(config.stop_timeout_ms, 250);
        assert_eq!(config.max_consecutive_errors, 2);
        assert!(matches!(
            bad,
            Err(ConfigError::InvalidEnvVar { ref name, .. }) if name == "HARNESS_SEND_TIMEOUT_MS"
        ));
    }
}
