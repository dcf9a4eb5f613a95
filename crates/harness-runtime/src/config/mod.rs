//! Harness configuration.
//!
//! [`HarnessConfig`] carries every tunable of the component lifecycle and
//! processing loop. [`ConfigLoader`] builds one from defaults, an optional
//! TOML file and `HARNESS_*` environment variables.

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::{HarnessConfig, DEFAULT_BACKOFF_MS, DEFAULT_MAX_CONSECUTIVE_ERRORS};
