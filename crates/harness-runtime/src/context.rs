//! Setup-time context handed to every component by the runtime.

use harness_types::HarnessId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// What a component learns about its surroundings at `setup`.
///
/// ```
/// use harness_runtime::HarnessContext;
/// use serde_json::json;
///
/// let ctx = HarnessContext::new()
///     .with_sibling("producer")
///     .with_sibling("consumer")
///     .with_global_config(json!({"batch": 16}));
///
/// assert!(ctx.has_sibling("consumer"));
/// assert_eq!(ctx.config_value("batch"), Some(&json!(16)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessContext {
    /// Identity of the harness that owns the component.
    pub harness_id: HarnessId,
    /// Names of every component wired into the same harness.
    pub sibling_registry: BTreeSet<String>,
    /// Harness-wide settings, opaque to this crate.
    pub global_config: Value,
}

impl Default for HarnessContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HarnessContext {
    /// Fresh harness id, no siblings, empty config object.
    #[must_use]
    pub fn new() -> Self {
        Self::with_harness_id(HarnessId::new())
    }

    #[must_use]
    pub fn with_harness_id(harness_id: HarnessId) -> Self {
        Self {
            harness_id,
            sibling_registry: BTreeSet::new(),
            global_config: Value::Object(serde_json::Map::new()),
        }
    }

    #[must_use]
    pub fn with_sibling(mut self, name: impl Into<String>) -> Self {
        self.sibling_registry.insert(name.into());
        self
    }

    #[must_use]
    pub fn with_global_config(mut self, config: Value) -> Self {
        self.global_config = config;
        self
    }

    #[must_use]
    pub fn has_sibling(&self, name: &str) -> bool {
        self.sibling_registry.contains(name)
    }

    /// Top-level key of [`global_config`](Self::global_config), if it is an object.
    #[must_use]
    pub fn config_value(&self, key: &str) -> Option<&Value> {
        self.global_config.get(key)
    }
}
