//! UUID-backed identifiers.
//!
//! Identifiers are opaque newtypes over a v4 UUID. Neither type implements
//! `Default`: an id is always minted on purpose, at the point where the thing
//! it names comes into existence.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of one harness run (the external runtime that wires and
/// drives a set of components).
///
/// Passed to every component through the setup context so that logs and
/// health reports from sibling components can be correlated.
///
/// ```
/// use harness_types::HarnessId;
///
/// let a = HarnessId::new();
/// let b = HarnessId::new();
/// assert_ne!(a, b);
/// assert!(a.to_string().starts_with("harness:"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HarnessId(pub Uuid);

#[allow(clippy::new_without_default)]
impl HarnessId {
    /// Creates a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for HarnessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "harness:{}", self.0)
    }
}

/// Identifier stamped on every message envelope at send time.
///
/// ```
/// use harness_types::MessageId;
///
/// let id = MessageId::new();
/// assert_eq!(id.to_string(), id.uuid().to_string());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

#[allow(clippy::new_without_default)]
impl MessageId {
    /// Creates a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_ids_are_unique() {
        let ids: std::collections::HashSet<_> = (0..64).map(|_| MessageId::new()).collect();
        assert_eq!(ids.len(), 64);
    }

    #[test]
    fn harness_id_display_prefix() {
        let id = HarnessId::new();
        assert_eq!(id.to_string(), format!("harness:{}", id.uuid()));
    }
}
