//! Component lifecycle states and the transition table.
//!
//! # State Machine
//!
//! ```text
//!            ┌──────────┐
//!            │ Created  │
//!            └────┬─────┘
//!                 │ setup
//!                 ▼
//!  ┌─────────► Ready ──── start ───► Running ◄──► Paused
//!  │             │                      │            │
//!  │ restart     └───────► Stopping ◄───┴────────────┘
//!  │                          │
//!  └──────────── Stopped ◄────┘
//!
//!  any non-terminal ──► Error ──► Failed      (record_error)
//!  Error / Failed ──► Ready                   (attempt_recovery)
//! ```
//!
//! The exact legal edges are listed in [`ComponentState::valid_targets`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one component.
///
/// # Categories
///
/// | Category | States |
/// |----------|--------|
/// | Healthy | `Ready`, `Running`, `Paused` |
/// | Startable | `Ready`, `Stopped` |
/// | Recoverable | `Error`, `Failed` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentState {
    /// Constructed, resources not yet initialized.
    #[default]
    Created,
    /// Initialized and waiting to be started.
    Ready,
    /// Processing loop is active.
    Running,
    /// Processing loop is suspended but not torn down.
    Paused,
    /// Shutdown requested, loop draining.
    Stopping,
    /// Loop finished; may be restarted.
    Stopped,
    /// A failure was recorded.
    Error,
    /// A failure was recorded while already in a state that cannot enter `Error`.
    Failed,
}

impl ComponentState {
    /// Every state, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Created,
        Self::Ready,
        Self::Running,
        Self::Paused,
        Self::Stopping,
        Self::Stopped,
        Self::Error,
        Self::Failed,
    ];

    /// Returns the states reachable from `self` in one transition.
    ///
    /// ```text
    /// Created  -> Ready, Error, Failed
    /// Ready    -> Running, Stopping, Error, Failed
    /// Running  -> Paused, Stopping, Error, Failed
    /// Paused   -> Running, Stopping, Error, Failed
    /// Stopping -> Stopped, Error, Failed
    /// Stopped  -> Ready, Failed
    /// Error    -> Ready, Stopped, Failed
    /// Failed   -> Ready
    /// ```
    #[must_use]
    pub fn valid_targets(self) -> &'static [Self] {
        use ComponentState::*;
        match self {
            Created => &[Ready, Error, Failed],
            Ready => &[Running, Stopping, Error, Failed],
            Running => &[Paused, Stopping, Error, Failed],
            Paused => &[Running, Stopping, Error, Failed],
            Stopping => &[Stopped, Error, Failed],
            Stopped => &[Ready, Failed],
            Error => &[Ready, Stopped, Failed],
            Failed => &[Ready],
        }
    }

    /// Returns `true` if `self -> target` is in the transition table.
    ///
    /// ```
    /// use harness_component::ComponentState;
    ///
    /// assert!(ComponentState::Created.can_transition_to(ComponentState::Ready));
    /// assert!(!ComponentState::Created.can_transition_to(ComponentState::Running));
    /// assert!(!ComponentState::Failed.can_transition_to(ComponentState::Failed));
    /// ```
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        self.valid_targets().contains(&target)
    }

    /// `Ready`, `Running` or `Paused`.
    #[must_use]
    pub fn is_healthy(self) -> bool {
        matches!(self, Self::Ready | Self::Running | Self::Paused)
    }

    /// `Ready` or `Stopped`.
    #[must_use]
    pub fn can_start(self) -> bool {
        matches!(self, Self::Ready | Self::Stopped)
    }

    /// `Error` or `Failed`.
    #[must_use]
    pub fn is_recoverable(self) -> bool {
        matches!(self, Self::Error | Self::Failed)
    }

    /// Entering one of these states clears the error counters.
    #[must_use]
    pub(crate) fn resets_counters(self) -> bool {
        matches!(self, Self::Ready | Self::Running)
    }

    /// Returns the canonical upper-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::Ready => "READY",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Error => "ERROR",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ComponentState::*;

    #[test]
    fn table_matches_lifecycle() {
        let expected: [(ComponentState, &[ComponentState]); 8] = [
            (Created, &[Ready, Error, Failed]),
            (Ready, &[Running, Stopping, Error, Failed]),
            (Running, &[Paused, Stopping, Error, Failed]),
            (Paused, &[Running, Stopping, Error, Failed]),
            (Stopping, &[Stopped, Error, Failed]),
            (Stopped, &[Ready, Failed]),
            (Error, &[Ready, Stopped, Failed]),
            (Failed, &[Ready]),
        ];

        for (from, targets) in expected {
            for to in ComponentState::ALL {
                assert_eq!(
                    from.can_transition_to(to),
                    targets.contains(&to),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn no_self_transitions() {
        for state in ComponentState::ALL {
            assert!(!state.can_transition_to(state), "{state} -> {state}");
        }
    }

    #[test]
    fn categories() {
        let healthy: Vec<_> = ComponentState::ALL
            .into_iter()
            .filter(|s| s.is_healthy())
            .collect();
        assert_eq!(healthy, vec![Ready, Running, Paused]);

        assert!(Ready.can_start());
        assert!(Stopped.can_start());
        assert!(!Running.can_start());

        assert!(Error.is_recoverable());
        assert!(Failed.is_recoverable());
        assert!(!Stopped.is_recoverable());
    }

    #[test]
    fn display_and_serde_agree() {
        for state in ComponentState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }

    #[test]
    fn default_is_created() {
        assert_eq!(ComponentState::default(), Created);
    }
}
