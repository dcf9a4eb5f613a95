//! Component layer errors.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`InvalidStateTransition`](ComponentError::InvalidStateTransition) | `COMPONENT_INVALID_STATE_TRANSITION` | No |
//! | [`StreamOperation`](ComponentError::StreamOperation) | `COMPONENT_STREAM_OPERATION` | Yes |
//! | [`Initialization`](ComponentError::Initialization) | `COMPONENT_INITIALIZATION_FAILED` | Yes |
//! | [`Operation`](ComponentError::Operation) | `COMPONENT_OPERATION_FAILED` | Yes |
//! | [`ExecutionFailed`](ComponentError::ExecutionFailed) | `COMPONENT_EXECUTION_FAILED` | Yes |
//! | [`StatusInvariant`](ComponentError::StatusInvariant) | `COMPONENT_STATUS_INVARIANT` | No |
//!
//! # Propagation
//!
//! - `InvalidStateTransition` is a caller protocol violation. It is returned
//!   synchronously and never retried.
//! - `StreamOperation` is transient. Endpoint operations record it against
//!   the owning component and hand it back as a value.
//! - `Initialization` / `Operation` wrap failures in `setup`, `stop` and
//!   `cleanup`. They are recorded first, then returned to the runtime.
//! - `StatusInvariant` is fatal for the component that raised it.

use crate::ComponentState;
use harness_types::ErrorCode;
use thiserror::Error;

/// Component layer error.
///
/// ```
/// use harness_component::{ComponentError, ComponentState};
/// use harness_types::ErrorCode;
///
/// let err = ComponentError::InvalidStateTransition {
///     from: ComponentState::Created,
///     to: ComponentState::Running,
/// };
/// assert_eq!(err.code(), "COMPONENT_INVALID_STATE_TRANSITION");
/// assert!(!err.is_recoverable());
/// assert_eq!(err.to_string(), "invalid state transition: CREATED -> RUNNING");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    /// The requested edge is not in the transition table.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        /// State at the time of the request.
        from: ComponentState,
        /// Requested target.
        to: ComponentState,
    },

    /// A channel endpoint operation failed (timeout, closed peer, unknown name).
    #[error("stream '{stream}' operation failed: {reason}")]
    StreamOperation {
        /// Endpoint name.
        stream: String,
        /// Human-readable cause.
        reason: String,
    },

    /// Resource initialization in `setup` failed.
    #[error("initialization failed: {0}")]
    Initialization(String),

    /// A lifecycle operation (`stop`, `cleanup`) failed.
    #[error("operation failed: {0}")]
    Operation(String),

    /// The caller-supplied unit of work failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Internal bookkeeping broke an invariant.
    #[error("status invariant violated: {0}")]
    StatusInvariant(String),
}

impl ComponentError {
    /// Shorthand for [`ComponentError::ExecutionFailed`].
    pub fn execution(message: impl Into<String>) -> Self {
        Self::ExecutionFailed(message.into())
    }

    /// Shorthand for [`ComponentError::StreamOperation`].
    pub fn stream(stream: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::StreamOperation {
            stream: stream.into(),
            reason: reason.into(),
        }
    }
}

impl ErrorCode for ComponentError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidStateTransition { .. } => "COMPONENT_INVALID_STATE_TRANSITION",
            Self::StreamOperation { .. } => "COMPONENT_STREAM_OPERATION",
            Self::Initialization(_) => "COMPONENT_INITIALIZATION_FAILED",
            Self::Operation(_) => "COMPONENT_OPERATION_FAILED",
            Self::ExecutionFailed(_) => "COMPONENT_EXECUTION_FAILED",
            Self::StatusInvariant(_) => "COMPONENT_STATUS_INVARIANT",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::StreamOperation { .. }
            | Self::Initialization(_)
            | Self::Operation(_)
            | Self::ExecutionFailed(_) => true,
            Self::InvalidStateTransition { .. } | Self::StatusInvariant(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harness_types::assert_error_codes;

    fn all_variants() -> Vec<ComponentError> {
        vec![
            ComponentError::InvalidStateTransition {
                from: ComponentState::Stopped,
                to: ComponentState::Running,
            },
            ComponentError::stream("out", "timed out"),
            ComponentError::Initialization("x".into()),
            ComponentError::Operation("x".into()),
            ComponentError::execution("x"),
            ComponentError::StatusInvariant("x".into()),
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "COMPONENT_");
    }

    #[test]
    fn protocol_and_invariant_errors_are_not_recoverable() {
        for err in all_variants() {
            let expected = !matches!(
                err,
                ComponentError::InvalidStateTransition { .. } | ComponentError::StatusInvariant(_)
            );
            assert_eq!(err.is_recoverable(), expected, "{err}");
        }
    }

    #[test]
    fn stream_error_message_names_endpoint() {
        let err = ComponentError::stream("telemetry", "channel closed");
        assert_eq!(
            err.to_string(),
            "stream 'telemetry' operation failed: channel closed"
        );
    }
}
