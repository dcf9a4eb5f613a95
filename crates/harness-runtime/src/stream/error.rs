//! Stream layer errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`NotFound`](StreamError::NotFound) | `STREAM_NOT_FOUND` | No |
//! | [`AlreadyRegistered`](StreamError::AlreadyRegistered) | `STREAM_ALREADY_REGISTERED` | No |
//! | [`Timeout`](StreamError::Timeout) | `STREAM_TIMEOUT` | Yes |
//! | [`Closed`](StreamError::Closed) | `STREAM_CLOSED` | No |
//! | [`Busy`](StreamError::Busy) | `STREAM_BUSY` | Yes |
//! | [`Transport`](StreamError::Transport) | `STREAM_TRANSPORT` | Yes |

use super::transport::TransportError;
use harness_component::ComponentError;
use harness_types::ErrorCode;
use std::time::Duration;
use thiserror::Error;

/// Failure of an endpoint registration or operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// No endpoint with this name in the relevant registry.
    #[error("stream not found: {0}")]
    NotFound(String),

    /// An endpoint with this name is already registered.
    #[error("stream already registered: {0}")]
    AlreadyRegistered(String),

    /// The operation did not complete in time.
    #[error("stream '{stream}' timed out after {after:?}")]
    Timeout {
        /// Endpoint name.
        stream: String,
        /// Timeout that elapsed.
        after: Duration,
    },

    /// The endpoint or its peer has been closed.
    #[error("stream '{0}' is closed")]
    Closed(String),

    /// The endpoint is in use by another operation.
    #[error("stream '{0}' is busy")]
    Busy(String),

    /// The transport reported some other failure.
    #[error("stream '{stream}' transport failure: {reason}")]
    Transport {
        /// Endpoint name.
        stream: String,
        /// Transport-supplied cause.
        reason: String,
    },
}

impl StreamError {
    /// Name of the endpoint involved.
    #[must_use]
    pub fn stream(&self) -> &str {
        match self {
            Self::NotFound(s) | Self::AlreadyRegistered(s) | Self::Closed(s) | Self::Busy(s) => s,
            Self::Timeout { stream, .. } | Self::Transport { stream, .. } => stream,
        }
    }

    pub(crate) fn from_transport(stream: &str, err: TransportError, after: Duration) -> Self {
        let stream = stream.to_string();
        match err {
            TransportError::Timeout => Self::Timeout { stream, after },
            TransportError::Closed => Self::Closed(stream),
            TransportError::Busy => Self::Busy(stream),
            TransportError::Failed(reason) => Self::Transport { stream, reason },
        }
    }
}

impl ErrorCode for StreamError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "STREAM_NOT_FOUND",
            Self::AlreadyRegistered(_) => "STREAM_ALREADY_REGISTERED",
            Self::Timeout { .. } => "STREAM_TIMEOUT",
            Self::Closed(_) => "STREAM_CLOSED",
            Self::Busy(_) => "STREAM_BUSY",
            Self::Transport { .. } => "STREAM_TRANSPORT",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Busy(_) | Self::Transport { .. }
        )
    }
}

impl From<StreamError> for ComponentError {
    fn from(err: StreamError) -> Self {
        ComponentError::stream(err.stream().to_string(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harness_types::assert_error_codes;

    fn all_variants() -> Vec<StreamError> {
        vec![
            StreamError::NotFound("a".into()),
            StreamError::AlreadyRegistered("a".into()),
            StreamError::Timeout {
                stream: "a".into(),
                after: Duration::from_millis(5),
            },
            StreamError::Closed("a".into()),
            StreamError::Busy("a".into()),
            StreamError::Transport {
                stream: "a".into(),
                reason: "x".into(),
            },
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "STREAM_");
    }

    #[test]
    fn every_variant_names_its_stream() {
        for err in all_variants() {
            assert_eq!(err.stream(), "a");
        }
    }

    #[test]
    fn converts_into_component_stream_operation() {
        let err: ComponentError = StreamError::Closed("out".into()).into();
        assert_eq!(
            err,
            ComponentError::StreamOperation {
                stream: "out".into(),
                reason: "stream 'out' is closed".into(),
            }
        );
        assert_eq!(err.code(), "COMPONENT_STREAM_OPERATION");
    }

    #[test]
    fn transport_errors_map_by_kind() {
        let after = Duration::from_millis(10);
        assert!(matches!(
            StreamError::from_transport("s", TransportError::Timeout, after),
            StreamError::Timeout { .. }
        ));
        assert_eq!(
            StreamError::from_transport("s", TransportError::Closed, after),
            StreamError::Closed("s".into())
        );
        assert_eq!(
            StreamError::from_transport("s", TransportError::Failed("io".into()), after),
            StreamError::Transport {
                stream: "s".into(),
                reason: "io".into()
            }
        );
    }
}
