//! Shared component core and the send/receive surface over it.

use crate::runner::LoopStats;
use crate::stream::{Envelope, StreamError, StreamRegistry};
use crate::HarnessConfig;
use harness_component::ComponentStatus;
use harness_types::MessageId;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// State shared by a component handle, its loop task and its I/O handles.
pub(crate) struct ComponentCore {
    pub(crate) status: ComponentStatus,
    pub(crate) streams: StreamRegistry,
    pub(crate) config: HarnessConfig,
    pub(crate) stats: Mutex<LoopStats>,
    /// Failures noted by supervised I/O, read by the loop to avoid
    /// counting them a second time.
    pub(crate) noted_failures: AtomicU64,
}

impl ComponentCore {
    pub(crate) fn new(name: String, config: HarnessConfig) -> Self {
        Self {
            status: ComponentStatus::new(name)
                .with_max_recovery_attempts(config.max_recovery_attempts),
            streams: StreamRegistry::default(),
            stats: Mutex::new(LoopStats::new(config.processing_window)),
            noted_failures: AtomicU64::new(0),
            config,
        }
    }
}

/// Send/receive handle passed to [`Process::process`](crate::Process::process).
///
/// Cheap to clone. Every failure other than end-of-stream is recorded
/// against the owning component before it is returned.
///
/// Inside the processing loop a failure is only noted (counted, kept as
/// `last_error`); the loop decides when the lifecycle state changes.
/// Outside it, a failure moves the component to `ERROR`.
#[derive(Clone)]
pub struct ComponentIo {
    core: Arc<ComponentCore>,
    supervised: bool,
}

impl ComponentIo {
    pub(crate) fn new(core: Arc<ComponentCore>) -> Self {
        Self {
            core,
            supervised: false,
        }
    }

    /// Handle used by the processing loop.
    pub(crate) fn supervised(core: Arc<ComponentCore>) -> Self {
        Self {
            core,
            supervised: true,
        }
    }

    /// Name of the owning component.
    #[must_use]
    pub fn name(&self) -> &str {
        self.core.status.name()
    }

    /// Status of the owning component.
    #[must_use]
    pub fn status(&self) -> &ComponentStatus {
        &self.core.status
    }

    /// Sends `payload` on `stream` with the configured default timeout.
    ///
    /// # Errors
    ///
    /// See [`send_with_timeout`](Self::send_with_timeout).
    pub async fn send(&self, stream: &str, payload: Value) -> Result<MessageId, StreamError> {
        self.send_with_timeout(stream, payload, self.core.config.send_timeout())
            .await
    }

    /// Wraps `payload` in an [`Envelope`] and sends it on `stream`,
    /// waiting at most `timeout` for buffer space.
    ///
    /// Returns the id of the delivered envelope.
    ///
    /// # Errors
    ///
    /// [`StreamError::NotFound`] for an unknown name,
    /// [`StreamError::Timeout`] when the buffer stayed full,
    /// [`StreamError::Closed`] when the peer is gone.
    pub async fn send_with_timeout(
        &self,
        stream: &str,
        payload: Value,
        timeout: Duration,
    ) -> Result<MessageId, StreamError> {
        let Some(endpoint) = self.core.streams.sender(stream) else {
            return Err(self.fail(StreamError::NotFound(stream.to_string()), "send"));
        };

        let envelope = Envelope::new(self.name(), stream, payload);
        let id = envelope.id;
        match endpoint.transport().send(envelope, timeout).await {
            Ok(()) => {
                endpoint.mark();
                self.core.status.record_sent();
                Ok(id)
            }
            Err(e) => Err(self.fail(StreamError::from_transport(stream, e, timeout), "send")),
        }
    }

    /// Receives the next payload from `stream`.
    ///
    /// `Ok(None)` means the stream has ended; that is not an error.
    /// `timeout == None` waits indefinitely.
    ///
    /// # Errors
    ///
    /// See [`receive_envelope`](Self::receive_envelope).
    pub async fn receive(
        &self,
        stream: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<Value>, StreamError> {
        Ok(self
            .receive_envelope(stream, timeout)
            .await?
            .map(Envelope::into_payload))
    }

    /// Like [`receive`](Self::receive) but keeps the envelope metadata.
    ///
    /// # Errors
    ///
    /// [`StreamError::NotFound`] for an unknown name,
    /// [`StreamError::Timeout`] when nothing arrived in time,
    /// [`StreamError::Busy`] when the endpoint is being closed.
    pub async fn receive_envelope(
        &self,
        stream: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<Envelope>, StreamError> {
        let Some(endpoint) = self.core.streams.receiver(stream) else {
            return Err(self.fail(StreamError::NotFound(stream.to_string()), "receive"));
        };

        match endpoint.transport().recv(timeout).await {
            Ok(Some(envelope)) => {
                endpoint.mark();
                self.core.status.record_received();
                Ok(Some(envelope))
            }
            Ok(None) => {
                debug!(component = %self.name(), stream, "stream ended");
                Ok(None)
            }
            Err(e) => Err(self.fail(
                StreamError::from_transport(stream, e, timeout.unwrap_or_default()),
                "receive",
            )),
        }
    }

    fn fail(&self, err: StreamError, op: &str) -> StreamError {
        let context = format!("{op} on '{}'", err.stream());
        if self.supervised {
            self.core.status.note_error(&err, &context);
            self.core.noted_failures.fetch_add(1, Ordering::Relaxed);
        } else {
            self.core.status.record_error(&err, &context);
        }
        err
    }
}
