//! Transport seam under the endpoints.
//!
//! Endpoints talk to their peer through [`StreamSender`] / [`StreamReceiver`].
//! The in-process implementation is a bounded tokio mpsc channel
//! ([`memory_stream`]): FIFO per channel, and a full buffer blocks the
//! sender until space frees up or the timeout elapses. Nothing is ever
//! dropped silently.

use super::Envelope;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport-level failure, before the endpoint attaches its name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("timed out")]
    Timeout,
    #[error("closed")]
    Closed,
    #[error("busy")]
    Busy,
    #[error("{0}")]
    Failed(String),
}

/// Sending half of a directional stream.
#[async_trait]
pub trait StreamSender: Send + Sync + 'static {
    /// Delivers `envelope`, waiting at most `timeout` for buffer space.
    async fn send(&self, envelope: Envelope, timeout: Duration) -> Result<(), TransportError>;

    /// Releases the sending side. Must be safe to call more than once.
    fn close(&self) -> Result<(), TransportError>;
}

/// Receiving half of a directional stream.
#[async_trait]
pub trait StreamReceiver: Send + Sync + 'static {
    /// Waits for the next envelope.
    ///
    /// `Ok(None)` means the stream has ended: every sender is gone and the
    /// buffer is drained. `timeout == None` waits indefinitely.
    async fn recv(&self, timeout: Option<Duration>) -> Result<Option<Envelope>, TransportError>;

    /// Stops accepting new envelopes. Buffered ones can still be received.
    fn close(&self) -> Result<(), TransportError>;
}

/// Sending half of a [`memory_stream`].
#[derive(Debug)]
pub struct MemorySender {
    inner: parking_lot::Mutex<Option<mpsc::Sender<Envelope>>>,
}

/// Receiving half of a [`memory_stream`].
#[derive(Debug)]
pub struct MemoryReceiver {
    inner: tokio::sync::Mutex<mpsc::Receiver<Envelope>>,
}

/// Creates a bounded in-process stream holding up to `capacity` envelopes.
///
/// A capacity of zero is raised to one.
///
/// ```
/// use harness_runtime::{memory_stream, Envelope, StreamReceiver, StreamSender};
/// use std::time::Duration;
///
/// let rt = tokio::runtime::Builder::new_current_thread()
///     .enable_all()
///     .build()
///     .unwrap();
/// rt.block_on(async {
///     let (tx, rx) = memory_stream(4);
///     let env = Envelope::new("a", "out", serde_json::json!(7));
///     tx.send(env.clone(), Duration::from_millis(50)).await.unwrap();
///     assert_eq!(rx.recv(None).await.unwrap(), Some(env));
/// });
/// ```
#[must_use]
pub fn memory_stream(capacity: usize) -> (MemorySender, MemoryReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        MemorySender {
            inner: parking_lot::Mutex::new(Some(tx)),
        },
        MemoryReceiver {
            inner: tokio::sync::Mutex::new(rx),
        },
    )
}

#[async_trait]
impl StreamSender for MemorySender {
    async fn send(&self, envelope: Envelope, timeout: Duration) -> Result<(), TransportError> {
        // Clone out so the lock is not held while waiting for capacity.
        let tx = self.inner.lock().clone().ok_or(TransportError::Closed)?;
        match tokio::time::timeout(timeout, tx.send(envelope)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => Err(TransportError::Timeout),
        }
    }

    fn close(&self) -> Result<(), TransportError> {
        self.inner.lock().take();
        Ok(())
    }
}

impl MemorySender {
    /// `true` once either side has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().as_ref().map_or(true, mpsc::Sender::is_closed)
    }
}

#[async_trait]
impl StreamReceiver for MemoryReceiver {
    async fn recv(&self, timeout: Option<Duration>) -> Result<Option<Envelope>, TransportError> {
        let next = async { self.inner.lock().await.recv().await };
        match timeout {
            Some(limit) => tokio::time::timeout(limit, next)
                .await
                .map_err(|_| TransportError::Timeout),
            None => Ok(next.await),
        }
    }

    fn close(&self) -> Result<(), TransportError> {
        // A receive in flight owns the lock.
        let mut rx = self.inner.try_lock().map_err(|_| TransportError::Busy)?;
        rx.close();
        Ok(())
    }
}
