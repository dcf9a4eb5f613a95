//! Named endpoints and the per-component registry.

use super::{StreamError, StreamReceiver, StreamSender, TransportError};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Which way data flows through an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Send,
    Receive,
}

/// Read-only view of an endpoint, as reported by health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub name: String,
    pub direction: Direction,
    pub buffer_capacity: usize,
    pub peer: Option<String>,
    pub message_count: u64,
    pub last_activity: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct EndpointMeta {
    name: String,
    capacity: usize,
    peer: Option<String>,
    message_count: AtomicU64,
    last_activity: Mutex<Option<DateTime<Utc>>>,
}

impl EndpointMeta {
    fn new(name: &str, peer: Option<&str>, capacity: usize) -> Self {
        Self {
            name: name.to_string(),
            capacity,
            peer: peer.map(str::to_string),
            message_count: AtomicU64::new(0),
            last_activity: Mutex::new(None),
        }
    }

    fn mark(&self) {
        self.message_count.fetch_add(1, Ordering::Relaxed);
        *self.last_activity.lock() = Some(Utc::now());
    }

    fn info(&self, direction: Direction) -> EndpointInfo {
        EndpointInfo {
            name: self.name.clone(),
            direction,
            buffer_capacity: self.capacity,
            peer: self.peer.clone(),
            message_count: self.message_count.load(Ordering::Relaxed),
            last_activity: *self.last_activity.lock(),
        }
    }
}

/// A registered send endpoint.
pub(crate) struct SendEndpoint {
    meta: EndpointMeta,
    transport: Box<dyn StreamSender>,
}

impl SendEndpoint {
    pub(crate) fn transport(&self) -> &dyn StreamSender {
        self.transport.as_ref()
    }

    pub(crate) fn mark(&self) {
        self.meta.mark();
    }
}

/// A registered receive endpoint.
pub(crate) struct ReceiveEndpoint {
    meta: EndpointMeta,
    transport: Box<dyn StreamReceiver>,
}

impl ReceiveEndpoint {
    pub(crate) fn transport(&self) -> &dyn StreamReceiver {
        self.transport.as_ref()
    }

    pub(crate) fn mark(&self) {
        self.meta.mark();
    }
}

/// Outcome of closing every endpoint of a component.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CloseReport {
    /// Endpoints closed cleanly.
    pub closed: usize,
    /// Endpoints whose close failed, with the cause.
    pub failed: Vec<(String, Direction, TransportError)>,
}

impl CloseReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Send and receive registries of one component.
///
/// Names are unique per direction. Endpoints are handed out as `Arc`s so
/// that an in-flight operation survives a concurrent `close_all`.
#[derive(Default)]
pub(crate) struct StreamRegistry {
    senders: RwLock<HashMap<String, Arc<SendEndpoint>>>,
    receivers: RwLock<HashMap<String, Arc<ReceiveEndpoint>>>,
}

impl StreamRegistry {
    pub(crate) fn add_sender(
        &self,
        name: &str,
        transport: Box<dyn StreamSender>,
        peer: Option<&str>,
        capacity: usize,
    ) -> Result<(), StreamError> {
        let mut senders = self.senders.write();
        if senders.contains_key(name) {
            return Err(StreamError::AlreadyRegistered(name.to_string()));
        }
        senders.insert(
            name.to_string(),
            Arc::new(SendEndpoint {
                meta: EndpointMeta::new(name, peer, capacity),
                transport,
            }),
        );
        Ok(())
    }

    pub(crate) fn add_receiver(
        &self,
        name: &str,
        transport: Box<dyn StreamReceiver>,
        peer: Option<&str>,
        capacity: usize,
    ) -> Result<(), StreamError> {
        let mut receivers = self.receivers.write();
        if receivers.contains_key(name) {
            return Err(StreamError::AlreadyRegistered(name.to_string()));
        }
        receivers.insert(
            name.to_string(),
            Arc::new(ReceiveEndpoint {
                meta: EndpointMeta::new(name, peer, capacity),
                transport,
            }),
        );
        Ok(())
    }

    pub(crate) fn sender(&self, name: &str) -> Option<Arc<SendEndpoint>> {
        self.senders.read().get(name).cloned()
    }

    pub(crate) fn receiver(&self, name: &str) -> Option<Arc<ReceiveEndpoint>> {
        self.receivers.read().get(name).cloned()
    }

    pub(crate) fn has(&self, name: &str, direction: Direction) -> bool {
        match direction {
            Direction::Send => self.senders.read().contains_key(name),
            Direction::Receive => self.receivers.read().contains_key(name),
        }
    }

    pub(crate) fn counts(&self) -> (usize, usize) {
        (self.senders.read().len(), self.receivers.read().len())
    }

    /// Endpoint views sorted by name: senders, then receivers.
    pub(crate) fn infos(&self) -> (Vec<EndpointInfo>, Vec<EndpointInfo>) {
        let mut send: Vec<_> = self
            .senders
            .read()
            .values()
            .map(|e| e.meta.info(Direction::Send))
            .collect();
        let mut recv: Vec<_> = self
            .receivers
            .read()
            .values()
            .map(|e| e.meta.info(Direction::Receive))
            .collect();
        send.sort_by(|a, b| a.name.cmp(&b.name));
        recv.sort_by(|a, b| a.name.cmp(&b.name));
        (send, recv)
    }

    /// Total messages moved through every endpoint.
    pub(crate) fn message_total(&self) -> u64 {
        let send: u64 = self
            .senders
            .read()
            .values()
            .map(|e| e.meta.message_count.load(Ordering::Relaxed))
            .sum();
        let recv: u64 = self
            .receivers
            .read()
            .values()
            .map(|e| e.meta.message_count.load(Ordering::Relaxed))
            .sum();
        send + recv
    }

    /// Empties both registries and closes every endpoint.
    ///
    /// Each close is attempted independently; a failure is logged and
    /// reported but does not stop the remaining closes.
    pub(crate) fn close_all(&self, component: &str) -> CloseReport {
        let senders = std::mem::take(&mut *self.senders.write());
        let receivers = std::mem::take(&mut *self.receivers.write());
        let mut report = CloseReport::default();

        for (name, endpoint) in senders {
            Self::settle(
                &mut report,
                component,
                name,
                Direction::Send,
                endpoint.transport.close(),
            );
        }
        for (name, endpoint) in receivers {
            Self::settle(
                &mut report,
                component,
                name,
                Direction::Receive,
                endpoint.transport.close(),
            );
        }
        report
    }

    fn settle(
        report: &mut CloseReport,
        component: &str,
        name: String,
        direction: Direction,
        result: Result<(), TransportError>,
    ) {
        match result {
            Ok(()) => {
                debug!(component, stream = %name, ?direction, "endpoint closed");
                report.closed += 1;
            }
            Err(err) => {
                warn!(component, stream = %name, ?direction, "endpoint close failed: {}", err);
                report.failed.push((name, direction, err));
            }
        }
    }
}
