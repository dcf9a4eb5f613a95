//! Message envelope exchanged over endpoints.

use chrono::{DateTime, Utc};
use harness_types::MessageId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata-wrapped message unit.
///
/// Built by the sending component, unwrapped by the receiving one. The
/// serialized shape is `{id, sender, timestamp, stream, data}`.
///
/// ```
/// use harness_runtime::Envelope;
/// use serde_json::json;
///
/// let env = Envelope::new("producer", "out", json!({"n": 1}));
/// assert_eq!(env.sender, "producer");
/// assert_eq!(env.stream, "out");
///
/// let wire = serde_json::to_value(&env).unwrap();
/// assert_eq!(wire["data"], json!({"n": 1}));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Fresh per message.
    pub id: MessageId,
    /// Name of the sending component.
    pub sender: String,
    /// Send time.
    pub timestamp: DateTime<Utc>,
    /// Name of the send endpoint the message left through.
    pub stream: String,
    /// Caller payload.
    #[serde(rename = "data")]
    pub payload: Value,
}

impl Envelope {
    /// Wraps `payload` with a fresh id and the current time.
    #[must_use]
    pub fn new(sender: impl Into<String>, stream: impl Into<String>, payload: Value) -> Self {
        Self {
            id: MessageId::new(),
            sender: sender.into(),
            timestamp: Utc::now(),
            stream: stream.into(),
            payload,
        }
    }

    /// Send time as fractional seconds since the Unix epoch.
    #[must_use]
    pub fn timestamp_secs(&self) -> f64 {
        self.timestamp.timestamp_micros() as f64 / 1_000_000.0
    }

    /// Discards the metadata.
    #[must_use]
    pub fn into_payload(self) -> Value {
        self.payload
    }
}
