//! Named, directional, bounded channel endpoints.
//!
//! # Layout
//!
//! ```text
//! component A                                   component B
//! ┌──────────────┐   Envelope {id, sender, ..}   ┌──────────────┐
//! │ send "out" ──┼──► StreamSender ─► StreamReceiver ──► recv "in" │
//! └──────────────┘      (bounded, FIFO)          └──────────────┘
//! ```
//!
//! Each component owns a registry of named send and receive endpoints.
//! An endpoint wraps one half of a transport ([`StreamSender`] or
//! [`StreamReceiver`]) together with its counters.

mod endpoint;
mod envelope;
mod error;
mod transport;

pub use endpoint::{CloseReport, Direction, EndpointInfo};
pub(crate) use endpoint::StreamRegistry;
pub use envelope::Envelope;
pub use error::StreamError;
pub use transport::{
    memory_stream, MemoryReceiver, MemorySender, StreamReceiver, StreamSender, TransportError,
};
