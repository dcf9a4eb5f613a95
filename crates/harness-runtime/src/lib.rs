//! Runtime half of the component harness.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  harness-types     : ErrorCode, HarnessId, MessageId        │
//! │  harness-component : ComponentState, ComponentStatus        │
//! │  harness-runtime   : endpoints, processing loop, lifecycle ◄│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A [`HarnessComponent`] wraps a user-supplied [`Process`] and drives it
//! in a supervised loop on its own Tokio task. Components exchange
//! [`Envelope`]s over named, bounded endpoints; [`connect`] wires two of
//! them with an in-memory stream.
//!
//! # Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`HarnessComponent`] | `setup → start → stop → cleanup` lifecycle |
//! | [`Process`] | One iteration of component work |
//! | [`ComponentIo`] | `send` / `receive` over named endpoints |
//! | [`HarnessContext`] | Harness id, siblings, global config |
//! | [`HarnessConfig`] | Thresholds, backoff table, timeouts |
//! | [`HealthReport`] / [`PerformanceMetrics`] | Supervision reads |
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use harness_component::ComponentError;
//! use harness_runtime::{connect, ComponentIo, HarnessComponent, HarnessContext, Process};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! struct Ticker;
//!
//! #[async_trait]
//! impl Process for Ticker {
//!     async fn process(&mut self, io: &ComponentIo) -> Result<(), ComponentError> {
//!         io.send("ticks", json!("tick")).await?;
//!         tokio::time::sleep(Duration::from_millis(10)).await;
//!         Ok(())
//!     }
//! }
//!
//! struct Sink;
//!
//! #[async_trait]
//! impl Process for Sink {
//!     async fn process(&mut self, io: &ComponentIo) -> Result<(), ComponentError> {
//!         io.receive("ticks", Some(Duration::from_secs(1))).await?;
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let ticker = HarnessComponent::new("ticker", Ticker);
//! let sink = HarnessComponent::new("sink", Sink);
//! connect(&ticker, "ticks", &sink, "ticks", Some(8))?;
//!
//! let ctx = HarnessContext::new().with_sibling("ticker").with_sibling("sink");
//! for c in [&ticker, &sink] {
//!     c.setup(&ctx).await?;
//!     c.start().await?;
//! }
//! tokio::time::sleep(Duration::from_millis(50)).await;
//! for c in [&ticker, &sink] {
//!     c.stop().await?;
//!     c.cleanup().await?;
//! }
//! assert!(sink.get_performance_metrics().messages_received > 0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

mod component;
mod config;
mod context;
mod io;
mod process;
mod report;
mod runner;
mod stream;

pub use component::{connect, HarnessComponent};
pub use config::{
    ConfigError, ConfigLoader, HarnessConfig, DEFAULT_BACKOFF_MS, DEFAULT_MAX_CONSECUTIVE_ERRORS,
};
pub use context::HarnessContext;
pub use io::ComponentIo;
pub use process::Process;
pub use report::{HealthReport, PerformanceMetrics};
pub use runner::{backoff_delay, LoopState, ProcessingWindow};
pub use stream::{
    memory_stream, CloseReport, Direction, EndpointInfo, Envelope, MemoryReceiver, MemorySender,
    StreamError, StreamReceiver, StreamSender, TransportError,
};
