//! Component state machine and bookkeeping.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  harness-types     : ErrorCode, HarnessId, MessageId        │
//! │  harness-component : ComponentState, ComponentStatus ◄ HERE │
//! │  harness-runtime   : endpoints, processing loop, lifecycle  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! This crate is synchronous. [`ComponentStatus`] guards all of its state
//! with one lock and can be shared freely between the processing task and
//! whoever polls it for health.
//!
//! # Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`ComponentState`] | Closed lifecycle enumeration and transition table |
//! | [`ComponentStatus`] | Validated transitions, error recording, supervised recovery |
//! | [`TransitionHistory`] | Ring buffer of the last 100 transitions |
//! | [`ComponentMetrics`] | Throughput and activity counters |
//! | [`ComponentError`] | Error taxonomy shared with the runtime layer |

mod error;
mod history;
mod metrics;
mod state;
mod status;

pub use error::ComponentError;
pub use history::{TransitionHistory, TransitionRecord, TRANSITION_HISTORY_CAPACITY};
pub use metrics::ComponentMetrics;
pub use state::ComponentState;
pub use status::{
    ComponentStatus, ErrorRecord, StatusHealth, StatusSnapshot, StatusSummary,
    DEFAULT_MAX_RECOVERY_ATTEMPTS,
};
