//! Foundational types for the component harness.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  harness-types     : ErrorCode, HarnessId, MessageId ◄ HERE │
//! │  harness-component : ComponentState, ComponentStatus        │
//! │  harness-runtime   : endpoints, processing loop, lifecycle  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! This crate has no async or logging dependencies so it can be shared by
//! anything that needs to name a harness run, a message, or classify an
//! error.

mod error;
mod id;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{HarnessId, MessageId};
