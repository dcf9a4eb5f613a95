//! The unit of work a component runs.

use crate::{ComponentIo, HarnessContext};
use async_trait::async_trait;
use harness_component::ComponentError;

/// Component-specific behaviour driven by a [`HarnessComponent`](crate::HarnessComponent).
///
/// `process` is called once per loop iteration. Returning `Err` counts as
/// a consecutive failure: the loop backs off and retries, giving up after
/// `max_consecutive_errors`. Stream failures convert into
/// [`ComponentError`] so bodies can use `?` on [`ComponentIo`] calls.
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use harness_component::ComponentError;
/// use harness_runtime::{ComponentIo, Process};
/// use serde_json::json;
///
/// struct Counter(u64);
///
/// #[async_trait]
/// impl Process for Counter {
///     async fn process(&mut self, io: &ComponentIo) -> Result<(), ComponentError> {
///         self.0 += 1;
///         io.send("out", json!(self.0)).await?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Process: Send + 'static {
    /// Resource initialization, run by `setup` before the component
    /// becomes `READY`.
    ///
    /// # Errors
    ///
    /// Any error aborts setup and leaves the component out of `READY`.
    async fn setup(&mut self, _ctx: &HarnessContext) -> Result<(), ComponentError> {
        Ok(())
    }

    /// One iteration of work.
    ///
    /// # Errors
    ///
    /// Counted as a loop failure; see the trait docs.
    async fn process(&mut self, io: &ComponentIo) -> Result<(), ComponentError>;

    /// Resource release, run by `cleanup` after endpoints are closed.
    ///
    /// # Errors
    ///
    /// Recorded and reported by `cleanup`.
    async fn teardown(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }
}
