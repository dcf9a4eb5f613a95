//! Lifecycle API of one harness component.
//!
//! # Lifecycle
//!
//! ```text
//! new ──► setup ──► start ──► [pause ⇄ resume] ──► stop ──► cleanup
//!  │        │         │                              │         │
//! CREATED  READY    RUNNING        PAUSED        STOPPING   STOPPED
//!                                                 STOPPED
//! ```
//!
//! The runtime wires endpoints between `new` and `start`, and polls
//! [`health_check`](HarnessComponent::health_check) /
//! [`get_performance_metrics`](HarnessComponent::get_performance_metrics)
//! at any point, including before `setup` and after `cleanup`.

use crate::io::{ComponentCore, ComponentIo};
use crate::report::{HealthReport, PerformanceMetrics};
use crate::runner::{run_loop, LoopControl, LoopState};
use crate::stream::{
    memory_stream, CloseReport, Direction, StreamError, StreamReceiver, StreamSender,
};
use crate::{HarnessConfig, HarnessContext, Process};
use harness_component::{ComponentError, ComponentState, ComponentStatus};
use harness_types::MessageId;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle on a spawned processing loop.
struct LoopTask {
    handle: JoinHandle<LoopState>,
    control: watch::Sender<LoopControl>,
}

/// One independently scheduled unit of work.
///
/// Owns its [`ComponentStatus`], its named endpoints and the task running
/// its [`Process`].
///
/// # Example
///
/// ```
/// use async_trait::async_trait;
/// use harness_component::{ComponentError, ComponentState};
/// use harness_runtime::{ComponentIo, HarnessComponent, HarnessContext, Process};
///
/// struct Idle;
///
/// #[async_trait]
/// impl Process for Idle {
///     async fn process(&mut self, _io: &ComponentIo) -> Result<(), ComponentError> {
///         tokio::time::sleep(std::time::Duration::from_millis(5)).await;
///         Ok(())
///     }
/// }
///
/// # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
/// let component = HarnessComponent::new("idle", Idle);
/// component.setup(&HarnessContext::new()).await?;
/// component.start().await?;
/// assert_eq!(component.status().state(), ComponentState::Running);
///
/// component.stop().await?;
/// component.cleanup().await?;
/// assert_eq!(component.status().state(), ComponentState::Stopped);
/// # Ok::<(), ComponentError>(())
/// # }).unwrap();
/// ```
pub struct HarnessComponent {
    core: Arc<ComponentCore>,
    process: Arc<tokio::sync::Mutex<Box<dyn Process>>>,
    task: Mutex<Option<LoopTask>>,
    context: Mutex<Option<HarnessContext>>,
}

impl HarnessComponent {
    /// Creates a component with the default [`HarnessConfig`].
    #[must_use]
    pub fn new(name: impl Into<String>, process: impl Process) -> Self {
        Self::with_config(name, process, HarnessConfig::default())
    }

    #[must_use]
    pub fn with_config(
        name: impl Into<String>,
        process: impl Process,
        config: HarnessConfig,
    ) -> Self {
        let process: Box<dyn Process> = Box::new(process);
        Self {
            core: Arc::new(ComponentCore::new(name.into(), config)),
            process: Arc::new(tokio::sync::Mutex::new(process)),
            task: Mutex::new(None),
            context: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.core.status.name()
    }

    #[must_use]
    pub fn status(&self) -> &ComponentStatus {
        &self.core.status
    }

    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.core.config
    }

    /// Context received by the last successful `setup`.
    #[must_use]
    pub fn context(&self) -> Option<HarnessContext> {
        self.context.lock().clone()
    }

    /// Send/receive handle, the same one `process()` receives.
    #[must_use]
    pub fn io(&self) -> ComponentIo {
        ComponentIo::new(Arc::clone(&self.core))
    }

    /// Registers a named send endpoint over `channel`.
    ///
    /// # Errors
    ///
    /// [`StreamError::AlreadyRegistered`] when the name is taken.
    pub fn add_send_endpoint(
        &self,
        name: &str,
        channel: impl StreamSender,
        peer: Option<&str>,
        capacity: usize,
    ) -> Result<(), StreamError> {
        self.core
            .streams
            .add_sender(name, Box::new(channel), peer, capacity)?;
        debug!(component = %self.name(), stream = name, peer, "send endpoint added");
        Ok(())
    }

    /// Registers a named receive endpoint over `channel`.
    ///
    /// # Errors
    ///
    /// [`StreamError::AlreadyRegistered`] when the name is taken.
    pub fn add_receive_endpoint(
        &self,
        name: &str,
        channel: impl StreamReceiver,
        peer: Option<&str>,
        capacity: usize,
    ) -> Result<(), StreamError> {
        self.core
            .streams
            .add_receiver(name, Box::new(channel), peer, capacity)?;
        debug!(component = %self.name(), stream = name, peer, "receive endpoint added");
        Ok(())
    }

    /// Shorthand for [`ComponentIo::send`].
    ///
    /// # Errors
    ///
    /// See [`ComponentIo::send_with_timeout`].
    pub async fn send(&self, stream: &str, payload: Value) -> Result<MessageId, StreamError> {
        self.io().send(stream, payload).await
    }

    /// Shorthand for [`ComponentIo::receive`].
    ///
    /// # Errors
    ///
    /// See [`ComponentIo::receive_envelope`].
    pub async fn receive(
        &self,
        stream: &str,
        timeout: Option<Duration>,
    ) -> Result<Option<Value>, StreamError> {
        self.io().receive(stream, timeout).await
    }

    /// Runs [`Process::setup`], then enters `READY`.
    ///
    /// # Errors
    ///
    /// - [`ComponentError::Operation`] while a processing loop is active.
    /// - [`ComponentError::InvalidStateTransition`] when `READY` is not
    ///   reachable from the current state. The hook is not run.
    /// - [`ComponentError::Initialization`] when the hook fails. The
    ///   failure is recorded first.
    pub async fn setup(&self, ctx: &HarnessContext) -> Result<(), ComponentError> {
        // The loop holds the process for its whole lifetime.
        if self.is_active() {
            return Err(ComponentError::Operation(
                "setup while processing loop is active".into(),
            ));
        }
        let status = &self.core.status;
        let from = status.state();
        if !from.can_transition_to(ComponentState::Ready) {
            return Err(ComponentError::InvalidStateTransition {
                from,
                to: ComponentState::Ready,
            });
        }

        let hook = self.process.lock().await.setup(ctx).await;
        if let Err(e) = hook {
            let err = ComponentError::Initialization(e.to_string());
            status.record_error(&err, "setup");
            return Err(err);
        }

        status.transition_to(ComponentState::Ready, "setup complete")?;
        *self.context.lock() = Some(ctx.clone());
        info!(component = %self.name(), harness = %ctx.harness_id, "setup complete");
        Ok(())
    }

    /// Enters `RUNNING` and spawns the processing loop.
    ///
    /// From `STOPPED` the component first re-enters `READY` (plain restart,
    /// no recovery budget used). Calling this while a loop is active is a
    /// no-op. Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// [`ComponentError::InvalidStateTransition`] when `RUNNING` is not
    /// reachable, e.g. before `setup` or from `FAILED` without recovery.
    pub async fn start(&self) -> Result<(), ComponentError> {
        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            warn!(component = %self.name(), "start() while processing loop is active; ignored");
            return Ok(());
        }

        let status = &self.core.status;
        if status.state() == ComponentState::Stopped {
            status.transition_to(ComponentState::Ready, "restart")?;
        }
        status.transition_to(ComponentState::Running, "start")?;

        let (control, control_rx) = watch::channel(LoopControl::Run);
        let handle = tokio::spawn(run_loop(
            Arc::clone(&self.core),
            Arc::clone(&self.process),
            control_rx,
        ));
        *task = Some(LoopTask { handle, control });
        Ok(())
    }

    /// `RUNNING → PAUSED`. The loop finishes its current iteration and
    /// then waits without calling `process()`.
    ///
    /// # Errors
    ///
    /// - [`ComponentError::InvalidStateTransition`] unless `RUNNING`.
    /// - [`ComponentError::Operation`] when no processing loop is active.
    pub fn pause(&self) -> Result<(), ComponentError> {
        let status = &self.core.status;
        let from = status.state();
        if from != ComponentState::Running {
            return Err(ComponentError::InvalidStateTransition {
                from,
                to: ComponentState::Paused,
            });
        }
        if !self.is_active() {
            return Err(ComponentError::Operation(
                "pause without an active processing loop".into(),
            ));
        }
        status.transition_to(ComponentState::Paused, "pause")?;
        self.signal(LoopControl::Pause);
        Ok(())
    }

    /// `PAUSED → RUNNING`.
    ///
    /// # Errors
    ///
    /// [`ComponentError::InvalidStateTransition`] unless `PAUSED`.
    pub fn resume(&self) -> Result<(), ComponentError> {
        let status = &self.core.status;
        let from = status.state();
        if from != ComponentState::Paused {
            return Err(ComponentError::InvalidStateTransition {
                from,
                to: ComponentState::Running,
            });
        }
        status.transition_to(ComponentState::Running, "resume")?;
        self.signal(LoopControl::Run);
        Ok(())
    }

    fn signal(&self, command: LoopControl) {
        if let Some(task) = self.task.lock().as_ref() {
            // Err only when the loop has already ended.
            let _ = task.control.send(command);
        }
    }

    /// Stops the processing loop. Idempotent.
    ///
    /// Signals the loop, enters `STOPPING` when reachable, and waits up to
    /// `stop_timeout_ms` for the task. A task that does not finish in time
    /// is aborted. Ends in `STOPPED` when that is reachable; a component
    /// already in `FAILED` stays there.
    ///
    /// # Errors
    ///
    /// [`ComponentError::Operation`] when the loop task panicked. The
    /// panic is recorded as a [`ComponentError::StatusInvariant`] and the
    /// component is left `FAILED`.
    pub async fn stop(&self) -> Result<(), ComponentError> {
        let task = self.task.lock().take();
        let status = &self.core.status;

        if let Some(task) = &task {
            let _ = task.control.send(LoopControl::Stop);
        }
        if status.state().can_transition_to(ComponentState::Stopping) {
            status.transition_to(ComponentState::Stopping, "stop requested")?;
        }

        if let Some(LoopTask { mut handle, .. }) = task {
            let limit = self.core.config.stop_timeout();
            let joined = match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        component = %self.name(),
                        timeout = ?limit,
                        "processing loop did not stop in time; aborting"
                    );
                    handle.abort();
                    handle.await
                }
            };

            match joined {
                Ok(outcome) => debug!(component = %self.name(), ?outcome, "loop joined"),
                Err(e) if e.is_panic() => {
                    self.core.stats.lock().state = LoopState::Aborted;
                    return Err(self.contain_panic(&e.to_string()));
                }
                Err(_) => self.core.stats.lock().state = LoopState::Aborted,
            }
        }

        if status.state().can_transition_to(ComponentState::Stopped) {
            status.transition_to(ComponentState::Stopped, "stop complete")?;
            info!(component = %self.name(), "stopped");
        }
        Ok(())
    }

    fn contain_panic(&self, message: &str) -> ComponentError {
        let status = &self.core.status;
        let invariant =
            ComponentError::StatusInvariant(format!("processing loop panicked: {message}"));
        status.record_error(&invariant, "stop");
        if status.state() != ComponentState::Failed {
            if let Err(e) = status.transition_to(ComponentState::Failed, "loop panicked") {
                warn!(component = %self.name(), "could not enter FAILED: {}", e);
            }
        }
        ComponentError::Operation(invariant.to_string())
    }

    /// Stops the loop, closes every endpoint, runs [`Process::teardown`]
    /// and enters `STOPPED`.
    ///
    /// Each endpoint close is attempted independently. Close failures are
    /// logged and listed in the returned [`CloseReport`]; they do not keep
    /// the component out of `STOPPED`.
    ///
    /// # Errors
    ///
    /// The first of: the `stop()` error when the loop panicked,
    /// [`ComponentError::Operation`] when teardown failed, or
    /// [`ComponentError::InvalidStateTransition`] when `STOPPED` cannot be
    /// entered. Endpoints are closed in every case.
    pub async fn cleanup(&self) -> Result<CloseReport, ComponentError> {
        let mut failure = self.stop().await.err();

        let report = self.core.streams.close_all(self.name());
        if !report.is_clean() {
            warn!(
                component = %self.name(),
                closed = report.closed,
                failed = report.failed.len(),
                "some endpoints failed to close"
            );
        }

        let teardown = self.process.lock().await.teardown().await;
        if let Err(e) = teardown {
            let err = ComponentError::Operation(format!("teardown failed: {e}"));
            self.core.status.record_error(&err, "cleanup");
            failure.get_or_insert(err);
        }

        let status = &self.core.status;
        if status.state() != ComponentState::Stopped {
            if let Err(e) = status.transition_to(ComponentState::Stopped, "cleanup complete") {
                warn!(component = %self.name(), "cleanup cannot reach STOPPED: {}", e);
                failure.get_or_insert(e);
            }
        }

        match failure {
            Some(err) => Err(err),
            None => {
                info!(component = %self.name(), closed = report.closed, "cleanup complete");
                Ok(report)
            }
        }
    }

    /// `true` while a processing loop task exists and has not finished.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    #[must_use]
    pub fn health_check(&self) -> HealthReport {
        let status = self.core.status.health_report();
        let loop_active = self.is_active();
        let (send_endpoints, receive_endpoints) = self.core.streams.infos();
        let stats = self.core.stats.lock();
        HealthReport {
            status,
            loop_state: stats.state,
            loop_active,
            consecutive_errors: stats.consecutive_errors,
            last_heartbeat: stats.last_heartbeat,
            send_endpoints,
            receive_endpoints,
        }
    }

    #[must_use]
    pub fn get_performance_metrics(&self) -> PerformanceMetrics {
        let summary = self.core.status.status_summary();
        let (send_endpoint_count, receive_endpoint_count) = self.core.streams.counts();
        let endpoint_messages = self.core.streams.message_total();
        let stats = self.core.stats.lock();
        PerformanceMetrics {
            name: summary.name,
            state: summary.state,
            loop_state: stats.state,
            iterations: stats.iterations,
            consecutive_errors: stats.consecutive_errors,
            avg_processing_time: stats.window.average(),
            min_processing_time: stats.window.min(),
            max_processing_time: stats.window.max(),
            messages_processed: summary.metrics.messages_processed,
            messages_sent: summary.metrics.messages_sent,
            messages_received: summary.metrics.messages_received,
            errors: summary.metrics.errors,
            endpoint_messages,
            send_endpoint_count,
            receive_endpoint_count,
            uptime: summary.metrics.uptime,
            last_heartbeat: stats.last_heartbeat,
        }
    }
}

impl std::fmt::Debug for HarnessComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarnessComponent")
            .field("name", &self.name())
            .field("state", &self.core.status.state())
            .field("loop_active", &self.is_active())
            .finish_non_exhaustive()
    }
}

/// Wires `producer`'s send endpoint `output` to `consumer`'s receive
/// endpoint `input` over a fresh [`memory_stream`].
///
/// `capacity` defaults to the producer's `default_buffer_capacity`.
/// Nothing is registered unless both names are free.
///
/// # Errors
///
/// [`StreamError::AlreadyRegistered`] naming the taken endpoint.
pub fn connect(
    producer: &HarnessComponent,
    output: &str,
    consumer: &HarnessComponent,
    input: &str,
    capacity: Option<usize>,
) -> Result<(), StreamError> {
    if producer.core.streams.has(output, Direction::Send) {
        return Err(StreamError::AlreadyRegistered(output.to_string()));
    }
    if consumer.core.streams.has(input, Direction::Receive) {
        return Err(StreamError::AlreadyRegistered(input.to_string()));
    }

    let capacity = capacity
        .unwrap_or(producer.core.config.default_buffer_capacity)
        .max(1);
    let (tx, rx) = memory_stream(capacity);
    producer.add_send_endpoint(output, tx, Some(consumer.name()), capacity)?;
    consumer.add_receive_endpoint(input, rx, Some(producer.name()), capacity)?;
    Ok(())
}
