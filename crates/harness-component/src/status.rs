//! Validated state machine, error bookkeeping and supervised recovery.
//!
//! [`ComponentStatus`] is the single source of truth for one component's
//! lifecycle. All mutation goes through one `parking_lot::Mutex`, so
//! concurrent callers observe a total order of transitions and counter
//! updates. The lock is never held across an `.await`.
//!
//! # Two ways back to `Ready`
//!
//! | Path | Method | `recovery_attempts` |
//! |------|--------|---------------------|
//! | Supervised recovery | [`attempt_recovery`](ComponentStatus::attempt_recovery) | incremented, bounded by `max_recovery_attempts` |
//! | Plain restart | [`transition_to`](ComponentStatus::transition_to)`(Ready)` | reset to 0 |
//!
//! A recovered component keeps its attempt count until it next enters
//! `Running`, so repeated recover-then-fail cycles exhaust the budget.

use crate::history::{TransitionHistory, TransitionRecord};
use crate::{ComponentError, ComponentMetrics, ComponentState};
use chrono::{DateTime, Utc};
use harness_types::ErrorCode;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default supervised recovery budget.
pub const DEFAULT_MAX_RECOVERY_ATTEMPTS: u32 = 3;

/// The most recent error recorded against a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// [`ErrorCode::code`] of the error.
    pub code: String,
    /// Display form of the error.
    pub message: String,
    /// Caller-supplied context.
    pub context: String,
    /// [`ErrorCode::is_recoverable`] of the error.
    pub recoverable: bool,
    /// When it was recorded.
    pub timestamp: DateTime<Utc>,
}

/// Full bookkeeping view, as returned by [`ComponentStatus::status_summary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub name: String,
    pub state: ComponentState,
    pub previous_state: Option<ComponentState>,
    pub creation_time: DateTime<Utc>,
    pub last_transition_time: DateTime<Utc>,
    pub error_count: u32,
    pub recovery_attempts: u32,
    pub max_recovery_attempts: u32,
    pub last_error: Option<ErrorRecord>,
    pub transitions_recorded: usize,
    pub metrics: ComponentMetrics,
}

/// Health verdict, as returned by [`ComponentStatus::health_report`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHealth {
    pub name: String,
    pub state: ComponentState,
    pub healthy: bool,
    pub running: bool,
    pub can_start: bool,
    pub error_count: u32,
    pub recovery_attempts: u32,
    pub recovery_budget_remaining: u32,
    pub last_error: Option<ErrorRecord>,
    pub last_activity: Option<DateTime<Utc>>,
    pub uptime: Duration,
}

/// Point-in-time copy of every mutable field.
///
/// Two snapshots compare equal iff no mutation happened between them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: ComponentState,
    pub previous_state: Option<ComponentState>,
    pub last_transition_time: DateTime<Utc>,
    pub error_count: u32,
    pub last_error: Option<ErrorRecord>,
    pub recovery_attempts: u32,
    pub history: Vec<TransitionRecord>,
    pub metrics: ComponentMetrics,
}

/// How a committed transition treats the error counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CounterReset {
    /// Plain transition: entering `Ready`/`Running` clears both counters.
    Plain,
    /// Supervised recovery: clears `error_count`, keeps `recovery_attempts`.
    Recovery,
    /// Error path: counters untouched.
    None,
}

#[derive(Debug)]
struct StatusInner {
    state: ComponentState,
    previous_state: Option<ComponentState>,
    last_transition_time: DateTime<Utc>,
    last_transition_at: Instant,
    error_count: u32,
    last_error: Option<ErrorRecord>,
    recovery_attempts: u32,
    max_recovery_attempts: u32,
    history: TransitionHistory,
    metrics: ComponentMetrics,
}

/// Lifecycle state, error bookkeeping and metrics for one component.
///
/// # Example
///
/// ```
/// use harness_component::{ComponentError, ComponentState, ComponentStatus};
///
/// let status = ComponentStatus::new("ingest");
/// status.transition_to(ComponentState::Ready, "setup").unwrap();
/// status.transition_to(ComponentState::Running, "start").unwrap();
///
/// // Not in the table: rejected, nothing changes.
/// let err = status.transition_to(ComponentState::Created, "rewind").unwrap_err();
/// assert!(matches!(err, ComponentError::InvalidStateTransition { .. }));
/// assert_eq!(status.state(), ComponentState::Running);
///
/// // Errors move the component to ERROR and can be recovered from.
/// status.record_error(&ComponentError::execution("disk full"), "flush");
/// assert_eq!(status.state(), ComponentState::Error);
/// assert!(status.attempt_recovery("operator"));
/// assert_eq!(status.state(), ComponentState::Ready);
/// ```
#[derive(Debug)]
pub struct ComponentStatus {
    name: String,
    creation_time: DateTime<Utc>,
    created_at: Instant,
    inner: Mutex<StatusInner>,
}

impl ComponentStatus {
    /// Creates a status in [`ComponentState::Created`] with the default
    /// recovery budget.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        let instant = Instant::now();
        Self {
            name: name.into(),
            creation_time: now,
            created_at: instant,
            inner: Mutex::new(StatusInner {
                state: ComponentState::Created,
                previous_state: None,
                last_transition_time: now,
                last_transition_at: instant,
                error_count: 0,
                last_error: None,
                recovery_attempts: 0,
                max_recovery_attempts: DEFAULT_MAX_RECOVERY_ATTEMPTS,
                history: TransitionHistory::default(),
                metrics: ComponentMetrics::default(),
            }),
        }
    }

    /// Sets the supervised recovery budget.
    #[must_use]
    pub fn with_max_recovery_attempts(self, max: u32) -> Self {
        self.inner.lock().max_recovery_attempts = max;
        self
    }

    /// Component name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ComponentState {
        self.inner.lock().state
    }

    /// State before the most recent transition.
    #[must_use]
    pub fn previous_state(&self) -> Option<ComponentState> {
        self.inner.lock().previous_state
    }

    /// Moves to `target` if the transition table allows it.
    ///
    /// On success the transition is appended to the history, the activity
    /// timestamp is refreshed and, for `Ready`/`Running` targets, the error
    /// and recovery counters are cleared.
    ///
    /// # Errors
    ///
    /// [`ComponentError::InvalidStateTransition`] when the edge is illegal.
    /// Nothing is mutated in that case.
    pub fn transition_to(
        &self,
        target: ComponentState,
        context: &str,
    ) -> Result<TransitionRecord, ComponentError> {
        let mut inner = self.inner.lock();
        let from = inner.state;
        if !from.can_transition_to(target) {
            debug!(component = %self.name, %from, to = %target, context, "rejected transition");
            return Err(ComponentError::InvalidStateTransition { from, to: target });
        }
        Ok(self.commit(&mut inner, target, context, None, CounterReset::Plain))
    }

    /// Records a failure and moves the component towards `Error`.
    ///
    /// Bookkeeping as [`note_error`](Self::note_error), then
    /// [`escalate`](Self::escalate). Never fails: the caller's control flow
    /// is not affected.
    ///
    /// Returns the state after the call.
    pub fn record_error<E>(&self, error: &E, context: &str) -> ComponentState
    where
        E: ErrorCode + fmt::Display + ?Sized,
    {
        let mut inner = self.inner.lock();
        let message = self.note_locked(&mut inner, error, context);
        self.escalate_locked(&mut inner, context, Some(message))
    }

    /// Counts a failure without touching the lifecycle state.
    ///
    /// Increments `error_count`, stores `last_error` and updates the error
    /// metrics. Used for failures that are retried locally.
    pub fn note_error<E>(&self, error: &E, context: &str)
    where
        E: ErrorCode + fmt::Display + ?Sized,
    {
        let mut inner = self.inner.lock();
        self.note_locked(&mut inner, error, context);
    }

    /// Moves the component towards `Error` without counting a new failure.
    ///
    /// Tries `Error` first, then `Failed`. When neither edge is legal the
    /// state is left alone. Returns the state after the call.
    pub fn escalate(&self, context: &str) -> ComponentState {
        let mut inner = self.inner.lock();
        let message = inner.last_error.as_ref().map(|e| e.message.clone());
        self.escalate_locked(&mut inner, context, message)
    }

    fn note_locked<E>(&self, inner: &mut StatusInner, error: &E, context: &str) -> String
    where
        E: ErrorCode + fmt::Display + ?Sized,
    {
        let now = Utc::now();
        let message = error.to_string();

        inner.error_count = inner.error_count.saturating_add(1);
        inner.last_error = Some(ErrorRecord {
            code: error.code().to_string(),
            message: message.clone(),
            context: context.to_string(),
            recoverable: error.is_recoverable(),
            timestamp: now,
        });
        inner.metrics.record_error(now);

        warn!(
            component = %self.name,
            state = %inner.state,
            code = error.code(),
            error_count = inner.error_count,
            context,
            "error recorded: {}", message
        );
        message
    }

    fn escalate_locked(
        &self,
        inner: &mut StatusInner,
        context: &str,
        message: Option<String>,
    ) -> ComponentState {
        let from = inner.state;
        for target in [ComponentState::Error, ComponentState::Failed] {
            if from.can_transition_to(target) {
                self.commit(inner, target, context, message, CounterReset::None);
                return target;
            }
        }

        warn!(
            component = %self.name,
            state = %from,
            "neither ERROR nor FAILED reachable; state unchanged"
        );
        from
    }

    /// Supervised recovery from `Error`/`Failed` back to `Ready`.
    ///
    /// Returns `false` without mutating anything when the component is not
    /// in a recoverable state or the recovery budget is spent.
    pub fn attempt_recovery(&self, context: &str) -> bool {
        let mut inner = self.inner.lock();
        let from = inner.state;

        if !from.is_recoverable() {
            debug!(component = %self.name, state = %from, "recovery not applicable");
            return false;
        }
        if inner.recovery_attempts >= inner.max_recovery_attempts {
            warn!(
                component = %self.name,
                attempts = inner.recovery_attempts,
                max = inner.max_recovery_attempts,
                "recovery budget exhausted"
            );
            return false;
        }

        inner.recovery_attempts += 1;
        let attempt = inner.recovery_attempts;
        self.commit(
            &mut inner,
            ComponentState::Ready,
            context,
            None,
            CounterReset::Recovery,
        );
        info!(
            component = %self.name,
            attempt,
            max = inner.max_recovery_attempts,
            "recovered from {}", from
        );
        true
    }

    /// Records one successful unit of work that took `elapsed`.
    pub fn record_processing(&self, elapsed: Duration) {
        self.inner.lock().metrics.record_processed(elapsed, Utc::now());
    }

    /// Records one envelope handed to a send endpoint.
    pub fn record_sent(&self) {
        self.inner.lock().metrics.record_sent(Utc::now());
    }

    /// Records one envelope taken from a receive endpoint.
    pub fn record_received(&self) {
        self.inner.lock().metrics.record_received(Utc::now());
    }

    /// `Ready`, `Running` or `Paused`.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.state().is_healthy()
    }

    /// `Running`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == ComponentState::Running
    }

    /// `Ready` or `Stopped`.
    #[must_use]
    pub fn can_start(&self) -> bool {
        self.state().can_start()
    }

    #[must_use]
    pub fn error_count(&self) -> u32 {
        self.inner.lock().error_count
    }

    #[must_use]
    pub fn recovery_attempts(&self) -> u32 {
        self.inner.lock().recovery_attempts
    }

    #[must_use]
    pub fn max_recovery_attempts(&self) -> u32 {
        self.inner.lock().max_recovery_attempts
    }

    #[must_use]
    pub fn last_error(&self) -> Option<ErrorRecord> {
        self.inner.lock().last_error.clone()
    }

    /// Time since construction.
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Copy of the counters with `uptime` filled in.
    #[must_use]
    pub fn metrics(&self) -> ComponentMetrics {
        let mut metrics = self.inner.lock().metrics.clone();
        metrics.uptime = self.uptime();
        metrics
    }

    /// Number of retained transition records.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.inner.lock().history.len()
    }

    /// The newest `n` transitions, oldest first.
    #[must_use]
    pub fn recent_transitions(&self, n: usize) -> Vec<TransitionRecord> {
        self.inner.lock().history.recent(n)
    }

    /// Copies every mutable field under one lock acquisition.
    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        let inner = self.inner.lock();
        StatusSnapshot {
            state: inner.state,
            previous_state: inner.previous_state,
            last_transition_time: inner.last_transition_time,
            error_count: inner.error_count,
            last_error: inner.last_error.clone(),
            recovery_attempts: inner.recovery_attempts,
            history: inner.history.iter().cloned().collect(),
            metrics: inner.metrics.clone(),
        }
    }

    #[must_use]
    pub fn status_summary(&self) -> StatusSummary {
        let uptime = self.uptime();
        let inner = self.inner.lock();
        let mut metrics = inner.metrics.clone();
        metrics.uptime = uptime;
        StatusSummary {
            name: self.name.clone(),
            state: inner.state,
            previous_state: inner.previous_state,
            creation_time: self.creation_time,
            last_transition_time: inner.last_transition_time,
            error_count: inner.error_count,
            recovery_attempts: inner.recovery_attempts,
            max_recovery_attempts: inner.max_recovery_attempts,
            last_error: inner.last_error.clone(),
            transitions_recorded: inner.history.len(),
            metrics,
        }
    }

    #[must_use]
    pub fn health_report(&self) -> StatusHealth {
        let uptime = self.uptime();
        let inner = self.inner.lock();
        StatusHealth {
            name: self.name.clone(),
            state: inner.state,
            healthy: inner.state.is_healthy(),
            running: inner.state == ComponentState::Running,
            can_start: inner.state.can_start(),
            error_count: inner.error_count,
            recovery_attempts: inner.recovery_attempts,
            recovery_budget_remaining: inner
                .max_recovery_attempts
                .saturating_sub(inner.recovery_attempts),
            last_error: inner.last_error.clone(),
            last_activity: inner.metrics.last_activity,
            uptime,
        }
    }

    /// Applies an already validated transition. Caller holds the lock.
    fn commit(
        &self,
        inner: &mut StatusInner,
        target: ComponentState,
        context: &str,
        error: Option<String>,
        reset: CounterReset,
    ) -> TransitionRecord {
        let now = Utc::now();
        let instant = Instant::now();
        let record = TransitionRecord {
            from: inner.state,
            to: target,
            timestamp: now,
            duration: instant.saturating_duration_since(inner.last_transition_at),
            context: context.to_string(),
            error,
        };

        inner.previous_state = Some(inner.state);
        inner.state = target;
        inner.last_transition_time = now;
        inner.last_transition_at = instant;
        inner.metrics.touch(now);

        if target.resets_counters() {
            match reset {
                CounterReset::Plain => {
                    inner.error_count = 0;
                    inner.recovery_attempts = 0;
                }
                CounterReset::Recovery => inner.error_count = 0,
                CounterReset::None => {}
            }
        }

        inner.history.push(record.clone());
        debug!(
            component = %self.name,
            from = %record.from,
            to = %record.to,
            context,
            "state transition"
        );
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TRANSITION_HISTORY_CAPACITY;
    use std::sync::Arc;
    use ComponentState::*;

    /// Drives a fresh status into `target` along legal edges only.
    fn status_in(target: ComponentState) -> ComponentStatus {
        let status = ComponentStatus::new("unit");
        let path: &[ComponentState] = match target {
            Created => &[],
            Ready => &[Ready],
            Running => &[Ready, Running],
            Paused => &[Ready, Running, Paused],
            Stopping => &[Ready, Stopping],
            Stopped => &[Ready, Stopping, Stopped],
            Error => &[Error],
            Failed => &[Failed],
        };
        for step in path {
            status.transition_to(*step, "arrange").unwrap();
        }
        assert_eq!(status.state(), target);
        status
    }

    #[test]
    fn transition_validity_for_every_pair() {
        for from in ComponentState::ALL {
            for to in ComponentState::ALL {
                let status = status_in(from);
                let before = status.snapshot();
                let result = status.transition_to(to, "unit");

                if from.can_transition_to(to) {
                    let record = result.unwrap();
                    assert_eq!((record.from, record.to), (from, to));
                    assert_eq!(status.state(), to);
                    assert_eq!(status.previous_state(), Some(from));
                    assert_eq!(status.history_len(), before.history.len() + 1);
                } else {
                    assert_eq!(
                        result.unwrap_err(),
                        ComponentError::InvalidStateTransition { from, to }
                    );
                    assert_eq!(status.snapshot(), before, "{from} -> {to} mutated");
                }
            }
        }
    }

    #[test]
    fn record_error_prefers_error_then_failed() {
        let err = ComponentError::execution("boom");

        let running = status_in(Running);
        assert_eq!(running.record_error(&err, "loop"), Error);
        // ERROR -> ERROR is illegal, so a second error escalates.
        assert_eq!(running.record_error(&err, "loop"), Failed);
        // FAILED accepts neither; state holds, bookkeeping still moves.
        assert_eq!(running.record_error(&err, "loop"), Failed);
        assert_eq!(running.error_count(), 3);
        assert_eq!(running.metrics().errors, 3);

        let stopped = status_in(Stopped);
        assert_eq!(stopped.record_error(&err, "late"), Failed);
    }

    #[test]
    fn note_error_keeps_state() {
        let status = status_in(Running);
        let before = status.history_len();
        status.note_error(&ComponentError::execution("transient"), "loop");

        assert_eq!(status.state(), Running);
        assert_eq!(status.history_len(), before);
        assert_eq!(status.error_count(), 1);
        assert_eq!(status.metrics().errors, 1);
        assert_eq!(status.last_error().unwrap().context, "loop");
    }

    #[test]
    fn escalate_does_not_count_again() {
        let status = status_in(Running);
        status.note_error(&ComponentError::execution("fifth in a row"), "loop");

        assert_eq!(status.escalate("giving up"), Error);
        assert_eq!(status.error_count(), 1);
        let record = status.recent_transitions(1).pop().unwrap();
        assert_eq!(record.error.as_deref(), Some("execution failed: fifth in a row"));

        assert_eq!(status.escalate("again"), Failed);
        assert_eq!(status_in(Failed).escalate("held"), Failed);
    }

    #[test]
    fn record_error_stores_last_error() {
        let status = status_in(Running);
        status.record_error(&ComponentError::stream("out", "timed out"), "send");

        let last = status.last_error().unwrap();
        assert_eq!(last.code, "COMPONENT_STREAM_OPERATION");
        assert_eq!(last.context, "send");
        assert!(last.recoverable);
        assert!(last.message.contains("timed out"));

        let record = status.recent_transitions(1).pop().unwrap();
        assert_eq!(record.to, Error);
        assert!(record.error.is_some());
    }

    #[test]
    fn plain_transition_to_ready_resets_counters() {
        let status = status_in(Running);
        status.record_error(&ComponentError::execution("x"), "loop");
        assert_eq!(status.error_count(), 1);

        status.transition_to(Ready, "operator restart").unwrap();
        assert_eq!(status.error_count(), 0);
        assert_eq!(status.recovery_attempts(), 0);
    }

    #[test]
    fn bounded_recovery_from_failed() {
        let status = ComponentStatus::new("unit").with_max_recovery_attempts(3);
        status.transition_to(Failed, "arrange").unwrap();

        let mut successes = 0;
        for attempt in 1..=4 {
            let before = status.snapshot();
            if status.attempt_recovery("supervisor") {
                successes += 1;
                assert_eq!(status.state(), Ready);
                assert_eq!(status.recovery_attempts(), attempt);
                status.transition_to(Failed, "fails again").unwrap();
            } else {
                assert_eq!(attempt, 4);
                assert_eq!(status.snapshot(), before);
            }
        }
        assert_eq!(successes, 3);
        assert_eq!(status.state(), Failed);
    }

    #[test]
    fn recovery_keeps_attempts_until_running() {
        let status = status_in(Error);
        assert!(status.attempt_recovery("supervisor"));
        assert_eq!(status.recovery_attempts(), 1);
        assert_eq!(status.error_count(), 0);

        status.transition_to(Running, "start").unwrap();
        assert_eq!(status.recovery_attempts(), 0);
    }

    #[test]
    fn recovery_rejected_outside_error_states() {
        for state in [Created, Ready, Running, Paused, Stopping, Stopped] {
            let status = status_in(state);
            let before = status.snapshot();
            assert!(!status.attempt_recovery("supervisor"));
            assert_eq!(status.snapshot(), before);
        }
    }

    #[test]
    fn zero_budget_never_recovers() {
        let status = ComponentStatus::new("unit").with_max_recovery_attempts(0);
        status.transition_to(Error, "arrange").unwrap();
        assert!(!status.attempt_recovery("supervisor"));
        assert_eq!(status.state(), Error);
    }

    #[test]
    fn concurrent_mutation_stays_in_table() {
        let status = Arc::new(status_in(Running));
        let targets = ComponentState::ALL;

        std::thread::scope(|scope| {
            for worker in 0..8 {
                let status = Arc::clone(&status);
                scope.spawn(move || {
                    for i in 0..500 {
                        match (worker + i) % 3 {
                            0 => {
                                let _ = status.transition_to(targets[(worker * 7 + i) % 8], "race");
                            }
                            1 => {
                                status.record_error(&ComponentError::execution("race"), "race");
                            }
                            _ => {
                                status.attempt_recovery("race");
                            }
                        }
                        assert!(status.history_len() <= TRANSITION_HISTORY_CAPACITY);
                    }
                });
            }
        });

        let history = status.recent_transitions(TRANSITION_HISTORY_CAPACITY);
        assert!(history.len() <= TRANSITION_HISTORY_CAPACITY);
        for pair in history.windows(2) {
            assert_eq!(pair[0].to, pair[1].from, "history must be a chain");
        }
        for record in &history {
            assert!(record.from.can_transition_to(record.to));
        }
        assert_eq!(history.last().map(|r| r.to), Some(status.state()));
    }

    #[test]
    fn health_and_summary_reflect_state() {
        let status = ComponentStatus::new("reporter").with_max_recovery_attempts(2);
        let health = status.health_report();
        assert_eq!(health.state, Created);
        assert!(!health.healthy);
        assert_eq!(health.recovery_budget_remaining, 2);

        status.transition_to(Ready, "setup").unwrap();
        status.transition_to(Running, "start").unwrap();
        status.record_processing(Duration::from_millis(4));
        status.record_sent();

        let health = status.health_report();
        assert!(health.healthy);
        assert!(health.running);
        assert!(health.last_activity.is_some());

        let summary = status.status_summary();
        assert_eq!(summary.name, "reporter");
        assert_eq!(summary.previous_state, Some(Ready));
        assert_eq!(summary.transitions_recorded, 2);
        assert_eq!(summary.metrics.messages_processed, 1);
        assert_eq!(summary.metrics.messages_sent, 1);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["state"], "RUNNING");
    }

    #[test]
    fn transition_record_measures_time_in_state() {
        let status = ComponentStatus::new("timer");
        status.transition_to(Ready, "setup").unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let record = status.transition_to(Running, "start").unwrap();
        assert!(record.duration >= Duration::from_millis(5));
    }
}
