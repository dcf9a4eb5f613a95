//! Supervised processing loop.
//!
//! ```text
//! NotStarted ──start──► Active ◄──────────────┐
//!                         │ process() Err      │ process() Ok
//!                         ▼                    │
//!                     ErrorRetry ──backoff─────┘
//!                         │ consecutive == max
//!                         ▼
//!              StoppedMaxErrors     StoppedClean (stop signal, state left RUNNING)
//! ```
//!
//! Failures below the threshold leave the component `RUNNING`; reaching it
//! escalates to `ERROR` (or `FAILED` when already in `ERROR`).
//!
//! The loop owns nothing but its [`Process`]; everything it observes or
//! reports goes through the shared [`ComponentCore`].

use crate::io::{ComponentCore, ComponentIo};
use crate::Process;
use chrono::{DateTime, Utc};
use harness_component::{ComponentError, ComponentState};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info};

/// Where the processing loop is in its own lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoopState {
    /// No loop has been spawned yet.
    #[default]
    NotStarted,
    /// Iterating; the last call succeeded.
    Active,
    /// The last call failed; waiting out the backoff.
    ErrorRetry,
    /// Ended by a stop signal, or because the component left `RUNNING`.
    StoppedClean,
    /// Gave up after `max_consecutive_errors` failures in a row.
    StoppedMaxErrors,
    /// Cancelled by `stop()` after the bounded wait, or ended by a panic.
    Aborted,
}

impl LoopState {
    /// `true` for the states a loop ends in.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::StoppedClean | Self::StoppedMaxErrors | Self::Aborted
        )
    }
}

/// Command carried to the loop on its control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LoopControl {
    Run,
    Pause,
    Stop,
}

/// Rolling window of the most recent iteration timings.
#[derive(Debug, Clone)]
pub struct ProcessingWindow {
    samples: VecDeque<Duration>,
    capacity: usize,
}

impl ProcessingWindow {
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Duration) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn average(&self) -> Option<Duration> {
        let n = u32::try_from(self.samples.len()).ok().filter(|n| *n > 0)?;
        Some(self.samples.iter().sum::<Duration>() / n)
    }

    #[must_use]
    pub fn min(&self) -> Option<Duration> {
        self.samples.iter().min().copied()
    }

    #[must_use]
    pub fn max(&self) -> Option<Duration> {
        self.samples.iter().max().copied()
    }
}

/// Delay before retry after the `consecutive`-th failure in a row.
///
/// Uses `table[consecutive - 1]`, repeating the last entry once the table
/// runs out. An empty table means no delay.
#[must_use]
pub fn backoff_delay(table: &[Duration], consecutive: u32) -> Duration {
    let index = usize::try_from(consecutive.saturating_sub(1)).unwrap_or(usize::MAX);
    table
        .get(index)
        .or_else(|| table.last())
        .copied()
        .unwrap_or(Duration::ZERO)
}

/// Loop bookkeeping shared with health and performance reads.
#[derive(Debug)]
pub(crate) struct LoopStats {
    pub(crate) state: LoopState,
    pub(crate) iterations: u64,
    pub(crate) consecutive_errors: u32,
    pub(crate) window: ProcessingWindow,
    pub(crate) last_heartbeat: Option<DateTime<Utc>>,
}

impl LoopStats {
    pub(crate) fn new(window: usize) -> Self {
        Self {
            state: LoopState::NotStarted,
            iterations: 0,
            consecutive_errors: 0,
            window: ProcessingWindow::new(window),
            last_heartbeat: None,
        }
    }
}

/// Runs `process` until stopped, out of retries, or the component leaves
/// `RUNNING`/`PAUSED`.
///
/// Failures below `max_consecutive_errors` are only noted against the
/// status; the threshold escalates the lifecycle state and ends the loop.
/// Returns the terminal [`LoopState`], which is also written to the stats.
pub(crate) async fn run_loop(
    core: Arc<ComponentCore>,
    process: Arc<Mutex<Box<dyn Process>>>,
    mut control: watch::Receiver<LoopControl>,
) -> LoopState {
    let name = core.status.name().to_string();
    let io = ComponentIo::supervised(Arc::clone(&core));
    let backoff = core.config.backoff();
    let max_errors = core.config.max_consecutive_errors;

    {
        let mut stats = core.stats.lock();
        stats.state = LoopState::Active;
        stats.consecutive_errors = 0;
    }
    info!(component = %name, "processing loop started");

    let mut worker = process.lock().await;

    let outcome = 'run: loop {
        let command = *control.borrow_and_update();
        if command == LoopControl::Stop {
            break LoopState::StoppedClean;
        }
        let state = core.status.state();
        if command == LoopControl::Pause || state == ComponentState::Paused {
            debug!(component = %name, "processing loop paused");
            if control.changed().await.is_err() {
                break LoopState::StoppedClean;
            }
            continue;
        }
        if state != ComponentState::Running {
            info!(component = %name, %state, "component left RUNNING; processing loop exiting");
            break LoopState::StoppedClean;
        }

        let noted_before = core.noted_failures.load(Ordering::Relaxed);
        let started = Instant::now();
        let result = worker.process(&io).await;
        let elapsed = started.elapsed();

        match result {
            Ok(()) => {
                {
                    let mut stats = core.stats.lock();
                    stats.iterations += 1;
                    stats.consecutive_errors = 0;
                    stats.state = LoopState::Active;
                    stats.window.push(elapsed);
                    stats.last_heartbeat = Some(Utc::now());
                }
                core.status.record_processing(elapsed);
                tokio::task::yield_now().await;
            }
            Err(err) => {
                let consecutive = {
                    let mut stats = core.stats.lock();
                    stats.iterations += 1;
                    stats.consecutive_errors += 1;
                    stats.state = LoopState::ErrorRetry;
                    stats.consecutive_errors
                };
                let context = format!("process() failed ({consecutive}/{max_errors} consecutive)");

                // A stream failure propagated with `?` was noted by the I/O handle.
                let already_noted = matches!(err, ComponentError::StreamOperation { .. })
                    && core.noted_failures.load(Ordering::Relaxed) > noted_before;
                if !already_noted {
                    core.status.note_error(&err, &context);
                }

                if consecutive >= max_errors {
                    let state = core.status.escalate(&context);
                    error!(
                        component = %name,
                        consecutive,
                        %state,
                        "processing loop giving up: {}", err
                    );
                    break LoopState::StoppedMaxErrors;
                }

                let delay = backoff_delay(&backoff, consecutive);
                debug!(component = %name, consecutive, ?delay, "backing off");
                let sleep = tokio::time::sleep(delay);
                tokio::pin!(sleep);
                loop {
                    tokio::select! {
                        // Priority: control first
                        biased;

                        changed = control.changed() => {
                            if changed.is_err() || *control.borrow() == LoopControl::Stop {
                                break 'run LoopState::StoppedClean;
                            }
                        }
                        () = &mut sleep => break,
                    }
                }
            }
        }
    };

    core.stats.lock().state = outcome;
    info!(component = %name, state = ?outcome, "processing loop stopped");
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn backoff_follows_table_then_repeats_last() {
        let table = [ms(100), ms(500), ms(1000), ms(2000), ms(5000)];
        assert_eq!(backoff_delay(&table, 1), ms(100));
        assert_eq!(backoff_delay(&table, 3), ms(1000));
        assert_eq!(backoff_delay(&table, 5), ms(5000));
        assert_eq!(backoff_delay(&table, 9), ms(5000));
    }

    #[test]
    fn backoff_is_non_decreasing() {
        let table = [ms(100), ms(500), ms(1000), ms(2000), ms(5000)];
        let delays: Vec<_> = (1..=8).map(|n| backoff_delay(&table, n)).collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn backoff_edge_cases() {
        assert_eq!(backoff_delay(&[], 3), Duration::ZERO);
        assert_eq!(backoff_delay(&[ms(7)], 0), ms(7));
    }

    #[test]
    fn window_is_bounded_and_summarizes() {
        let mut window = ProcessingWindow::new(3);
        assert!(window.is_empty());
        assert_eq!(window.average(), None);

        for n in [10, 20, 30, 40] {
            window.push(ms(n));
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.min(), Some(ms(20)));
        assert_eq!(window.max(), Some(ms(40)));
        assert_eq!(window.average(), Some(ms(30)));
    }

    #[test]
    fn zero_window_is_clamped() {
        let mut window = ProcessingWindow::new(0);
        window.push(ms(1));
        window.push(ms(2));
        assert_eq!(window.len(), 1);
        assert_eq!(window.max(), Some(ms(2)));
    }

    #[test]
    fn terminal_states() {
        assert!(!LoopState::NotStarted.is_terminal());
        assert!(!LoopState::Active.is_terminal());
        assert!(!LoopState::ErrorRetry.is_terminal());
        assert!(LoopState::StoppedClean.is_terminal());
        assert!(LoopState::StoppedMaxErrors.is_terminal());
        assert!(LoopState::Aborted.is_terminal());
    }
}
