//! Bounded transition history.

use crate::ComponentState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

/// Number of transitions retained per component.
pub const TRANSITION_HISTORY_CAPACITY: usize = 100;

/// One accepted state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// State left.
    pub from: ComponentState,
    /// State entered.
    pub to: ComponentState,
    /// Wall-clock time of the change.
    pub timestamp: DateTime<Utc>,
    /// Time spent in `from` before this change.
    pub duration: Duration,
    /// Caller-supplied reason.
    pub context: String,
    /// Error message when the change was driven by `record_error`.
    pub error: Option<String>,
}

/// Fixed-capacity ring of [`TransitionRecord`]s, oldest dropped first.
///
/// ```
/// use harness_component::{ComponentState, TransitionHistory, TransitionRecord};
/// use std::time::Duration;
///
/// let mut history = TransitionHistory::with_capacity(2);
/// for context in ["a", "b", "c"] {
///     history.push(TransitionRecord {
///         from: ComponentState::Created,
///         to: ComponentState::Ready,
///         timestamp: chrono::Utc::now(),
///         duration: Duration::ZERO,
///         context: context.into(),
///         error: None,
///     });
/// }
/// let kept: Vec<_> = history.iter().map(|r| r.context.as_str()).collect();
/// assert_eq!(kept, ["b", "c"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionHistory {
    records: VecDeque<TransitionRecord>,
    capacity: usize,
}

impl TransitionHistory {
    /// Creates an empty history holding at most `capacity` records.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a record, evicting the oldest one when full.
    pub fn push(&mut self, record: TransitionRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Number of records retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Maximum number of records retained.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &TransitionRecord> + '_ {
        self.records.iter()
    }

    /// Most recent record, if any.
    #[must_use]
    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.back()
    }

    /// Clones the newest `n` records, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<TransitionRecord> {
        let skip = self.records.len().saturating_sub(n);
        self.records.iter().skip(skip).cloned().collect()
    }
}

impl Default for TransitionHistory {
    fn default() -> Self {
        Self::with_capacity(TRANSITION_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(context: &str) -> TransitionRecord {
        TransitionRecord {
            from: ComponentState::Ready,
            to: ComponentState::Running,
            timestamp: Utc::now(),
            duration: Duration::from_millis(1),
            context: context.to_string(),
            error: None,
        }
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut history = TransitionHistory::default();
        for i in 0..(TRANSITION_HISTORY_CAPACITY * 2 + 7) {
            history.push(record(&i.to_string()));
            assert!(history.len() <= TRANSITION_HISTORY_CAPACITY);
        }
        assert_eq!(history.len(), TRANSITION_HISTORY_CAPACITY);
    }

    #[test]
    fn evicts_oldest_first() {
        let mut history = TransitionHistory::with_capacity(3);
        for ctx in ["1", "2", "3", "4"] {
            history.push(record(ctx));
        }
        let kept: Vec<_> = history.iter().map(|r| r.context.clone()).collect();
        assert_eq!(kept, vec!["2", "3", "4"]);
        assert_eq!(history.last().map(|r| r.context.as_str()), Some("4"));
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let mut history = TransitionHistory::with_capacity(10);
        for ctx in ["a", "b", "c", "d"] {
            history.push(record(ctx));
        }
        let tail: Vec<_> = history.recent(2).into_iter().map(|r| r.context).collect();
        assert_eq!(tail, vec!["c", "d"]);
        assert_eq!(history.recent(99).len(), 4);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut history = TransitionHistory::with_capacity(0);
        history.push(record("x"));
        history.push(record("y"));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
    }
}
