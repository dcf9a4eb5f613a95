//! Per-component counters.
//!
//! [`ComponentMetrics`] is owned by [`ComponentStatus`](crate::ComponentStatus)
//! and only mutated through it. Callers receive copies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Activity and throughput counters for one component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetrics {
    /// Successful `process()` iterations.
    pub messages_processed: u64,
    /// Envelopes delivered to a send endpoint.
    pub messages_sent: u64,
    /// Envelopes taken from a receive endpoint.
    pub messages_received: u64,
    /// Errors recorded through `record_error`.
    pub errors: u64,
    /// Last time anything observable happened.
    pub last_activity: Option<DateTime<Utc>>,
    /// Running mean of processing durations.
    pub average_processing_time: Duration,
    /// Time since the component was created. Filled in on read.
    pub uptime: Duration,
}

impl ComponentMetrics {
    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        self.last_activity = Some(at);
    }

    pub(crate) fn record_processed(&mut self, elapsed: Duration, at: DateTime<Utc>) {
        self.messages_processed += 1;
        // Incremental mean: avoids keeping every sample.
        let n = self.messages_processed as f64;
        let mean = self.average_processing_time.as_secs_f64();
        let next = mean + (elapsed.as_secs_f64() - mean) / n;
        self.average_processing_time = Duration::from_secs_f64(next.max(0.0));
        self.touch(at);
    }

    pub(crate) fn record_sent(&mut self, at: DateTime<Utc>) {
        self.messages_sent += 1;
        self.touch(at);
    }

    pub(crate) fn record_received(&mut self, at: DateTime<Utc>) {
        self.messages_received += 1;
        self.touch(at);
    }

    pub(crate) fn record_error(&mut self, at: DateTime<Utc>) {
        self.errors += 1;
        self.touch(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_mean_of_processing_time() {
        let mut metrics = ComponentMetrics::default();
        let now = Utc::now();
        for ms in [10, 20, 30, 40] {
            metrics.record_processed(Duration::from_millis(ms), now);
        }
        assert_eq!(metrics.messages_processed, 4);
        let avg_ms = metrics.average_processing_time.as_secs_f64() * 1000.0;
        assert!((avg_ms - 25.0).abs() < 1e-6, "avg was {avg_ms}");
    }

    #[test]
    fn counters_update_activity() {
        let mut metrics = ComponentMetrics::default();
        assert!(metrics.last_activity.is_none());

        let now = Utc::now();
        metrics.record_sent(now);
        metrics.record_received(now);
        metrics.record_error(now);

        assert_eq!(metrics.messages_sent, 1);
        assert_eq!(metrics.messages_received, 1);
        assert_eq!(metrics.errors, 1);
        assert_eq!(metrics.last_activity, Some(now));
    }
}
