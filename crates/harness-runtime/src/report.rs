//! Health and performance reports.

use crate::runner::LoopState;
use crate::stream::EndpointInfo;
use chrono::{DateTime, Utc};
use harness_component::{ComponentState, StatusHealth};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Result of [`HarnessComponent::health_check`](crate::HarnessComponent::health_check).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Verdict from the component's status.
    #[serde(flatten)]
    pub status: StatusHealth,
    pub loop_state: LoopState,
    /// A loop task exists and has not finished.
    pub loop_active: bool,
    pub consecutive_errors: u32,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub send_endpoints: Vec<EndpointInfo>,
    pub receive_endpoints: Vec<EndpointInfo>,
}

/// Result of
/// [`HarnessComponent::get_performance_metrics`](crate::HarnessComponent::get_performance_metrics).
///
/// Timing figures are taken over the rolling processing window and are
/// `None` until the first successful iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub name: String,
    pub state: ComponentState,
    pub loop_state: LoopState,
    /// `process()` calls, successful or not.
    pub iterations: u64,
    pub consecutive_errors: u32,
    pub avg_processing_time: Option<Duration>,
    pub min_processing_time: Option<Duration>,
    pub max_processing_time: Option<Duration>,
    pub messages_processed: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub errors: u64,
    /// Messages moved through currently registered endpoints.
    pub endpoint_messages: u64,
    pub send_endpoint_count: usize,
    pub receive_endpoint_count: usize,
    pub uptime: Duration,
    pub last_heartbeat: Option<DateTime<Utc>>,
}
