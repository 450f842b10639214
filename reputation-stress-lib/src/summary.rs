//! Final run statistics.
//!
//! Pure arithmetic over a finished [`RunReport`]; printing is left to the
//! caller.

use crate::types::{RunReport, RunStatus};
use serde::Serialize;
use std::time::Instant;

/// Aggregate statistics of a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub status: RunStatus,
    pub elapsed_secs: f64,
    pub tasks_submitted: usize,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub hard_failures: u64,
    pub records_written: u64,
    /// Percentage of observed requests that failed; 0 when nothing was observed
    pub error_rate: f64,
    /// Wall-clock time per observed request; `None` when nothing was observed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_latency_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_per_second: Option<f64>,
}

impl RunSummary {
    /// Summarize a report as of now.
    pub fn from_report(report: &RunReport) -> Self {
        Self::at(report, Instant::now())
    }

    /// Summarize a report as of `now`.
    pub fn at(report: &RunReport, now: Instant) -> Self {
        let state = &report.state;
        let elapsed = now.saturating_duration_since(state.started_at).as_secs_f64();
        let total = state.total();

        Self {
            status: report.status,
            elapsed_secs: elapsed,
            tasks_submitted: report.tasks_submitted,
            total_requests: total,
            successful_requests: state.successful_count,
            failed_requests: state.failed_count,
            hard_failures: state.hard_failed_count,
            records_written: state.records_written,
            error_rate: error_rate(state.failed_count, state.successful_count),
            avg_latency_ms: (total > 0).then(|| elapsed / total as f64 * 1000.0),
            requests_per_second: (elapsed > 0.0).then(|| total as f64 / elapsed),
        }
    }
}

/// Failed requests as a percentage of all observed requests.
pub fn error_rate(failed: u64, successful: u64) -> f64 {
    let total = failed + successful;
    if total == 0 {
        return 0.0;
    }
    failed as f64 / total as f64 * 100.0
}
