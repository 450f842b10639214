//! Core data types for stress runs.
//!
//! This module defines the data flowing through the engine: the tasks handed
//! to the worker pool, the classified outcome of each task, the counters the
//! completion loop owns, and the run configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};

/// Default reputation API endpoint; the domain is appended to it.
pub const DEFAULT_API_URL: &str =
    "https://microcks.gin.dev.securingsam.io/rest/Reputation+API/1.0.0/domain/ranking/";

/// Default token sent in the `Authorization: Token ...` header.
pub const DEFAULT_AUTH_TOKEN: &str = "I_am_under_stress_when_I_test";

/// One scheduled unit of work: look up the reputation of `target`.
///
/// Tasks carry no identity beyond their target; the same target is
/// submitted many times on purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub target: String,
}

impl Task {
    pub fn new<T: Into<String>>(target: T) -> Self {
        Self {
            target: target.into(),
        }
    }
}

/// Well-formed response of the reputation service.
///
/// Both fields are raw JSON values since the service may answer with
/// numbers, strings or lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    #[serde(default)]
    pub reputation: Option<Value>,

    #[serde(default)]
    pub categories: Option<Value>,
}

/// Classified result of executing one [`Task`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The lookup returned a well-formed verdict
    Success { target: String, verdict: Verdict },

    /// The lookup completed but reported an error (transport errors included)
    SoftFailure { target: String, error: String },

    /// The worker itself could not be executed or observed
    HardFailure { target: String, error: String },
}

impl Outcome {
    /// The target this outcome was produced for.
    pub fn target(&self) -> &str {
        match self {
            Outcome::Success { target, .. }
            | Outcome::SoftFailure { target, .. }
            | Outcome::HardFailure { target, .. } => target,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

/// One row of the results file.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputRecord {
    pub target: String,
    pub reputation: Option<Value>,
    pub categories: Option<Value>,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every submitted task was observed
    Completed,

    /// The global deadline passed before all tasks were observed
    TimedOut,

    /// The run was cancelled from outside (Ctrl-C)
    Interrupted,
}

impl RunStatus {
    /// Whether the run stopped before observing every task.
    pub fn is_partial(&self) -> bool {
        !matches!(self, RunStatus::Completed)
    }
}

/// Counters owned by the single completion consumer.
///
/// `failed_count` is the sum of soft and hard failures; the split is kept
/// for reporting.
#[derive(Debug, Clone)]
pub struct RunState {
    pub successful_count: u64,
    pub failed_count: u64,
    pub soft_failed_count: u64,
    pub hard_failed_count: u64,
    pub records_written: u64,
    pub started_at: Instant,
}

impl RunState {
    pub fn new(started_at: Instant) -> Self {
        Self {
            successful_count: 0,
            failed_count: 0,
            soft_failed_count: 0,
            hard_failed_count: 0,
            records_written: 0,
            started_at,
        }
    }

    /// Number of outcomes observed so far.
    pub fn total(&self) -> u64 {
        self.successful_count + self.failed_count
    }
}

/// What a finished run hands back to its caller.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub status: RunStatus,
    pub state: RunState,
    pub tasks_submitted: usize,
}

/// Configuration for a stress run.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Maximum number of lookups in flight at once
    /// Default: 10, Range: 1-1000
    pub concurrency: usize,

    /// How many times each domain is submitted
    /// Default: 10
    pub repeat_count: usize,

    /// Global wall-clock budget for the whole run
    /// Default: 60 seconds
    pub timeout: Duration,

    /// Timeout for each individual HTTP request
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// Base URL of the reputation API; the domain is appended
    pub api_url: String,

    /// Token for the `Authorization` header
    pub auth_token: String,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            repeat_count: 10,
            timeout: Duration::from_secs(60),
            request_timeout: Duration::from_secs(30),
            api_url: DEFAULT_API_URL.to_string(),
            auth_token: DEFAULT_AUTH_TOKEN.to_string(),
        }
    }
}

impl StressConfig {
    /// Set concurrency, capped at 1000 to prevent resource exhaustion.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, 1000);
        self
    }

    pub fn with_repeat_count(mut self, repeat_count: usize) -> Self {
        self.repeat_count = repeat_count;
        self
    }

    /// Set the global run timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_api_url<U: Into<String>>(mut self, api_url: U) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_auth_token<T: Into<String>>(mut self, auth_token: T) -> Self {
        self.auth_token = auth_token.into();
        self
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Completed => write!(f, "Completed"),
            RunStatus::TimedOut => write!(f, "Timed out"),
            RunStatus::Interrupted => write!(f, "Interrupted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_is_clamped() {
        assert_eq!(StressConfig::default().with_concurrency(0).concurrency, 1);
        assert_eq!(
            StressConfig::default().with_concurrency(5000).concurrency,
            1000
        );
        assert_eq!(StressConfig::default().with_concurrency(25).concurrency, 25);
    }

    #[test]
    fn test_verdict_ignores_unknown_fields() {
        let verdict: Verdict = serde_json::from_str(
            r#"{"domain":"example.com","reputation":87,"categories":["news"]}"#,
        )
        .unwrap();
        assert_eq!(verdict.reputation, Some(serde_json::json!(87)));
        assert_eq!(verdict.categories, Some(serde_json::json!(["news"])));
    }

    #[test]
    fn test_outcome_target() {
        let outcome = Outcome::HardFailure {
            target: "example.com".to_string(),
            error: "panicked".to_string(),
        };
        assert_eq!(outcome.target(), "example.com");
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_partial_status() {
        assert!(!RunStatus::Completed.is_partial());
        assert!(RunStatus::TimedOut.is_partial());
        assert!(RunStatus::Interrupted.is_partial());
    }
}
