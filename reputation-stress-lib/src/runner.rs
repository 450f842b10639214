//! Stress run orchestration.
//!
//! This module provides [`StressRunner`], which submits a task set to a
//! [`WorkerPool`], drains completions as they arrive, and stops the run
//! when every task is observed, the global deadline passes, or an external
//! cancellation fires.

use crate::concurrent::WorkerPool;
use crate::error::StressError;
use crate::protocols::{ReputationClient, ReputationLookup};
use crate::sink::{OutcomeSink, Recorder};
use crate::types::{Outcome, RunReport, RunState, RunStatus, StressConfig, Task};
use crate::utils::build_task_set;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Timeouts at or beyond this are treated as no deadline at all.
const UNBOUNDED_TIMEOUT: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// Drives one stress run at a time.
///
/// # Example
///
/// ```rust,no_run
/// use reputation_stress_lib::{CsvSink, StressConfig, StressRunner};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let runner = StressRunner::new(StressConfig::default())?;
///     let mut sink = CsvSink::create("results.csv")?;
///     let targets = vec!["example.com".to_string()];
///
///     let report = runner
///         .run_targets(&targets, &mut sink, &CancellationToken::new())
///         .await?;
///     println!("{}: {} requests", report.status, report.state.total());
///     Ok(())
/// }
/// ```
pub struct StressRunner {
    /// Configuration settings for this runner
    config: StressConfig,
    /// Remote call executed once per task
    lookup: Arc<dyn ReputationLookup>,
}

enum Step {
    Observed(Outcome),
    Exhausted,
    DeadlinePassed,
    Cancelled,
}

impl StressRunner {
    /// Create a runner calling the HTTP reputation API.
    pub fn new(config: StressConfig) -> Result<Self, StressError> {
        let client = ReputationClient::from_config(&config)?;
        Ok(Self::with_lookup(config, Arc::new(client)))
    }

    /// Create a runner with a custom lookup implementation.
    pub fn with_lookup(config: StressConfig, lookup: Arc<dyn ReputationLookup>) -> Self {
        Self { config, lookup }
    }

    pub fn config(&self) -> &StressConfig {
        &self.config
    }

    /// Build the task set from `targets` and run it.
    ///
    /// Nothing is started and nothing is written when the task set cannot be
    /// built.
    pub async fn run_targets<S: OutcomeSink + ?Sized>(
        &self,
        targets: &[String],
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<RunReport, StressError> {
        let tasks = build_task_set(targets, self.config.repeat_count)?;
        self.run(tasks, sink, cancel).await
    }

    /// Run `tasks` to completion, timeout, or cancellation.
    ///
    /// Every outcome handed out by the pool is recorded before the deadline
    /// and the cancellation token are looked at again, so a partial run keeps
    /// everything observed so far. Once the run stops early, tasks that have
    /// not started are abandoned and results of tasks still in flight are
    /// discarded.
    ///
    /// # Errors
    ///
    /// - [`StressError::NoTargets`] for an empty task list (no pool is started)
    /// - [`StressError::Output`] when the sink fails; the pool is shut down first
    pub async fn run<S: OutcomeSink + ?Sized>(
        &self,
        tasks: Vec<Task>,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<RunReport, StressError> {
        if tasks.is_empty() {
            return Err(StressError::NoTargets);
        }

        let timeout = self.config.timeout;
        let tasks_submitted = tasks.len();

        let mut pool = WorkerPool::new(Arc::clone(&self.lookup), self.config.concurrency);
        let started_at = Instant::now();
        let deadline = deadline_for(started_at, timeout);
        pool.submit_all(tasks);

        info!(
            tasks = tasks_submitted,
            concurrency = pool.concurrency(),
            timeout_secs = timeout.as_secs_f64(),
            "stress run started"
        );

        let mut recorder = Recorder::new(sink, RunState::new(started_at));

        let status = loop {
            let step = tokio::select! {
                biased;
                next = pool.next_completed() => match next {
                    Some(outcome) => Step::Observed(outcome),
                    None => Step::Exhausted,
                },
                _ = cancel.cancelled() => Step::Cancelled,
                _ = wait_for_deadline(deadline) => Step::DeadlinePassed,
            };

            match step {
                Step::Observed(outcome) => {
                    if let Err(e) = recorder.record(outcome) {
                        pool.shutdown(true).await;
                        return Err(e);
                    }

                    if deadline_exceeded(started_at, timeout) {
                        break RunStatus::TimedOut;
                    }
                    if cancel.is_cancelled() {
                        break RunStatus::Interrupted;
                    }
                }
                Step::Exhausted => break RunStatus::Completed,
                Step::DeadlinePassed => break RunStatus::TimedOut,
                Step::Cancelled => break RunStatus::Interrupted,
            }
        };

        if status.is_partial() {
            pool.shutdown(true).await;
        }

        recorder.flush()?;
        let state = recorder.into_state();
        match status {
            RunStatus::Completed => info!(observed = state.total(), "stress run completed"),
            RunStatus::TimedOut => warn!(
                observed = state.total(),
                abandoned = tasks_submitted as u64 - state.total(),
                "timeout reached, remaining tasks abandoned"
            ),
            RunStatus::Interrupted => warn!(
                observed = state.total(),
                "stress run interrupted, remaining tasks abandoned"
            ),
        }

        Ok(RunReport {
            status,
            state,
            tasks_submitted,
        })
    }
}

fn deadline_exceeded(started_at: Instant, timeout: Duration) -> bool {
    started_at.elapsed() > timeout
}

/// Instant the run must stop at, or `None` when the timeout is too large to
/// ever be reached.
fn deadline_for(started_at: Instant, timeout: Duration) -> Option<tokio::time::Instant> {
    if timeout >= UNBOUNDED_TIMEOUT {
        return None;
    }
    started_at
        .checked_add(timeout)
        .map(tokio::time::Instant::from_std)
}

async fn wait_for_deadline(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MemorySink;
    use crate::types::Verdict;
    use async_trait::async_trait;

    struct SleepyLookup(Duration);

    #[async_trait]
    impl ReputationLookup for SleepyLookup {
        async fn lookup(&self, _domain: &str) -> Result<Verdict, StressError> {
            tokio::time::sleep(self.0).await;
            Ok(Verdict::default())
        }
    }

    fn runner(delay: Duration, concurrency: usize, timeout: Duration) -> StressRunner {
        let config = StressConfig::default()
            .with_concurrency(concurrency)
            .with_repeat_count(1)
            .with_timeout(timeout);
        StressRunner::with_lookup(config, Arc::new(SleepyLookup(delay)))
    }

    #[tokio::test]
    async fn test_empty_task_list_is_rejected() {
        let runner = runner(Duration::ZERO, 1, Duration::from_secs(1));
        let mut sink = MemorySink::new();

        let result = runner
            .run(Vec::new(), &mut sink, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(StressError::NoTargets)));
        assert!(sink.records.is_empty());
    }

    #[tokio::test]
    async fn test_completed_run() {
        let runner = runner(Duration::from_millis(5), 2, Duration::from_secs(10));
        let mut sink = MemorySink::new();
        let tasks = (0..4).map(|i| Task::new(format!("site{}.com", i))).collect();

        let report = runner
            .run(tasks, &mut sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.tasks_submitted, 4);
        assert_eq!(report.state.successful_count, 4);
        assert_eq!(sink.records.len(), 4);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_is_interrupted() {
        let runner = runner(Duration::from_secs(5), 1, Duration::from_secs(30));
        let mut sink = MemorySink::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = runner
            .run(vec![Task::new("a.com")], &mut sink, &cancel)
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Interrupted);
        assert_eq!(report.state.total(), 0);
    }

    #[test]
    fn test_deadline_exceeded() {
        let started = Instant::now() - Duration::from_secs(2);
        assert!(deadline_exceeded(started, Duration::from_secs(1)));
        assert!(!deadline_exceeded(Instant::now(), Duration::from_secs(60)));
    }

    #[test]
    fn test_huge_timeout_has_no_deadline() {
        let now = Instant::now();
        assert!(deadline_for(now, Duration::from_secs(u64::MAX)).is_none());
        assert!(deadline_for(now, Duration::MAX).is_none());
        assert!(deadline_for(now, Duration::from_secs(60)).is_some());
    }

    #[tokio::test]
    async fn test_run_with_maximum_timeout_completes() {
        let runner = runner(
            Duration::from_millis(5),
            2,
            Duration::from_secs(u64::MAX),
        );
        let mut sink = MemorySink::new();

        let report = runner
            .run(vec![Task::new("a.com")], &mut sink, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.state.successful_count, 1);
        assert_eq!(sink.records.len(), 1);
    }
}
