//! Bounded worker pool for reputation lookups.
//!
//! Every task is spawned onto the tokio runtime up front, but a task only
//! calls the lookup after taking one of `concurrency` semaphore permits, so
//! the number of requests in flight never exceeds the configured bound.
//! Finished tasks are handed out one at a time, in completion order, to a
//! single consumer.

use crate::protocols::ReputationLookup;
use crate::types::{Outcome, Task};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::debug;

/// Executes lookups with parallelism capped at a fixed limit.
///
/// Must be used from within a tokio runtime.
pub struct WorkerPool {
    lookup: Arc<dyn ReputationLookup>,
    /// Admission control: one permit per lookup in flight
    permits: Arc<Semaphore>,
    concurrency: usize,
    workers: JoinSet<Outcome>,
    /// Target of every worker not yet drained, so a worker that dies can
    /// still be attributed
    targets: HashMap<Id, String>,
    shut_down: bool,
}

impl WorkerPool {
    /// Create a pool running at most `concurrency` lookups at once.
    ///
    /// A concurrency of zero is treated as one.
    pub fn new(lookup: Arc<dyn ReputationLookup>, concurrency: usize) -> Self {
        let concurrency = concurrency.max(1);

        Self {
            lookup,
            permits: Arc::new(Semaphore::new(concurrency)),
            concurrency,
            workers: JoinSet::new(),
            targets: HashMap::new(),
            shut_down: false,
        }
    }

    /// Configured concurrency bound.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Enqueue every task for execution.
    ///
    /// Tasks start as soon as a permit frees up; there is no ordering
    /// guarantee between them. Submitting after [`shutdown`](Self::shutdown)
    /// does nothing.
    pub fn submit_all<I>(&mut self, tasks: I)
    where
        I: IntoIterator<Item = Task>,
    {
        if self.shut_down {
            return;
        }

        for task in tasks {
            let target = task.target.clone();
            let lookup = Arc::clone(&self.lookup);
            let permits = Arc::clone(&self.permits);

            let handle = self.workers.spawn(async move {
                // Closed semaphore means the pool was shut down before this task got a slot
                let Ok(_permit) = permits.acquire_owned().await else {
                    return Outcome::HardFailure {
                        target: task.target,
                        error: "pool shut down before the task started".to_string(),
                    };
                };

                match lookup.lookup(&task.target).await {
                    Ok(verdict) => Outcome::Success {
                        target: task.target,
                        verdict,
                    },
                    Err(e) => Outcome::SoftFailure {
                        target: task.target,
                        error: e.to_string(),
                    },
                }
            });

            self.targets.insert(handle.id(), target);
        }

        debug!(
            submitted = self.targets.len(),
            concurrency = self.concurrency,
            "tasks submitted to pool"
        );
    }

    /// Wait for the next task to finish and return its outcome.
    ///
    /// Returns `None` once every submitted task has been drained, or after
    /// the pool was shut down. Cancel safe: dropping the returned future
    /// never loses an outcome.
    pub async fn next_completed(&mut self) -> Option<Outcome> {
        if self.shut_down {
            return None;
        }

        let joined = self.workers.join_next_with_id().await?;

        Some(match joined {
            Ok((id, outcome)) => {
                self.targets.remove(&id);
                outcome
            }
            Err(err) => {
                let target = self.targets.remove(&err.id()).unwrap_or_default();
                Outcome::HardFailure {
                    target,
                    error: describe_join_error(err),
                }
            }
        })
    }

    /// Stop the pool.
    ///
    /// With `cancel_pending`, tasks that have not started yet never call the
    /// lookup, and tasks already in flight are left to finish in the
    /// background with their results discarded. Without it, waits for every
    /// task to finish and discards the results.
    pub async fn shutdown(&mut self, cancel_pending: bool) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if cancel_pending {
            self.permits.close();
            self.workers.detach_all();
        } else {
            while self.workers.join_next().await.is_some() {}
        }

        self.targets.clear();
        debug!(cancel_pending, "worker pool shut down");
    }

    /// Number of lookups currently running.
    pub fn in_flight(&self) -> usize {
        if self.permits.is_closed() {
            return 0;
        }
        self.concurrency - self.permits.available_permits()
    }

    /// Number of submitted tasks not yet handed to the consumer.
    pub fn pending(&self) -> usize {
        self.workers.len()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

/// Human-readable reason a worker could not be observed.
fn describe_join_error(err: JoinError) -> String {
    if err.is_cancelled() {
        return "worker was cancelled before completing".to_string();
    }

    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("worker panicked: {}", message)
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("worker panicked: {}", message)
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StressError;
    use crate::types::Verdict;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers based on the domain name: `soft.*` errors, `panic.*` panics,
    /// everything else succeeds.
    struct NamedLookup;

    #[async_trait]
    impl ReputationLookup for NamedLookup {
        async fn lookup(&self, domain: &str) -> Result<Verdict, StressError> {
            if domain.starts_with("soft.") {
                Err(StressError::reported(domain, "unknown domain"))
            } else if domain.starts_with("panic.") {
                panic!("lookup exploded");
            } else {
                Ok(Verdict::default())
            }
        }
    }

    struct CountingLookup {
        calls: AtomicUsize,
        delay: Duration,
    }

    #[async_trait]
    impl ReputationLookup for CountingLookup {
        async fn lookup(&self, _domain: &str) -> Result<Verdict, StressError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(Verdict::default())
        }
    }

    async fn drain(pool: &mut WorkerPool) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = pool.next_completed().await {
            outcomes.push(outcome);
        }
        outcomes
    }

    #[tokio::test]
    async fn test_outcomes_are_classified() {
        let mut pool = WorkerPool::new(Arc::new(NamedLookup), 2);
        pool.submit_all(vec![
            Task::new("ok.com"),
            Task::new("soft.com"),
            Task::new("panic.com"),
        ]);

        let outcomes = drain(&mut pool).await;
        assert_eq!(outcomes.len(), 3);

        for outcome in outcomes {
            match outcome.target() {
                "ok.com" => assert!(matches!(outcome, Outcome::Success { .. })),
                "soft.com" => assert!(matches!(outcome, Outcome::SoftFailure { .. })),
                "panic.com" => match outcome {
                    Outcome::HardFailure { error, .. } => {
                        assert!(error.contains("lookup exploded"), "{error}")
                    }
                    other => panic!("expected hard failure, got {other:?}"),
                },
                other => panic!("unexpected target {other}"),
            }
        }
    }

    #[tokio::test]
    async fn test_exhaustion_returns_none() {
        let mut pool = WorkerPool::new(Arc::new(NamedLookup), 1);
        pool.submit_all(vec![Task::new("ok.com")]);

        assert!(pool.next_completed().await.is_some());
        assert!(pool.next_completed().await.is_none());
        assert!(pool.next_completed().await.is_none());
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_one() {
        let pool = WorkerPool::new(Arc::new(NamedLookup), 0);
        assert_eq!(pool.concurrency(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_pending_tasks() {
        let lookup = Arc::new(CountingLookup {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(200),
        });
        let mut pool = WorkerPool::new(lookup.clone(), 1);
        pool.submit_all((0..10).map(|i| Task::new(format!("site{}.com", i))));

        // Let the first task take the only permit
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(pool.in_flight(), 1);
        assert_eq!(pool.pending(), 10);

        pool.shutdown(true).await;

        assert!(pool.is_shut_down());
        assert_eq!(pool.in_flight(), 0);
        assert!(pool.next_completed().await.is_none());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_without_cancel_waits_for_drain() {
        let lookup = Arc::new(CountingLookup {
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(10),
        });
        let mut pool = WorkerPool::new(lookup.clone(), 2);
        pool.submit_all((0..6).map(|i| Task::new(format!("site{}.com", i))));

        pool.shutdown(false).await;

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 6);
        assert_eq!(pool.pending(), 0);
        assert!(pool.next_completed().await.is_none());
    }
}
