//! Utility functions for building the task set and validating targets.
//!
//! Nothing in here touches the runtime; these are pure helpers used before a
//! run starts.

use crate::error::StressError;
use crate::types::Task;
use std::collections::HashSet;

/// Largest task set a single run accepts.
pub const MAX_TASKS: usize = 10_000_000;

/// Expand distinct targets into the flat task list of a run.
///
/// Every target is repeated `repeat_count` times, block-wise and in input
/// order, so the result holds exactly `targets.len() * repeat_count` tasks.
/// Targets are trimmed; blank entries and repeated entries are dropped first.
///
/// # Errors
///
/// - [`StressError::NoTargets`] when no usable target remains
/// - [`StressError::InvalidInput`] when `repeat_count` is zero, or the task
///   set would exceed [`MAX_TASKS`]
///
/// # Example
///
/// ```rust
/// use reputation_stress_lib::build_task_set;
///
/// let targets = vec!["a.com".to_string(), "b.com".to_string()];
/// let tasks = build_task_set(&targets, 3).unwrap();
/// assert_eq!(tasks.len(), 6);
/// ```
pub fn build_task_set(targets: &[String], repeat_count: usize) -> Result<Vec<Task>, StressError> {
    let targets = distinct_targets(targets);

    if targets.is_empty() {
        return Err(StressError::NoTargets);
    }

    if repeat_count == 0 {
        return Err(StressError::invalid_input(
            "Repeat count must be at least 1",
        ));
    }

    let total = targets
        .len()
        .checked_mul(repeat_count)
        .filter(|total| *total <= MAX_TASKS)
        .ok_or_else(|| {
            StressError::invalid_input(format!(
                "{} domains repeated {} times exceeds the limit of {} requests",
                targets.len(),
                repeat_count,
                MAX_TASKS
            ))
        })?;

    let mut tasks = Vec::with_capacity(total);
    for target in targets {
        tasks.extend(std::iter::repeat_with(|| Task::new(target)).take(repeat_count));
    }

    Ok(tasks)
}

/// Trim targets and drop blanks and duplicates, keeping first occurrences.
pub fn distinct_targets(targets: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();

    targets
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(*t))
        .collect()
}

/// Validate that a domain name has a usable structure.
///
/// This is a syntactic check only; the service decides whether it knows the
/// domain.
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.len() < 4 || domain.len() > 253 {
        return false;
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return false;
    }

    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() < 2 {
        return false;
    }

    parts.iter().all(|part| {
        !part.is_empty()
            && part.len() <= 63
            && !part.starts_with('-')
            && !part.ends_with('-')
            && part.chars().all(|c| c.is_alphanumeric() || c == '-')
    })
}
