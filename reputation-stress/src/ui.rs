//! Terminal display for reputation-stress.
//!
//! Run header, spinner animation while requests are in flight, and the final
//! report. Uses only the `console` crate.

use console::{style, Term};
use reputation_stress_lib::{RunStatus, RunSummary, StressConfig};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// ── Spinner ──────────────────────────────────────────────────────────────────

const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// An async braille-dot spinner that writes to stderr so stdout stays clean.
pub struct Spinner {
    running: Arc<AtomicBool>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl Spinner {
    /// Start a spinner with the given message and a running elapsed-time counter.
    ///
    /// Returns `None` when stderr is not a terminal.
    pub fn start(message: String) -> Option<Self> {
        let term = Term::stderr();
        if !term.is_term() {
            return None;
        }

        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();

        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let mut idx = 0usize;
            while running_clone.load(Ordering::Relaxed) {
                let frame = SPINNER_FRAMES[idx % SPINNER_FRAMES.len()];
                let _ = term.clear_line();
                let _ = term.write_str(&format!(
                    "{} {} {}",
                    style(frame).cyan(),
                    message,
                    style(format!("{:.0}s", started.elapsed().as_secs_f64())).dim()
                ));
                idx += 1;
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            let _ = term.clear_line();
        });

        Some(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop the spinner and clear the line.
    pub async fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(h) = self.handle.take() {
            let _ = h.await;
        }
    }
}

// ── Header ───────────────────────────────────────────────────────────────────

/// Print a styled header at the start of a run.
pub fn print_header(task_count: usize, config: &StressConfig, output: &Path) {
    println!(
        "{} {}",
        style("reputation-stress").bold(),
        style(format!("v{}", env!("CARGO_PKG_VERSION"))).dim(),
    );

    let meta_parts = [
        format!("Requests: {}", task_count),
        format!("Concurrency: {}", config.concurrency),
        format!("Timeout: {}s", config.timeout.as_secs()),
        format!("Output: {}", output.display()),
    ];

    println!("{}", style(meta_parts.join(" | ")).dim());
    println!();
}

// ── Report ───────────────────────────────────────────────────────────────────

/// Human-readable reason the run ended.
pub fn stop_reason(status: RunStatus, timeout: Duration) -> String {
    match status {
        RunStatus::Completed => "Finished successfully".to_string(),
        RunStatus::TimedOut => format!(
            "Timeout reached - {} seconds, please increase the timeout",
            timeout.as_secs()
        ),
        RunStatus::Interrupted => "Interrupted by user".to_string(),
    }
}

/// Plain report lines, without styling.
pub fn format_report(summary: &RunSummary, timeout: Duration, output: &Path) -> Vec<String> {
    let mut lines = vec![
        "Stress test is over!".to_string(),
        format!("Reason: {}", stop_reason(summary.status, timeout)),
    ];

    if summary.status.is_partial() {
        lines.push("Partial output:".to_string());
    }

    lines.push(format!("Time in total: {:.2} seconds", summary.elapsed_secs));
    lines.push(format!("Requests in total: {}", summary.total_requests));
    lines.push(format!(
        "Error rate: {:.2}% ({} / {})",
        summary.error_rate, summary.failed_requests, summary.total_requests
    ));

    if let Some(avg) = summary.avg_latency_ms {
        lines.push(format!("Average time for one request: {:.2} ms", avg));
    }
    if let Some(rps) = summary.requests_per_second {
        lines.push(format!("Throughput: {:.2} requests/second", rps));
    }
    if summary.hard_failures > 0 {
        lines.push(format!(
            "Lost requests (not in results file): {}",
            summary.hard_failures
        ));
    }

    lines.push(format!("Results saved to: {}", output.display()));
    lines
}

/// Print the final report. The headline and reason are colored by status.
pub fn print_report(summary: &RunSummary, timeout: Duration, output: &Path) {
    let lines = format_report(summary, timeout, output);
    let mut iter = lines.iter();

    println!(
        "  {}",
        style("────────────────────────────────────────────────────").dim()
    );
    if let Some(headline) = iter.next() {
        println!("  {}", style(headline).bold());
    }
    if let Some(reason) = iter.next() {
        let reason = if summary.status.is_partial() {
            style(reason).yellow()
        } else {
            style(reason).green()
        };
        println!("  {}", reason);
    }
    for line in iter {
        println!("  {}", line);
    }
}
