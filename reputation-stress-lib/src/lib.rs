//! # Reputation Stress Library
//!
//! A bounded-concurrency load generator for domain reputation services.
//!
//! The engine fans a repeated list of domains out over a fixed-size worker
//! pool, records every completed lookup exactly once as it arrives, and stops
//! early on a global deadline or an external cancellation without losing what
//! was already observed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reputation_stress_lib::{CsvSink, RunSummary, StressConfig, StressRunner};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StressConfig::default()
//!         .with_concurrency(20)
//!         .with_repeat_count(5)
//!         .with_timeout(Duration::from_secs(30));
//!     let runner = StressRunner::new(config)?;
//!
//!     let targets = vec!["example.com".to_string(), "google.com".to_string()];
//!     let mut sink = CsvSink::create("results.csv")?;
//!     let report = runner
//!         .run_targets(&targets, &mut sink, &CancellationToken::new())
//!         .await?;
//!
//!     let summary = RunSummary::from_report(&report);
//!     println!("Error rate: {:.2}%", summary.error_rate);
//!     Ok(())
//! }
//! ```
//!
//! ## Outcomes
//!
//! - **Success**: the service returned a verdict; counted and written out
//! - **Soft failure**: the service (or transport) reported an error; counted
//!   and written out with empty verdict fields
//! - **Hard failure**: the worker itself panicked or was cancelled; counted
//!   but not written out

// Re-export main public API types and functions
// This makes them available as reputation_stress_lib::TypeName
pub use concurrent::WorkerPool;
pub use config::{
    load_env_config, parse_timeout_string, ApiConfig, ConfigManager, DefaultsConfig, EnvConfig,
    FileConfig, MAX_CONCURRENCY,
};
pub use error::StressError;
pub use protocols::{verdict_from_json, ReputationClient, ReputationLookup};
pub use runner::StressRunner;
pub use sink::{output_record, CsvSink, MemorySink, OutcomeSink, Recorder};
pub use summary::{error_rate, RunSummary};
pub use targets::{load_targets, load_targets_from_json, load_targets_from_text};
pub use types::{
    Outcome, OutputRecord, RunReport, RunState, RunStatus, StressConfig, Task, Verdict,
    DEFAULT_API_URL, DEFAULT_AUTH_TOKEN,
};
pub use utils::{build_task_set, distinct_targets, is_valid_domain, MAX_TASKS};

// Public modules
pub mod protocols;

// Internal modules - these are not part of the public API
mod concurrent;
mod config;
mod error;
mod runner;
mod sink;
mod summary;
mod targets;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, StressError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
