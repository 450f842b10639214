//! Remote lookup implementations.
//!
//! The worker pool only knows the [`ReputationLookup`] trait; the HTTP client
//! in [`reputation`] is the production implementation and tests plug in
//! their own stubs.

use crate::error::StressError;
use crate::types::Verdict;
use async_trait::async_trait;

/// HTTP client for the reputation API
pub mod reputation;

pub use reputation::{verdict_from_json, ReputationClient};

/// A remote call mapping a domain to its reputation verdict.
///
/// Implementations own their transport, auth and retry policy. Any `Err` is
/// recorded as a soft failure for that domain; it never stops the run.
#[async_trait]
pub trait ReputationLookup: Send + Sync {
    async fn lookup(&self, domain: &str) -> Result<Verdict, StressError>;
}
