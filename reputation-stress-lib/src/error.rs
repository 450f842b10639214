//! Error handling for stress runs.
//!
//! This module defines a single error type covering both run-level faults
//! (bad input, unwritable output) and per-lookup faults that the engine turns
//! into counted outcomes instead of propagating.

use std::fmt;
use std::time::Duration;

/// Main error type for the stress engine.
///
/// Lookup implementations return it for per-domain failures; the worker pool
/// converts those into soft failures. Only the kinds reported by
/// [`StressError::is_fatal`] ever abort a run.
#[derive(Debug, Clone)]
pub enum StressError {
    /// The target list was empty after cleaning, so there is nothing to run
    NoTargets,

    /// Invalid run parameters (zero repeat count, bad domain, etc.)
    InvalidInput {
        message: String,
    },

    /// File I/O errors when reading target lists or config files
    File {
        path: String,
        message: String,
    },

    /// JSON parsing errors for target files and service responses
    Parse {
        message: String,
    },

    /// Configuration errors (invalid settings, etc.)
    Config {
        message: String,
    },

    /// Network-related errors (connection refused, DNS, etc.)
    Network {
        message: String,
        source: Option<String>,
    },

    /// The service answered with a non-success HTTP status
    Http {
        domain: String,
        status: u16,
    },

    /// The service answered but the payload carried an `error` field
    Reported {
        domain: String,
        message: String,
    },

    /// A single request took longer than the request timeout
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// Writing the results file failed
    Output {
        message: String,
    },
}

impl StressError {
    /// Create a new invalid input error.
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::File {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new parse error.
    pub fn parse<M: Into<String>>(message: M) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new error for an error payload returned by the service.
    pub fn reported<D: Into<String>, M: Into<String>>(domain: D, message: M) -> Self {
        Self::Reported {
            domain: domain.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a new output error.
    pub fn output<M: Into<String>>(message: M) -> Self {
        Self::Output {
            message: message.into(),
        }
    }

    /// Whether this error must stop the run instead of being counted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NoTargets
                | Self::InvalidInput { .. }
                | Self::File { .. }
                | Self::Config { .. }
                | Self::Output { .. }
        )
    }
}

impl fmt::Display for StressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTargets => write!(f, "No valid domains found"),
            Self::InvalidInput { message } => write!(f, "Invalid input: {}", message),
            Self::File { path, message } => write!(f, "File error at '{}': {}", path, message),
            Self::Parse { message } => write!(f, "Parse error: {}", message),
            Self::Config { message } => write!(f, "Configuration error: {}", message),
            Self::Network { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::Http { domain, status } => {
                write!(f, "HTTP {} from reputation service for '{}'", status, domain)
            }
            Self::Reported { domain, message } => {
                write!(f, "Reputation service error for '{}': {}", domain, message)
            }
            Self::Timeout {
                operation,
                duration,
            } => write!(f, "Timeout after {:?} during: {}", duration, operation),
            Self::Output { message } => write!(f, "Output error: {}", message),
        }
    }
}

impl std::error::Error for StressError {}

impl From<reqwest::Error> for StressError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", Duration::from_secs(30))
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for StressError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(format!("JSON parsing failed: {}", err))
    }
}

impl From<std::io::Error> for StressError {
    fn from(err: std::io::Error) -> Self {
        Self::output(format!("I/O error: {}", err))
    }
}
