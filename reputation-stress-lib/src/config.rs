//! Configuration file parsing and management.
//!
//! This module handles loading configuration from TOML files and `RS_*`
//! environment variables, and merging discovered files with proper
//! precedence rules.

use crate::error::StressError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Upper bound accepted for concurrency from any configuration source.
pub const MAX_CONCURRENCY: usize = 1000;

/// Configuration loaded from TOML files.
///
/// ```toml
/// [defaults]
/// concurrency = 25
/// repeat = 5
/// timeout = "2m"
/// request_timeout = "10s"
/// targets_file = "domains.json"
///
/// [api]
/// url = "https://reputation.example.com/domain/ranking/"
/// token = "secret"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Default values for CLI options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Reputation API endpoint settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiConfig>,
}

/// Default configuration values that map to CLI options.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DefaultsConfig {
    /// Default concurrency level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// How many times each domain is submitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat: Option<usize>,

    /// Global run timeout (as string, e.g., "60", "90s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    /// Per-request timeout (same format as `timeout`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<String>,

    /// File holding the target domains
    #[serde(skip_serializing_if = "Option::is_none")]
    pub targets_file: Option<String>,
}

/// Reputation API settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApiConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Default)]
pub struct ConfigManager;

impl ConfigManager {
    /// Create a new configuration manager.
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, StressError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(StressError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            StressError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            StressError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is loaded first, then the home directory file, then the
    /// local file; later files override earlier ones field by field.
    pub fn discover_and_load(&self) -> Result<FileConfig, StressError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "ignoring config file"),
            }
        }

        for path in &loaded_files {
            info!(path = %path.display(), "loaded config file");
        }

        Ok(merged_config)
    }

    /// Get the local configuration file path.
    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./reputation-stress.toml", "./.reputation-stress.toml"]
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Get the global configuration file path.
    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;

        [".reputation-stress.toml", "reputation-stress.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    /// Get the XDG configuration file path.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("reputation-stress").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations; values from `higher` win.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(lower), Some(higher)) => Some(DefaultsConfig {
                    concurrency: higher.concurrency.or(lower.concurrency),
                    repeat: higher.repeat.or(lower.repeat),
                    timeout: higher.timeout.or(lower.timeout),
                    request_timeout: higher.request_timeout.or(lower.request_timeout),
                    targets_file: higher.targets_file.or(lower.targets_file),
                }),
                (lower, higher) => higher.or(lower),
            },
            api: match (lower.api, higher.api) {
                (Some(lower), Some(higher)) => Some(ApiConfig {
                    url: higher.url.or(lower.url),
                    token: higher.token.or(lower.token),
                }),
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), StressError> {
        if let Some(defaults) = &config.defaults {
            if let Some(concurrency) = defaults.concurrency {
                if concurrency == 0 || concurrency > MAX_CONCURRENCY {
                    return Err(StressError::config(format!(
                        "Concurrency must be between 1 and {}",
                        MAX_CONCURRENCY
                    )));
                }
            }

            if defaults.repeat == Some(0) {
                return Err(StressError::config("Repeat count must be at least 1"));
            }

            for timeout_str in [&defaults.timeout, &defaults.request_timeout]
                .into_iter()
                .flatten()
            {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(StressError::config(format!(
                        "Invalid timeout format '{}'. Use format like '60', '90s', '2m'",
                        timeout_str
                    )));
                }
            }
        }

        if let Some(api) = &config.api {
            if let Some(url) = &api.url {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(StressError::config(format!(
                        "API url '{}' must start with http:// or https://",
                        url
                    )));
                }
            }
        }

        Ok(())
    }
}

/// Environment variable configuration that mirrors CLI options.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub concurrency: Option<usize>,
    pub repeat: Option<usize>,
    pub timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub targets_file: Option<String>,
    pub config: Option<String>,
}

/// Load configuration from `RS_*` environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    let mut env_config = EnvConfig::default();

    if let Ok(val) = env::var("RS_CONCURRENCY") {
        match val.parse::<usize>() {
            Ok(concurrency) if concurrency > 0 && concurrency <= MAX_CONCURRENCY => {
                info!("Using RS_CONCURRENCY={}", concurrency);
                env_config.concurrency = Some(concurrency);
            }
            _ => warn!(
                "Invalid RS_CONCURRENCY='{}', must be 1-{}",
                val, MAX_CONCURRENCY
            ),
        }
    }

    if let Ok(val) = env::var("RS_REPEAT") {
        match val.parse::<usize>() {
            Ok(repeat) if repeat > 0 => {
                info!("Using RS_REPEAT={}", repeat);
                env_config.repeat = Some(repeat);
            }
            _ => warn!("Invalid RS_REPEAT='{}', must be a positive integer", val),
        }
    }

    env_config.timeout = env_duration("RS_TIMEOUT");
    env_config.request_timeout = env_duration("RS_REQUEST_TIMEOUT");
    env_config.api_url = env_string("RS_API_URL");
    env_config.api_token = env_string("RS_API_TOKEN");
    env_config.targets_file = env_string("RS_TARGETS_FILE");
    env_config.config = env_string("RS_CONFIG");

    env_config
}

fn env_string(name: &str) -> Option<String> {
    let val = env::var(name).ok()?;
    if val.trim().is_empty() {
        return None;
    }
    info!("Using {}", name);
    Some(val)
}

fn env_duration(name: &str) -> Option<Duration> {
    let val = env::var(name).ok()?;
    match parse_timeout_string(&val) {
        Some(duration) => {
            info!("Using {}={}", name, val);
            Some(duration)
        }
        None => {
            warn!(
                "Invalid {}='{}', use format like '60', '90s', '2m'",
                name, val
            );
            None
        }
    }
}

/// Parse a timeout string like "60", "30s", "2m" into a duration.
///
/// Zero durations are rejected.
pub fn parse_timeout_string(timeout_str: &str) -> Option<Duration> {
    let timeout_str = timeout_str.trim().to_lowercase();

    let secs = if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.trim().parse::<u64>().ok()
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.trim().parse::<u64>().ok().and_then(|m| m.checked_mul(60))
    } else {
        // Assume seconds if no unit
        timeout_str.parse::<u64>().ok()
    }?;

    (secs > 0).then(|| Duration::from_secs(secs))
}
