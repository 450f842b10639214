//! Reputation Stress CLI Application
//!
//! Hammers a domain reputation service with repeated lookups at a fixed
//! concurrency, within a wall-clock budget, and reports throughput and error
//! statistics. Per-request results are written to a CSV file as they arrive.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use reputation_stress_lib::{
    build_task_set, load_env_config, load_targets, parse_timeout_string, ConfigManager, CsvSink,
    FileConfig, RunSummary, StressConfig, StressRunner, MAX_CONCURRENCY,
};
use std::path::PathBuf;
use std::process;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Targets file used when nothing else is configured
const DEFAULT_TARGETS_FILE: &str = "domains.json";

/// CLI arguments for reputation-stress
#[derive(Parser, Debug)]
#[command(name = "reputation-stress")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sai Dutt G.V <gvs46@protonmail.com>")]
#[command(about = "Reputation Service Stress Test")]
#[command(
    long_about = "Stress test a domain reputation service.\n\nEvery domain from the targets file is requested --domains times, with at most --concurrency requests in flight, until all requests finish or --timeout seconds pass. Results are written to a CSV file as they arrive."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Number of concurrent requests [default: 10]
    #[arg(short = 'c', long = "concurrency", help_heading = "Load")]
    pub concurrency: Option<usize>,

    /// Number of requests per domain [default: 10]
    #[arg(short = 'n', long = "domains", value_name = "COUNT", help_heading = "Load")]
    pub repeat: Option<usize>,

    /// Timeout in seconds for the whole run [default: 60]
    #[arg(short = 't', long = "timeout", value_name = "SECONDS", help_heading = "Load")]
    pub timeout: Option<u64>,

    /// File with target domains: JSON {"domains": [...]} or one per line [default: domains.json]
    #[arg(short = 'f', long = "targets", value_name = "FILE", help_heading = "Input/Output")]
    pub targets: Option<String>,

    /// CSV results file [default: reputation_stress_results_<unix time>.csv]
    #[arg(short = 'o', long = "output", value_name = "FILE", help_heading = "Input/Output")]
    pub output: Option<String>,

    /// Print the final summary as JSON
    #[arg(short = 'j', long = "json", help_heading = "Input/Output")]
    pub json: bool,

    /// Reputation API base URL; the domain is appended
    #[arg(long = "api-url", value_name = "URL", help_heading = "Service")]
    pub api_url: Option<String>,

    /// API token sent as "Authorization: Token <TOKEN>"
    #[arg(long = "token", value_name = "TOKEN", help_heading = "Service")]
    pub token: Option<String>,

    /// Per-request timeout, e.g. "30", "30s", "1m" [default: 30s]
    #[arg(long = "request-timeout", value_name = "DURATION", help_heading = "Service")]
    pub request_timeout: Option<String>,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,

    /// Debug logging (one line per request)
    #[arg(short = 'd', long = "debug", help_heading = "Configuration")]
    pub debug: bool,
}

/// Everything a run needs after merging all configuration sources.
#[derive(Debug)]
struct RunSettings {
    config: StressConfig,
    targets_file: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_logging(&args);

    if let Err(e) = run_stress_test(args).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over the flags.
fn init_logging(args: &Args) {
    let default_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if let Some(concurrency) = args.concurrency {
        if concurrency == 0 || concurrency > MAX_CONCURRENCY {
            return Err(format!(
                "Concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            ));
        }
    }

    if args.repeat == Some(0) {
        return Err("Number of requests per domain must be at least 1".to_string());
    }

    if args.timeout == Some(0) {
        return Err("Timeout must be at least 1 second".to_string());
    }

    if let Some(request_timeout) = &args.request_timeout {
        if parse_timeout_string(request_timeout).is_none() {
            return Err(format!(
                "Invalid request timeout '{}'. Use format like '30', '30s', '1m'",
                request_timeout
            ));
        }
    }

    Ok(())
}

/// Main stress test logic
async fn run_stress_test(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let settings = build_settings(&args)?;
    let config = settings.config;

    let targets = load_targets(&settings.targets_file)?;
    info!(
        file = %settings.targets_file,
        domains = targets.len(),
        "loaded targets"
    );

    // Build the task set before touching the output file, so bad input leaves nothing behind
    let tasks = build_task_set(&targets, config.repeat_count)?;

    let output_path = args
        .output
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(default_output_path);
    let mut sink = CsvSink::create(&output_path)?;

    let runner = StressRunner::new(config.clone())?;

    let cancel = CancellationToken::new();
    spawn_interrupt_listener(cancel.clone());

    if !args.json {
        ui::print_header(tasks.len(), &config, &output_path);
    }
    let spinner = if args.json {
        None
    } else {
        ui::Spinner::start(format!("Sending {} requests...", tasks.len()))
    };

    let result = runner.run(tasks, &mut sink, &cancel).await;

    if let Some(s) = spinner {
        s.stop().await;
    }

    let report = result?;
    let summary = RunSummary::from_report(&report);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        ui::print_report(&summary, config.timeout, &output_path);
    }

    Ok(())
}

/// Cancel the run on the first Ctrl-C.
fn spawn_interrupt_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received");
            cancel.cancel();
        }
    });
}

fn default_output_path() -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    PathBuf::from(format!("reputation_stress_results_{}.csv", now))
}

/// Build run settings from CLI arguments with config file integration.
///
/// Precedence order (highest to lowest):
/// 1. CLI arguments (explicit user input)
/// 2. Environment variables (RS_*)
/// 3. Explicit config file (--config or RS_CONFIG)
/// 4. Discovered config files (local, then home, then XDG)
/// 5. Built-in defaults
fn build_settings(args: &Args) -> Result<RunSettings, Box<dyn std::error::Error>> {
    let mut settings = RunSettings {
        config: StressConfig::default(),
        targets_file: DEFAULT_TARGETS_FILE.to_string(),
    };

    let config_manager = ConfigManager::new();
    let env_config = load_env_config();

    // Step 1: Determine config file path and load config files
    if let Some(explicit_config_path) = args.config.as_ref().or(env_config.config.as_ref()) {
        info!(path = %explicit_config_path, "using explicit config file");

        let file_config = config_manager
            .load_file(explicit_config_path)
            .map_err(|e| {
                format!(
                    "Failed to load config file '{}': {}",
                    explicit_config_path, e
                )
            })?;

        settings = merge_file_config(settings, file_config);
    } else {
        let file_config = config_manager.discover_and_load()?;
        settings = merge_file_config(settings, file_config);
    }

    // Step 2: Apply environment variables (RS_*)
    settings = apply_environment_config(settings, env_config);

    // Step 3: Apply CLI arguments (highest precedence)
    settings = apply_cli_args(settings, args);

    debug!(?settings, "resolved settings");
    Ok(settings)
}

/// Merge a FileConfig into the run settings.
fn merge_file_config(mut settings: RunSettings, file_config: FileConfig) -> RunSettings {
    if let Some(defaults) = file_config.defaults {
        if let Some(concurrency) = defaults.concurrency {
            settings.config = settings.config.with_concurrency(concurrency);
        }
        if let Some(repeat) = defaults.repeat {
            settings.config.repeat_count = repeat;
        }
        if let Some(timeout) = defaults.timeout.as_deref().and_then(parse_timeout_string) {
            settings.config.timeout = timeout;
        }
        if let Some(timeout) = defaults
            .request_timeout
            .as_deref()
            .and_then(parse_timeout_string)
        {
            settings.config.request_timeout = timeout;
        }
        if let Some(targets_file) = defaults.targets_file {
            settings.targets_file = targets_file;
        }
    }

    if let Some(api) = file_config.api {
        if let Some(url) = api.url {
            settings.config.api_url = url;
        }
        if let Some(token) = api.token {
            settings.config.auth_token = token;
        }
    }

    settings
}

/// Apply RS_* environment variables to the run settings.
fn apply_environment_config(
    mut settings: RunSettings,
    env_config: reputation_stress_lib::EnvConfig,
) -> RunSettings {
    if let Some(concurrency) = env_config.concurrency {
        settings.config = settings.config.with_concurrency(concurrency);
    }
    if let Some(repeat) = env_config.repeat {
        settings.config.repeat_count = repeat;
    }
    if let Some(timeout) = env_config.timeout {
        settings.config.timeout = timeout;
    }
    if let Some(timeout) = env_config.request_timeout {
        settings.config.request_timeout = timeout;
    }
    if let Some(url) = env_config.api_url {
        settings.config.api_url = url;
    }
    if let Some(token) = env_config.api_token {
        settings.config.auth_token = token;
    }
    if let Some(targets_file) = env_config.targets_file {
        settings.targets_file = targets_file;
    }

    settings
}

/// Apply CLI arguments to the run settings (highest precedence).
fn apply_cli_args(mut settings: RunSettings, args: &Args) -> RunSettings {
    if let Some(concurrency) = args.concurrency {
        settings.config = settings.config.with_concurrency(concurrency);
    }
    if let Some(repeat) = args.repeat {
        settings.config.repeat_count = repeat;
    }
    if let Some(timeout) = args.timeout {
        settings.config.timeout = Duration::from_secs(timeout);
    }
    if let Some(timeout) = args.request_timeout.as_deref().and_then(parse_timeout_string) {
        settings.config.request_timeout = timeout;
    }
    if let Some(url) = &args.api_url {
        settings.config.api_url = url.clone();
    }
    if let Some(token) = &args.token {
        settings.config.auth_token = token.clone();
    }
    if let Some(targets) = &args.targets {
        settings.targets_file = targets.clone();
    }

    settings
}
