//! CLI entry point for the PSK band rater.
//!
//! `refresh` pulls the latest PSKReporter spots, rebuilds the spot database,
//! scores every configured grid and band, and writes the HTML dashboards.
//! `validate` only loads and checks the configuration.

use anyhow::Result;
use clap::{Parser, Subcommand};
use psk_band_rater::{
    config::Config,
    fetch::BasicClient,
    pipeline::{RunContext, run},
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    reload,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "psk_band_rater")]
#[command(about = "Rates amateur band conditions per grid from PSKReporter spots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch spots, rebuild the database and render the dashboards
    Refresh {
        /// Path to the TOML configuration
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Override the configured source with another URL or a local XML file
        #[arg(short, long, value_name = "FILE_OR_URL")]
        source: Option<String>,
    },
    /// Load the configuration and report what it defines
    Validate {
        /// Path to the TOML configuration
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
}

impl Commands {
    fn config_path(&self) -> &Path {
        match self {
            Commands::Refresh { config, .. } | Commands::Validate { config } => config,
        }
    }
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Logging setup: human-readable stdout + JSON rolling log file.
///
/// The stdout level starts at `info` and is switched once the config's
/// `log_debug` flag is known, unless `RUST_LOG` is set.
fn init_logging() -> (WorkerGuard, FilterHandle) {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/psk_band_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("psk_band_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stdout_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (stdout_filter, handle) = reload::Layer::new(stdout_filter);

    let stdout_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stdout)
        .with_filter(stdout_filter);

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(
            EnvFilter::try_from_env("RUST_LOG_JSON").unwrap_or_else(|_| EnvFilter::new("debug")),
        );

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(json_layer)
        .init();

    (file_guard, handle)
}

fn apply_log_level(handle: &FilterHandle, log_debug: bool) {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    let level = if log_debug { "debug" } else { "info" };
    if let Err(e) = handle.modify(|filter| *filter = EnvFilter::new(level)) {
        error!(error = %e, "Failed to switch log level");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok(); // Load .env file

    let (_file_guard, filter_handle) = init_logging();
    let cli = Cli::parse();

    let config = match Config::load(cli.command.config_path()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Configuration error. Exiting...");
            return ExitCode::FAILURE;
        }
    };
    apply_log_level(&filter_handle, config.log_debug);

    match execute(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Run failed. Exiting...");
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Refresh { source, .. } => {
            let source = source.unwrap_or_else(|| config.source.url.clone());
            let client =
                BasicClient::with_timeouts(config.source.timeout(), config.source.connect_timeout())?;

            let ctx = RunContext::new(config);
            let summary = run(&ctx, &client, &source).await?;

            info!(
                reports = summary.reports,
                spots_loaded = summary.spots_loaded,
                band_stats = summary.band_stats,
                pages = summary.pages,
                "Refresh completed successfully"
            );
        }
        Commands::Validate { .. } => {
            for region in &config.regions {
                info!(code = %region.code, name = %region.name, "Region");
            }
            for band in &config.bands {
                info!(band = %band.name, low = band.low, high = band.high, "Band");
            }
            for tier in &config.score_tiers {
                info!(
                    score = tier.score,
                    spot_count = tier.spot_count,
                    avg_snr = tier.avg_snr,
                    dx_percentage = tier.dx_percentage,
                    "Score tier"
                );
            }
            info!(
                regions = config.regions.len(),
                bands = config.bands.len(),
                score_tiers = config.score_tiers.len(),
                source = %config.source.url,
                "Configuration is valid"
            );
        }
    }

    Ok(())
}
