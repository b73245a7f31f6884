use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use objects_api_checks::client::ObjectsClient;
use objects_api_checks::config::{self, Config};
use objects_api_checks::freshness::FreshnessCheck;
use objects_api_checks::http::{self, state::AppState, state::ObjectStore};
use objects_api_checks::metrics::Metrics;
use objects_api_checks::suite::{Marker, Selection, Suite};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "objects-api-checks", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the CRUD checks against an objects API
    Run {
        /// Base URL of the API (overrides BASE_URL)
        #[arg(long)]
        base_url: Option<String>,

        /// Only run scenarios carrying this marker
        #[arg(long, value_enum)]
        marker: Option<Marker>,

        /// Only run scenarios whose name contains this string
        #[arg(long)]
        filter: Option<String>,

        /// Freshness tolerance in seconds (overrides FRESHNESS_TOLERANCE_SECS)
        #[arg(long)]
        tolerance_secs: Option<u64>,

        /// Write Prometheus metrics for the run to this file
        #[arg(long)]
        metrics_out: Option<PathBuf>,
    },
    /// Serve an in-memory stand-in for the objects API
    Serve {
        /// Listen address (overrides ADDR)
        #[arg(long)]
        addr: Option<SocketAddr>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = Config::from_env()?;

    match cli.command {
        Command::Run {
            base_url,
            marker,
            filter,
            tolerance_secs,
            metrics_out,
        } => {
            if let Some(base_url) = base_url {
                config.checks.base_url = base_url;
            }
            if let Some(secs) = tolerance_secs {
                config.checks.freshness_tolerance_secs = secs;
            }
            config.validate()?;
            init_logging(&config);

            // Checks run strictly one after another
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("Failed to build tokio runtime")?;

            let passed = runtime.block_on(run_checks(
                config,
                Selection { marker, filter },
                metrics_out,
            ))?;
            Ok(exit_code(passed))
        }
        Command::Serve { addr } => {
            if let Some(addr) = addr {
                config.stub.addr = addr;
            }
            config.validate()?;
            init_logging(&config);

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to build tokio runtime")?;

            runtime.block_on(serve_stub(config))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Run the selected checks and report whether the run passed.
async fn run_checks(
    config: Config,
    selection: Selection,
    metrics_out: Option<PathBuf>,
) -> Result<bool> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.base_url(),
        tolerance_secs = config.checks.freshness_tolerance_secs,
        marker = ?selection.marker,
        filter = ?selection.filter,
        "Starting objects API checks"
    );

    let metrics = Arc::new(Metrics::new());
    let client = ObjectsClient::new(config.base_url(), config.request_timeout())
        .context("Failed to create HTTP client")?
        .with_metrics(metrics.clone());
    let freshness = FreshnessCheck::new(config.freshness_tolerance())?;

    let mut suite = Suite::new(client, freshness).with_metrics(metrics.clone());
    let report = suite.run(&selection).await;

    println!("{report}");

    if let Some(path) = metrics_out {
        std::fs::write(&path, metrics.encode())
            .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
        info!(path = %path.display(), "Metrics written");
    }

    if !report.is_success() {
        error!(failed = report.failed(), passed = report.passed(), "Checks failed");
    }
    Ok(report.is_success())
}

async fn serve_stub(config: Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.stub.addr,
        "Starting stub objects service"
    );

    let listener = http::bind(config.stub.addr, config.stub.tcp_nodelay)?;

    let config = Arc::new(config);
    let store = Arc::new(ObjectStore::seeded());
    let metrics = Arc::new(Metrics::new());
    let state = Arc::new(AppState::new(config, store, metrics));

    http::serve(listener, state, shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}

/// Initialize logging based on configuration
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        config::LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        config::LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
