//! podlink command-line runner.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use podlink_runner::{run_simulated, RunnerConfig, RunnerError};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "podlink")]
#[command(about = "Fly a command module session against simulated pods")]
struct Cli {
    /// YAML configuration; the built-in demo session when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the number of data request cycles.
    #[arg(long)]
    cycles: Option<u32>,

    /// Override the pause between steps, in milliseconds.
    #[arg(long)]
    step_delay_ms: Option<u64>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Serve Prometheus metrics on this address.
    #[cfg(feature = "prometheus")]
    #[arg(long)]
    metrics_addr: Option<std::net::SocketAddr>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt().with_env_filter(filter).with_target(false).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RunnerError> {
    let mut config = match &cli.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::demo(),
    };
    if let Some(cycles) = cli.cycles {
        config.flight.data_cycles = cycles;
    }
    if let Some(delay) = cli.step_delay_ms {
        config.flight.step_delay_ms = delay;
    }

    #[cfg(feature = "prometheus")]
    if let Some(addr) = cli.metrics_addr {
        if let Err(e) = podlink_metrics::install_prometheus(addr) {
            warn!("Prometheus exporter not started: {}", e);
        }
    }
    podlink_metrics::describe_metrics();

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = Arc::clone(&stop);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C, stopping after the current step...");
        handler_stop.store(true, Ordering::Relaxed);
    }) {
        warn!("Ctrl+C handler not installed: {}", e);
    }

    let summary = run_simulated(&config, &stop)?;
    info!(
        "Flight {}: {} phase(s), {} pod(s) linked, reports {:?}",
        if summary.is_complete() { "complete" } else { "stopped" },
        summary.completed.len(),
        summary.linked,
        summary.reports
    );
    Ok(())
}
