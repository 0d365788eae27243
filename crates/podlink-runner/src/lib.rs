//! # podlink-runner
//!
//! Flies a command module session against the simulated radio: loads a
//! configuration, registers the pods, runs the flight sequence and logs the
//! directory, registry and telemetry reports along the way.

mod config;
mod error;
mod flight;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use podlink_core::CommandModule;
use podlink_sim::SimRadio;
use tracing::info;

pub use config::{FlightConfig, RunnerConfig, SimulationConfig};
pub use error::RunnerError;
pub use flight::{Flight, FlightPhase, FlightSummary};

/// Run one flight against simulated pods.
pub fn run_simulated(config: &RunnerConfig, stop: &AtomicBool) -> Result<FlightSummary, RunnerError> {
    let radio = Arc::new(SimRadio::new(
        config.simulation.pods.iter().cloned(),
        config.simulation.seed,
    ));
    info!(
        "Runner: {} simulated pod(s), {} registered",
        config.simulation.pods.len(),
        config.module.pods.len()
    );

    let module = CommandModule::start(Arc::clone(&radio), &config.module)?;
    let pod_numbers = config.module.pods.iter().map(|p| p.pod_number).collect();
    let summary = Flight::new(&module, &config.flight, pod_numbers, stop).run();

    module.shutdown();
    radio.close();
    Ok(summary)
}
