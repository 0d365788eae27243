//! The flight sequence.
//!
//! Invite the pods, link them, settle their clocks, then walk through the
//! flight phases collecting telemetry between launch and descent.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use podlink_core::{CommandModule, RadioTransport};
use tracing::{debug, info, warn};

use crate::config::FlightConfig;

/// Steps of the flight sequence, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FlightPhase {
    Invite,
    Reconcile,
    ClockTests,
    LaunchPrimed,
    LaunchDetected,
    DataCycles,
    DescentDetected,
    Landed,
}

impl FlightPhase {
    /// Every phase in flight order.
    pub const ALL: [FlightPhase; 8] = [
        FlightPhase::Invite,
        FlightPhase::Reconcile,
        FlightPhase::ClockTests,
        FlightPhase::LaunchPrimed,
        FlightPhase::LaunchDetected,
        FlightPhase::DataCycles,
        FlightPhase::DescentDetected,
        FlightPhase::Landed,
    ];
}

impl fmt::Display for FlightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlightPhase::Invite => "invite",
            FlightPhase::Reconcile => "reconcile",
            FlightPhase::ClockTests => "clock tests",
            FlightPhase::LaunchPrimed => "launch primed",
            FlightPhase::LaunchDetected => "launch detected",
            FlightPhase::DataCycles => "data cycles",
            FlightPhase::DescentDetected => "descent detected",
            FlightPhase::Landed => "landed",
        };
        f.write_str(name)
    }
}

/// What a flight achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightSummary {
    /// Phases completed, in order.
    pub completed: Vec<FlightPhase>,
    /// Pods linked after reconciliation.
    pub linked: usize,
    /// Telemetry reports drained per pod number.
    pub reports: BTreeMap<u8, u32>,
}

impl FlightSummary {
    /// Whether every phase ran.
    pub fn is_complete(&self) -> bool {
        self.completed.len() == FlightPhase::ALL.len()
    }
}

/// Drives a [`CommandModule`] through a flight.
pub struct Flight<'a, T: RadioTransport + ?Sized + 'static> {
    module: &'a CommandModule<T>,
    config: &'a FlightConfig,
    pod_numbers: Vec<u8>,
    stop: &'a AtomicBool,
}

impl<'a, T: RadioTransport + ?Sized + 'static> Flight<'a, T> {
    /// Prepare a flight over `pod_numbers`. Setting `stop` ends it after the
    /// current step.
    pub fn new(
        module: &'a CommandModule<T>,
        config: &'a FlightConfig,
        pod_numbers: Vec<u8>,
        stop: &'a AtomicBool,
    ) -> Self {
        Flight {
            module,
            config,
            pod_numbers,
            stop,
        }
    }

    /// Run every phase unless stopped.
    pub fn run(&self) -> FlightSummary {
        let mut summary = FlightSummary::default();

        for phase in FlightPhase::ALL {
            if self.stop.load(Ordering::Relaxed) {
                warn!("Flight: stopped before {}", phase);
                break;
            }
            info!("Flight: {}", phase);
            self.run_phase(phase, &mut summary);
            summary.completed.push(phase);
        }

        summary
    }

    fn run_phase(&self, phase: FlightPhase, summary: &mut FlightSummary) {
        let commands = self.module.commands();
        match phase {
            FlightPhase::Invite => {
                commands.invite();
                self.pause();
            }
            FlightPhase::Reconcile => {
                summary.linked = self.reconcile();
                if let Some(report) = self.module.registry_report() {
                    info!("Flight: registry\n{}", report);
                }
            }
            FlightPhase::ClockTests => {
                let sent = self.module.test_all_clocks();
                debug!("Flight: {} clock test(s) sent", sent);
                self.pause();
                if let Some(report) = self.module.directory_report() {
                    info!("Flight: directory\n{}", report);
                }
            }
            FlightPhase::LaunchPrimed => {
                commands.broadcast_launch_primed(self.config.telemetry_interval_secs);
            }
            FlightPhase::LaunchDetected => {
                commands.broadcast_launch_detected();
            }
            FlightPhase::DataCycles => {
                for cycle in 0..self.config.data_cycles {
                    if self.stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let sent = self.module.request_data_all();
                    debug!("Flight: cycle {} requested data from {} pod(s)", cycle + 1, sent);
                    self.pause();
                    self.drain(summary);
                }
                if let Some(report) = self.module.pod_data_report() {
                    info!("Flight: pod data\n{}", report);
                }
            }
            FlightPhase::DescentDetected => {
                commands.broadcast_descent_detected();
            }
            FlightPhase::Landed => {
                commands.broadcast_landed();
            }
        }
    }

    /// Reconcile until every data pod is linked or the passes run out.
    fn reconcile(&self) -> usize {
        let mut linked = 0;
        for pass in 0..self.config.reconcile_passes.max(1) {
            if let Some(result) = self.module.sync_registry() {
                linked += result.linked;
                debug!("Flight: reconcile pass {}: {:?}", pass + 1, result);
                if result.unresolved == 0 {
                    break;
                }
            }
            self.pause();
        }
        linked
    }

    fn drain(&self, summary: &mut FlightSummary) {
        for &pod_number in &self.pod_numbers {
            if let Some(data) = self.module.drain_pod_data(pod_number) {
                info!("Flight: pod {} -> {:02X?}", pod_number, data);
                *summary.reports.entry(pod_number).or_default() += 1;
            }
        }
    }

    fn pause(&self) {
        thread::sleep(Duration::from_millis(self.config.step_delay_ms));
    }
}
