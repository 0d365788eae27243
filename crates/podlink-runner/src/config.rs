//! Runner configuration.
//!
//! ```yaml
//! module:
//!   lock_timeout_ms: 100
//!   pods:
//!     - { pod_number: 3, name: POD3, expected_length: 10 }
//! flight:
//!   telemetry_interval_secs: 5
//!   data_cycles: 3
//! simulation:
//!   seed: 42
//!   pods:
//!     - { name: POD3, address: 0x0013A20041000003, connect_type: clock_and_data, payload_length: 10 }
//! ```

use std::path::Path;

use podlink_core::{ConfigError, ModuleConfig, PodConfig};
use podlink_sim::{SimConnectType, SimPodConfig};
use serde::{Deserialize, Serialize};

/// Pacing and length of the flight sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightConfig {
    /// Interval announced with launch primed, in seconds.
    pub telemetry_interval_secs: u8,
    /// Data request rounds between launch and descent.
    pub data_cycles: u32,
    /// Reconcile passes attempted before giving up on unlinked pods.
    pub reconcile_passes: u32,
    /// Pause after each step so replies can arrive, in milliseconds.
    pub step_delay_ms: u64,
}

impl Default for FlightConfig {
    fn default() -> Self {
        FlightConfig {
            telemetry_interval_secs: 5,
            data_cycles: 3,
            reconcile_passes: 3,
            step_delay_ms: 200,
        }
    }
}

/// The simulated pods in radio range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for simulated telemetry.
    pub seed: u64,
    /// Pods the simulated radio can reach.
    pub pods: Vec<SimPodConfig>,
}

/// Complete runner configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub module: ModuleConfig,
    pub flight: FlightConfig,
    pub simulation: SimulationConfig,
}

impl RunnerConfig {
    /// Parse and validate YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: RunnerConfig = serde_yaml::from_str(yaml)?;
        config.module.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    /// Built-in session: a data pod, a declining pod and a pod whose clock
    /// never passes.
    pub fn demo() -> Self {
        let module = ModuleConfig::default()
            .with_pod(PodConfig::new(3, "POD3", 10))
            .with_pod(PodConfig::new(4, "POD4", 0))
            .with_pod(PodConfig::new(5, "POD5", 16));

        let simulation = SimulationConfig {
            seed: 42,
            pods: vec![
                SimPodConfig::new("POD3", 0x0013_A200_4100_0003, SimConnectType::ClockAndData)
                    .with_payload_length(10),
                SimPodConfig::new("POD4", 0x0013_A200_4100_0004, SimConnectType::Decline),
                SimPodConfig::new("POD5", 0x0013_A200_4100_0005, SimConnectType::ClockAndData)
                    .with_payload_length(16)
                    .with_clock_good(false),
            ],
        };

        RunnerConfig {
            module,
            flight: FlightConfig::default(),
            simulation,
        }
    }
}
