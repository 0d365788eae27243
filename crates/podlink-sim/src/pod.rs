//! Scripted pods.

use podlink_protocol::{Command, ConnectType, RadioAddress, Response};
use rand::RngCore;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration Types
// ============================================================================

/// How a simulated pod answers an invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimConnectType {
    Decline,
    ClockOnly,
    ClockAndData,
}

impl From<SimConnectType> for ConnectType {
    fn from(value: SimConnectType) -> Self {
        match value {
            SimConnectType::Decline => ConnectType::Decline,
            SimConnectType::ClockOnly => ConnectType::ClockOnly,
            SimConnectType::ClockAndData => ConnectType::ClockAndData,
        }
    }
}

/// Configuration for a simulated pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimPodConfig {
    /// Node identifier the radio resolves.
    pub name: String,
    /// Radio address.
    pub address: u64,
    /// Reply to invites.
    pub connect_type: SimConnectType,
    /// Telemetry bytes sent per data request, code byte excluded.
    #[serde(default)]
    pub payload_length: usize,
    /// Whether clock tests pass.
    #[serde(default = "default_true")]
    pub clock_good: bool,
    /// Whether the name resolves.
    #[serde(default = "default_true")]
    pub discoverable: bool,
}

fn default_true() -> bool {
    true
}

impl SimPodConfig {
    /// A discoverable pod with a good clock.
    pub fn new(name: impl Into<String>, address: u64, connect_type: SimConnectType) -> Self {
        SimPodConfig {
            name: name.into(),
            address,
            connect_type,
            payload_length: 0,
            clock_good: true,
            discoverable: true,
        }
    }

    /// Set the telemetry length.
    pub fn with_payload_length(mut self, payload_length: usize) -> Self {
        self.payload_length = payload_length;
        self
    }

    /// Set whether clock tests pass.
    pub fn with_clock_good(mut self, clock_good: bool) -> Self {
        self.clock_good = clock_good;
        self
    }

    /// Set whether the name resolves.
    pub fn with_discoverable(mut self, discoverable: bool) -> Self {
        self.discoverable = discoverable;
        self
    }

    /// Radio address of the pod.
    pub fn radio_address(&self) -> RadioAddress {
        RadioAddress(self.address)
    }
}

// ============================================================================
// Pod State
// ============================================================================

/// A simulated pod and what it has received.
#[derive(Debug, Clone)]
pub struct SimPod {
    pub config: SimPodConfig,
    /// Time from the most recent clock push.
    pub clock: Option<u32>,
    /// Every command delivered to this pod, in order.
    pub received: Vec<Command>,
    /// Telemetry frames sent so far.
    pub reports_sent: u32,
}

impl SimPod {
    /// Create a pod that has received nothing.
    pub fn new(config: SimPodConfig) -> Self {
        SimPod {
            config,
            clock: None,
            received: Vec::new(),
            reports_sent: 0,
        }
    }

    /// Handle a command and return the reply, if the pod sends one.
    pub fn handle(&mut self, command: Command, rng: &mut ChaCha8Rng) -> Option<Response> {
        self.received.push(command);

        match command {
            Command::Invite => Some(Response::Rsvp {
                connect_type: self.config.connect_type.into(),
            }),
            Command::ClockPush { unix_time } => {
                self.clock = Some(unix_time);
                None
            }
            Command::ClockTest { .. } => Some(Response::ClockTestResult {
                good: self.config.clock_good,
            }),
            Command::DataRequest if self.config.connect_type == SimConnectType::ClockAndData => {
                let mut payload = vec![0u8; self.config.payload_length];
                rng.fill_bytes(&mut payload);
                // First byte carries a sequence number so reports can be told apart.
                if let Some(first) = payload.first_mut() {
                    *first = self.reports_sent as u8;
                }
                self.reports_sent += 1;
                Some(Response::PodData(payload))
            }
            Command::DataRequest
            | Command::LaunchPrimed { .. }
            | Command::LaunchDetected
            | Command::DescentDetected
            | Command::Landed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    #[test]
    fn test_invite_answered_with_configured_type() {
        let mut pod = SimPod::new(SimPodConfig::new("POD1", 1, SimConnectType::ClockOnly));

        assert_eq!(
            pod.handle(Command::Invite, &mut rng()),
            Some(Response::Rsvp {
                connect_type: ConnectType::ClockOnly
            })
        );
    }

    #[test]
    fn test_clock_push_recorded() {
        let mut pod = SimPod::new(SimPodConfig::new("POD1", 1, SimConnectType::ClockOnly));

        assert_eq!(pod.handle(Command::ClockPush { unix_time: 77 }, &mut rng()), None);
        assert_eq!(pod.clock, Some(77));
    }

    #[test]
    fn test_data_only_from_clock_and_data_pods() {
        let mut rng = rng();
        let mut clock_only = SimPod::new(SimPodConfig::new("A", 1, SimConnectType::ClockOnly));
        let mut data = SimPod::new(
            SimPodConfig::new("B", 2, SimConnectType::ClockAndData).with_payload_length(10),
        );

        assert_eq!(clock_only.handle(Command::DataRequest, &mut rng), None);
        let Some(Response::PodData(first)) = data.handle(Command::DataRequest, &mut rng) else {
            panic!("expected pod data");
        };
        let Some(Response::PodData(second)) = data.handle(Command::DataRequest, &mut rng) else {
            panic!("expected pod data");
        };
        assert_eq!(first.len(), 10);
        assert_eq!((first[0], second[0]), (0, 1));
    }

    #[test]
    fn test_config_from_yaml_defaults() {
        let yaml = "name: POD3\naddress: 10\nconnect_type: clock_and_data\n";
        let config: SimPodConfig = serde_yaml::from_str(yaml).unwrap();

        assert!(config.clock_good);
        assert!(config.discoverable);
        assert_eq!(config.payload_length, 0);
        assert_eq!(config.connect_type, SimConnectType::ClockAndData);
    }
}
