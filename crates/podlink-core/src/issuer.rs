//! Outbound commands.
//!
//! The issuer encodes a [`Command`], hands it to the transport and logs the
//! result. Transmission failures are counted and logged, never returned: the
//! boolean results only say whether the radio accepted the frame.
//!
//! The fan-out operations collect their targets under the lock and transmit
//! after releasing it.

use std::fmt;
use std::sync::Arc;

use heapless::Vec;
use podlink_metrics::metric_defs;
use podlink_protocol::{Command, RadioAddress, MAX_FC};
use tracing::{debug, trace, warn};

use crate::clock::WallClock;
use crate::directory::BoundedDirectory;
use crate::guard::SharedState;
use crate::registry::BoundedRegistry;
use crate::transport::RadioTransport;

/// Sends commands to pods over a [`RadioTransport`].
pub struct CommandIssuer<T: ?Sized> {
    transport: Arc<T>,
    clock: Arc<dyn WallClock>,
    state: Arc<SharedState>,
}

impl<T: ?Sized> Clone for CommandIssuer<T> {
    fn clone(&self) -> Self {
        CommandIssuer {
            transport: Arc::clone(&self.transport),
            clock: Arc::clone(&self.clock),
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: ?Sized> fmt::Debug for CommandIssuer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandIssuer")
            .field("lock_timeout", &self.state.lock_timeout())
            .finish_non_exhaustive()
    }
}

impl<T: RadioTransport + ?Sized> CommandIssuer<T> {
    /// Create an issuer sending through `transport`, stamping clock commands
    /// from `clock`.
    pub fn new(transport: Arc<T>, clock: Arc<dyn WallClock>, state: Arc<SharedState>) -> Self {
        CommandIssuer {
            transport,
            clock,
            state,
        }
    }

    /// Broadcast an invite.
    pub fn invite(&self) -> bool {
        self.broadcast(Command::Invite)
    }

    /// Broadcast launch primed with the telemetry interval in seconds.
    pub fn broadcast_launch_primed(&self, interval_secs: u8) -> bool {
        self.broadcast(Command::LaunchPrimed { interval_secs })
    }

    /// Broadcast launch detected.
    pub fn broadcast_launch_detected(&self) -> bool {
        self.broadcast(Command::LaunchDetected)
    }

    /// Broadcast descent detected.
    pub fn broadcast_descent_detected(&self) -> bool {
        self.broadcast(Command::DescentDetected)
    }

    /// Broadcast landed.
    pub fn broadcast_landed(&self) -> bool {
        self.broadcast(Command::Landed)
    }

    /// Push the current time to `address`.
    pub fn send_clock(&self, address: RadioAddress) -> bool {
        let unix_time = self.clock.unix_time();
        self.send_to(address, Command::ClockPush { unix_time })
    }

    /// Ask `address` to compare its clock with the current time.
    pub fn test_clock(&self, address: RadioAddress) -> bool {
        let unix_time = self.clock.unix_time();
        self.send_to(address, Command::ClockTest { unix_time })
    }

    /// Ask `address` for its latest telemetry.
    pub fn request_data(&self, address: RadioAddress) -> bool {
        self.send_to(address, Command::DataRequest)
    }

    /// Request data from every linked pod that sends data.
    ///
    /// Returns the number of requests transmitted, zero if the locks were busy.
    pub fn request_data_all(&self) -> usize {
        let targets = {
            let Some((registry, directory)) = self.state.both() else {
                debug!("Issuer: locks busy, skipping data requests");
                return 0;
            };
            data_request_targets(&registry, &directory)
        };
        targets.iter().filter(|a| self.request_data(**a)).count()
    }

    /// Test the clock of every pod that wants a clock and has not passed a test.
    ///
    /// Returns the number of tests transmitted, zero if the directory was busy.
    pub fn test_all_clocks(&self) -> usize {
        let targets = {
            let Some(directory) = self.state.directory() else {
                debug!("Issuer: directory busy, skipping clock tests");
                return 0;
            };
            clock_test_targets(&directory)
        };
        targets.iter().filter(|a| self.test_clock(**a)).count()
    }

    fn broadcast(&self, command: Command) -> bool {
        let frame = command.encode();
        match self.transport.transmit_broadcast(&frame) {
            Ok(()) => {
                debug!("Issuer: broadcast {}", command.name());
                metrics::counter!(metric_defs::COMMANDS_SENT.name, "command" => command.name())
                    .increment(1);
                true
            }
            Err(e) => {
                warn!("Issuer: broadcast {} failed: {}", command.name(), e);
                metrics::counter!(metric_defs::COMMANDS_FAILED.name, "command" => command.name())
                    .increment(1);
                false
            }
        }
    }

    fn send_to(&self, address: RadioAddress, command: Command) -> bool {
        let frame = command.encode();
        match self.transport.transmit_addressed(address, &frame) {
            Ok(()) => {
                trace!("Issuer: {} -> {}", command.name(), address);
                metrics::counter!(metric_defs::COMMANDS_SENT.name, "command" => command.name())
                    .increment(1);
                true
            }
            Err(e) => {
                warn!("Issuer: {} to {} failed: {}", command.name(), address, e);
                metrics::counter!(metric_defs::COMMANDS_FAILED.name, "command" => command.name())
                    .increment(1);
                false
            }
        }
    }
}

/// Addresses of linked registry entries whose directory entry sends data.
pub fn data_request_targets(
    registry: &BoundedRegistry,
    directory: &BoundedDirectory,
) -> Vec<RadioAddress, MAX_FC> {
    registry
        .iter()
        .filter_map(|entry| directory.get(entry.directory_index()?))
        .filter(|d| d.connect_type.sends_data())
        .map(|d| d.address)
        .collect()
}

/// Addresses of directory entries that want a clock and lack a good one.
pub fn clock_test_targets(directory: &BoundedDirectory) -> Vec<RadioAddress, MAX_FC> {
    directory
        .iter()
        .filter(|d| d.connect_type.wants_clock() && !d.good_clock)
        .map(|d| d.address)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::TransportError;
    use crate::transport::{FrameSignal, ReceivedFrame};
    use parking_lot::Mutex;
    use podlink_protocol::ConnectType;
    use std::time::Duration;

    /// Transport that records every transmission.
    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<std::vec::Vec<(Option<RadioAddress>, std::vec::Vec<u8>)>>,
        fail: bool,
    }

    impl RadioTransport for RecordingTransport {
        fn transmit_broadcast(&self, frame: &[u8]) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::Closed);
            }
            self.sent.lock().push((None, frame.to_vec()));
            Ok(())
        }

        fn transmit_addressed(
            &self,
            address: RadioAddress,
            frame: &[u8],
        ) -> Result<(), TransportError> {
            if self.fail {
                return Err(TransportError::Closed);
            }
            self.sent.lock().push((Some(address), frame.to_vec()));
            Ok(())
        }

        fn resolve_address(&self, _name: &str) -> Option<RadioAddress> {
            None
        }

        fn has_incoming_frame(&self) -> bool {
            false
        }

        fn receive_frame(&self) -> Option<ReceivedFrame> {
            None
        }

        fn frame_signal(&self) -> FrameSignal {
            crossbeam_channel::never()
        }
    }

    fn issuer(transport: RecordingTransport) -> (CommandIssuer<RecordingTransport>, Arc<RecordingTransport>) {
        let transport = Arc::new(transport);
        let state = Arc::new(SharedState::new(Duration::from_millis(5)));
        let issuer = CommandIssuer::new(
            Arc::clone(&transport),
            Arc::new(ManualClock::new(0x6512_3456)),
            state,
        );
        (issuer, transport)
    }

    #[test]
    fn test_broadcasts_encode_commands() {
        let (issuer, transport) = issuer(RecordingTransport::default());

        assert!(issuer.invite());
        assert!(issuer.broadcast_launch_primed(5));
        assert!(issuer.broadcast_landed());

        let sent = transport.sent.lock();
        assert_eq!(sent[0], (None, vec![0x00]));
        assert_eq!(sent[1], (None, vec![0x01, 5]));
        assert_eq!(sent[2], (None, vec![0x04]));
    }

    #[test]
    fn test_clock_commands_carry_current_time() {
        let (issuer, transport) = issuer(RecordingTransport::default());
        let pod = RadioAddress(0xC);

        issuer.send_clock(pod);
        issuer.test_clock(pod);

        let sent = transport.sent.lock();
        assert_eq!(sent[0], (Some(pod), vec![0x20, 0x65, 0x12, 0x34, 0x56]));
        assert_eq!(sent[1], (Some(pod), vec![0x21, 0x65, 0x12, 0x34, 0x56]));
    }

    #[test]
    fn test_transmit_failure_is_swallowed() {
        let (issuer, _) = issuer(RecordingTransport {
            fail: true,
            ..Default::default()
        });

        assert!(!issuer.invite());
        assert!(!issuer.request_data(RadioAddress(1)));
    }

    #[test]
    fn test_data_targets_are_linked_clock_and_data_pods() {
        let mut directory = BoundedDirectory::new();
        directory.upsert(RadioAddress(0xA), ConnectType::ClockAndData);
        directory.upsert(RadioAddress(0xB), ConnectType::Decline);
        directory.upsert(RadioAddress(0xC), ConnectType::ClockOnly);
        directory.upsert(RadioAddress(0xD), ConnectType::ClockAndData);

        let mut registry = BoundedRegistry::new();
        for (n, slot) in [(1, 0), (2, 1), (3, 2)] {
            registry.register(n, "POD", 1).unwrap();
            registry.link(n as usize - 1, &directory, slot);
        }
        // Unlinked, so 0xD is not requested.
        registry.register(4, "POD4", 1).unwrap();

        assert_eq!(
            data_request_targets(&registry, &directory).as_slice(),
            &[RadioAddress(0xA)]
        );
    }

    #[test]
    fn test_clock_targets_skip_declined_and_good() {
        let mut directory = BoundedDirectory::new();
        directory.upsert(RadioAddress(0xA), ConnectType::ClockAndData);
        directory.upsert(RadioAddress(0xB), ConnectType::Decline);
        directory.upsert(RadioAddress(0xC), ConnectType::ClockOnly);
        directory.set_clock_quality(0, true);

        assert_eq!(clock_test_targets(&directory).as_slice(), &[RadioAddress(0xC)]);
    }

    #[test]
    fn test_fan_out_skipped_when_directory_locked() {
        let (issuer, transport) = issuer(RecordingTransport::default());
        issuer
            .state
            .directory()
            .unwrap()
            .upsert(RadioAddress(0xC), ConnectType::ClockOnly);

        let held = issuer.state.directory().unwrap();
        let sent = std::thread::scope(|s| s.spawn(|| issuer.test_all_clocks()).join().unwrap());
        drop(held);

        assert_eq!(sent, 0);
        assert!(transport.sent.lock().is_empty());
        assert_eq!(issuer.test_all_clocks(), 1);
    }
}
