//! Inbound message handlers.
//!
//! Each handler takes the collection(s) it mutates by reference and returns
//! what happened. Locking is the caller's job, and so is any transmission a
//! handler asks for: the listener sends it after releasing the lock.

use podlink_metrics::metric_defs;
use podlink_protocol::{ConnectType, RadioAddress};
use tracing::{debug, warn};

use crate::directory::BoundedDirectory;
use crate::registry::BoundedRegistry;

/// Result of handling an RSVP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsvpOutcome {
    /// Sender recorded in `index`.
    Recorded {
        /// Directory slot.
        index: usize,
        /// Address to push the clock to, if the pod wants a clock.
        clock_push: Option<RadioAddress>,
    },
    /// New sender and no free slot; nothing recorded.
    DirectoryFull,
}

/// Result of handling a clock test reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockOutcome {
    /// Clock flag of `index` set to `good`.
    Updated {
        /// Directory slot.
        index: usize,
        /// Reported clock quality.
        good: bool,
    },
    /// Sender is not in the directory.
    UnknownSender,
}

/// Result of handling a pod data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodDataOutcome {
    /// Payload stored and marked fresh.
    Stored {
        /// Registry slot.
        registry_index: usize,
        /// Pod number of the entry.
        pod_number: u8,
    },
    /// Payload length differs from what the pod was registered with.
    LengthMismatch {
        /// Pod number of the entry.
        pod_number: u8,
        /// Registered payload length.
        expected: usize,
        /// Received payload length.
        actual: usize,
    },
    /// No registry entry is linked to the sender.
    UnknownSender,
}

/// Record an RSVP from `sender`.
pub fn handle_rsvp(
    directory: &mut BoundedDirectory,
    sender: RadioAddress,
    connect_type: ConnectType,
) -> RsvpOutcome {
    metrics::counter!(
        metric_defs::RSVPS_RECEIVED.name,
        "connect_type" => connect_type.to_string()
    )
    .increment(1);

    let Some(index) = directory.upsert(sender, connect_type) else {
        warn!("RSVP: directory full, dropping {} ({})", sender, connect_type);
        metrics::counter!(metric_defs::RSVPS_DROPPED.name).increment(1);
        return RsvpOutcome::DirectoryFull;
    };

    debug!("RSVP: {} is {} in slot {}", sender, connect_type, index);
    let clock_push = connect_type.wants_clock().then_some(sender);
    RsvpOutcome::Recorded { index, clock_push }
}

/// Record a clock test result from `sender`.
pub fn handle_clock_test(
    directory: &mut BoundedDirectory,
    sender: RadioAddress,
    good: bool,
) -> ClockOutcome {
    let Some(index) = directory.find_by_address(sender) else {
        debug!("Clock: result from unknown sender {}", sender);
        return ClockOutcome::UnknownSender;
    };

    directory.set_clock_quality(index, good);
    let result = if good { "good" } else { "bad" };
    metrics::counter!(metric_defs::CLOCK_RESULTS.name, "result" => result).increment(1);
    debug!("Clock: {} reports {} clock", sender, result);
    ClockOutcome::Updated { index, good }
}

/// Store a telemetry payload from `sender`. `payload` excludes the code byte.
pub fn handle_pod_data(
    registry: &mut BoundedRegistry,
    directory: &BoundedDirectory,
    sender: RadioAddress,
    payload: &[u8],
) -> PodDataOutcome {
    let Some(registry_index) = registry.find_linked_to(directory, sender) else {
        debug!("PodData: {} bytes from unlinked sender {}", payload.len(), sender);
        metrics::counter!(metric_defs::POD_DATA_REJECTED.name, "reason" => "unknown_sender")
            .increment(1);
        return PodDataOutcome::UnknownSender;
    };

    let Some(entry) = registry.get(registry_index) else {
        return PodDataOutcome::UnknownSender;
    };
    let pod_number = entry.pod_number();
    let expected = entry.expected_length();

    if !registry.write_payload(registry_index, payload) {
        warn!(
            "PodData: pod {} sent {} bytes, expected {}; discarded",
            pod_number,
            payload.len(),
            expected
        );
        metrics::counter!(metric_defs::POD_DATA_REJECTED.name, "reason" => "length").increment(1);
        return PodDataOutcome::LengthMismatch {
            pod_number,
            expected,
            actual: payload.len(),
        };
    }

    metrics::counter!(metric_defs::POD_DATA_ACCEPTED.name).increment(1);
    metrics::histogram!(metric_defs::POD_DATA_SIZE.name).record(payload.len() as f64);
    PodDataOutcome::Stored {
        registry_index,
        pod_number,
    }
}
