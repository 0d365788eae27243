//! The radio transport the command module drives.
//!
//! A transport frames and deframes packets, resolves node identifiers to radio
//! addresses and raises a signal whenever an inbound frame becomes available.
//! The XBee driver on the flight hardware and the simulated radio in
//! `podlink-sim` both implement [`RadioTransport`].

use crossbeam_channel::Receiver;
use podlink_protocol::RadioAddress;

use crate::error::TransportError;

/// Wakeup signal raised by a transport when a frame becomes readable.
///
/// One `()` is sent per wakeup; a transport may coalesce several frames into
/// a single signal. The listener stops when the sending side is dropped.
pub type FrameSignal = Receiver<()>;

/// A frame pulled from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    /// Radio address of the sender.
    pub sender: RadioAddress,
    /// Frame payload, starting with the message code.
    pub data: Vec<u8>,
}

impl ReceivedFrame {
    /// Create a frame from `sender`.
    pub fn new(sender: RadioAddress, data: Vec<u8>) -> Self {
        ReceivedFrame { sender, data }
    }
}

/// Radio link used by the command module.
pub trait RadioTransport: Send + Sync {
    /// Send a frame to every pod in range.
    fn transmit_broadcast(&self, frame: &[u8]) -> Result<(), TransportError>;

    /// Send a frame to a single pod.
    fn transmit_addressed(&self, address: RadioAddress, frame: &[u8]) -> Result<(), TransportError>;

    /// Resolve a node identifier to the radio address of the device using it.
    fn resolve_address(&self, name: &str) -> Option<RadioAddress>;

    /// Whether a received frame is waiting.
    fn has_incoming_frame(&self) -> bool;

    /// Take the next received frame, if any.
    fn receive_frame(&self) -> Option<ReceivedFrame>;

    /// Signal the listener blocks on between frames.
    fn frame_signal(&self) -> FrameSignal;
}
