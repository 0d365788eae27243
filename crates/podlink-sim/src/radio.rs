//! In-process radio connecting the command module to scripted pods.
//!
//! Transmissions are delivered synchronously: a pod's reply is queued before
//! `transmit_*` returns, and the frame signal is raised once per queued frame.

use std::collections::VecDeque;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use podlink_core::{FrameSignal, RadioTransport, ReceivedFrame, TransportError};
use podlink_protocol::{Command, RadioAddress, MAX_MSG_LENGTH};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace, warn};

use crate::pod::{SimPod, SimPodConfig};

/// A frame the command module transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFrame {
    /// `None` for a broadcast.
    pub destination: Option<RadioAddress>,
    pub data: Vec<u8>,
}

/// Simulated radio with a set of pods in range.
pub struct SimRadio {
    pods: Mutex<Vec<SimPod>>,
    rng: Mutex<ChaCha8Rng>,
    inbox: Mutex<VecDeque<ReceivedFrame>>,
    sent: Mutex<Vec<SentFrame>>,
    signal_tx: Mutex<Option<Sender<()>>>,
    signal_rx: Receiver<()>,
}

impl SimRadio {
    /// Create a radio with `pods` in range. `seed` drives telemetry contents.
    pub fn new(pods: impl IntoIterator<Item = SimPodConfig>, seed: u64) -> Self {
        let (signal_tx, signal_rx) = crossbeam_channel::unbounded();
        SimRadio {
            pods: Mutex::new(pods.into_iter().map(SimPod::new).collect()),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            inbox: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            signal_tx: Mutex::new(Some(signal_tx)),
            signal_rx,
        }
    }

    /// Bring another pod into range.
    pub fn add_pod(&self, config: SimPodConfig) {
        self.pods.lock().push(SimPod::new(config));
    }

    /// Queue an arbitrary inbound frame from `sender` and raise the signal.
    pub fn inject(&self, sender: RadioAddress, data: Vec<u8>) {
        trace!("SimRadio: inject {} bytes from {}", data.len(), sender);
        self.inbox.lock().push_back(ReceivedFrame::new(sender, data));
        self.raise_signal();
    }

    /// Drop the signal sender, which stops the listener.
    pub fn close(&self) {
        self.signal_tx.lock().take();
    }

    /// Every frame transmitted so far.
    pub fn sent_frames(&self) -> Vec<SentFrame> {
        self.sent.lock().clone()
    }

    /// Frames transmitted to `address`.
    pub fn sent_to(&self, address: RadioAddress) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .iter()
            .filter(|f| f.destination == Some(address))
            .map(|f| f.data.clone())
            .collect()
    }

    /// Forget transmitted frames.
    pub fn clear_sent(&self) {
        self.sent.lock().clear();
    }

    /// Snapshot of the pod at `address`.
    pub fn pod(&self, address: RadioAddress) -> Option<SimPod> {
        self.pods
            .lock()
            .iter()
            .find(|p| p.config.radio_address() == address)
            .cloned()
    }

    /// Change whether the pod at `address` passes clock tests.
    pub fn set_clock_good(&self, address: RadioAddress, good: bool) -> bool {
        self.with_pod(address, |pod| pod.config.clock_good = good)
    }

    /// Change the telemetry length of the pod at `address`.
    pub fn set_payload_length(&self, address: RadioAddress, length: usize) -> bool {
        self.with_pod(address, |pod| pod.config.payload_length = length)
    }

    /// Change whether the pod at `address` can be resolved by name.
    pub fn set_discoverable(&self, address: RadioAddress, discoverable: bool) -> bool {
        self.with_pod(address, |pod| pod.config.discoverable = discoverable)
    }

    /// Inbound frames not yet taken by the listener.
    pub fn pending_frames(&self) -> usize {
        self.inbox.lock().len()
    }

    fn with_pod(&self, address: RadioAddress, f: impl FnOnce(&mut SimPod)) -> bool {
        let mut pods = self.pods.lock();
        match pods.iter_mut().find(|p| p.config.radio_address() == address) {
            Some(pod) => {
                f(pod);
                true
            }
            None => false,
        }
    }

    fn raise_signal(&self) {
        if let Some(tx) = self.signal_tx.lock().as_ref() {
            let _ = tx.send(());
        }
    }

    fn record(&self, destination: Option<RadioAddress>, frame: &[u8]) -> Result<Command, TransportError> {
        if frame.len() > MAX_MSG_LENGTH {
            return Err(TransportError::FrameTooLong {
                max: MAX_MSG_LENGTH,
                actual: frame.len(),
            });
        }
        if self.signal_tx.lock().is_none() {
            return Err(TransportError::Closed);
        }
        self.sent.lock().push(SentFrame {
            destination,
            data: frame.to_vec(),
        });

        Command::decode(frame).map_err(|e| TransportError::TransmitFailed {
            destination: destination.unwrap_or(RadioAddress::BROADCAST),
            reason: e.to_string(),
        })
    }

    /// Deliver `command` to the pods selected by `targets` and queue replies.
    fn deliver(&self, command: Command, targets: impl Fn(&SimPod) -> bool) -> usize {
        let replies: Vec<ReceivedFrame> = {
            let mut pods = self.pods.lock();
            let mut rng = self.rng.lock();
            pods.iter_mut()
                .filter(|p| targets(&**p))
                .filter_map(|pod| {
                    let reply = pod.handle(command, &mut rng)?;
                    Some(ReceivedFrame::new(pod.config.radio_address(), reply.encode()))
                })
                .collect()
        };

        let count = replies.len();
        for reply in replies {
            self.inject(reply.sender, reply.data);
        }
        count
    }
}

impl RadioTransport for SimRadio {
    fn transmit_broadcast(&self, frame: &[u8]) -> Result<(), TransportError> {
        let command = self.record(None, frame)?;
        let replies = self.deliver(command, |_| true);
        debug!("SimRadio: broadcast {} -> {} replies", command.name(), replies);
        Ok(())
    }

    fn transmit_addressed(&self, address: RadioAddress, frame: &[u8]) -> Result<(), TransportError> {
        let command = self.record(Some(address), frame)?;
        if self.pod(address).is_none() {
            warn!("SimRadio: no pod at {}", address);
            return Err(TransportError::TransmitFailed {
                destination: address,
                reason: "no acknowledgement".to_string(),
            });
        }
        self.deliver(command, |p| p.config.radio_address() == address);
        Ok(())
    }

    fn resolve_address(&self, name: &str) -> Option<RadioAddress> {
        self.pods
            .lock()
            .iter()
            .find(|p| p.config.discoverable && p.config.name == name)
            .map(|p| p.config.radio_address())
    }

    fn has_incoming_frame(&self) -> bool {
        !self.inbox.lock().is_empty()
    }

    fn receive_frame(&self) -> Option<ReceivedFrame> {
        self.inbox.lock().pop_front()
    }

    fn frame_signal(&self) -> FrameSignal {
        self.signal_rx.clone()
    }
}
