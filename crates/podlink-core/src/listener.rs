//! Background listener.
//!
//! One thread per session waits on the transport's frame signal, then drains
//! every readable frame through the [`Dispatcher`] before waiting again:
//!
//! ```text
//! WaitingForSignal --signal--> Draining --no frames left--> WaitingForSignal
//! ```
//!
//! Blocking on the signal is the only place the thread suspends, apart from
//! the bounded lock waits inside dispatch.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{select, Receiver, Sender};
use podlink_metrics::metric_defs;
use podlink_protocol::{ProtocolError, RadioAddress, Response};
use tracing::{debug, trace, warn};

use crate::error::ModuleError;
use crate::guard::SharedState;
use crate::handlers::{
    handle_clock_test, handle_pod_data, handle_rsvp, ClockOutcome, PodDataOutcome, RsvpOutcome,
};
use crate::issuer::CommandIssuer;
use crate::transport::{FrameSignal, RadioTransport, ReceivedFrame};

// ============================================================================
// Dispatch
// ============================================================================

/// What the dispatcher did with one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// RSVP handled.
    Rsvp(RsvpOutcome),
    /// Clock test result handled.
    ClockTest(ClockOutcome),
    /// Pod data handled.
    PodData(PodDataOutcome),
    /// Frame could not be decoded; ignored.
    Unexpected(ProtocolError),
    /// Lock not acquired in time; frame dropped.
    Skipped,
}

/// A dispatched frame, reported to an observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerReport {
    /// Sender of the frame.
    pub sender: RadioAddress,
    /// What happened to it.
    pub dispatch: Dispatch,
}

/// Decodes inbound frames and routes them to the handlers.
pub struct Dispatcher<T: ?Sized> {
    transport: Arc<T>,
    state: Arc<SharedState>,
    issuer: CommandIssuer<T>,
    reports: Option<Sender<ListenerReport>>,
}

impl<T: RadioTransport + ?Sized> Dispatcher<T> {
    /// Create a dispatcher. Clock pushes requested by RSVPs go out through `issuer`.
    pub fn new(transport: Arc<T>, state: Arc<SharedState>, issuer: CommandIssuer<T>) -> Self {
        Dispatcher {
            transport,
            state,
            issuer,
            reports: None,
        }
    }

    /// Report every dispatched frame on `reports`.
    pub fn with_reports(mut self, reports: Sender<ListenerReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Handle one frame.
    pub fn dispatch(&self, frame: &ReceivedFrame) -> Dispatch {
        metrics::counter!(metric_defs::FRAMES_RECEIVED.name).increment(1);

        let response = match Response::decode(&frame.data) {
            Ok(response) => response,
            Err(e) => {
                warn!("Listener: unexpected frame from {}: {}", frame.sender, e);
                metrics::counter!(metric_defs::FRAMES_UNEXPECTED.name, "reason" => unexpected_reason(&e))
                    .increment(1);
                return Dispatch::Unexpected(e);
            }
        };

        match response {
            Response::Rsvp { connect_type } => {
                let outcome = {
                    let Some(mut directory) = self.state.directory() else {
                        return Dispatch::Skipped;
                    };
                    handle_rsvp(&mut directory, frame.sender, connect_type)
                };
                if let RsvpOutcome::Recorded {
                    clock_push: Some(address),
                    ..
                } = outcome
                {
                    self.issuer.send_clock(address);
                }
                Dispatch::Rsvp(outcome)
            }
            Response::ClockTestResult { good } => {
                let Some(mut directory) = self.state.directory() else {
                    return Dispatch::Skipped;
                };
                Dispatch::ClockTest(handle_clock_test(&mut directory, frame.sender, good))
            }
            Response::PodData(payload) => {
                let Some((mut registry, directory)) = self.state.both() else {
                    return Dispatch::Skipped;
                };
                Dispatch::PodData(handle_pod_data(
                    &mut registry,
                    &directory,
                    frame.sender,
                    &payload,
                ))
            }
        }
    }

    /// Dispatch frames until the transport has none left. Returns the count.
    pub fn drain(&self) -> usize {
        let mut handled = 0;
        while self.transport.has_incoming_frame() {
            let Some(frame) = self.transport.receive_frame() else {
                break;
            };
            let dispatch = self.dispatch(&frame);
            if dispatch == Dispatch::Skipped {
                debug!("Listener: locks busy, dropped frame from {}", frame.sender);
            }
            if let Some(reports) = &self.reports {
                let _ = reports.send(ListenerReport {
                    sender: frame.sender,
                    dispatch,
                });
            }
            handled += 1;
        }
        handled
    }
}

fn unexpected_reason(error: &ProtocolError) -> &'static str {
    match error {
        ProtocolError::UnknownResponse(_) | ProtocolError::UnknownCommand(_) => "unknown_code",
        ProtocolError::InvalidConnectType(_) => "connect_type",
        ProtocolError::FrameTooShort { .. } => "too_short",
        ProtocolError::FrameTooLong { .. } => "too_long",
    }
}

// ============================================================================
// Listener thread
// ============================================================================

/// Listener loop states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Blocked on the frame signal.
    WaitingForSignal,
    /// Dispatching readable frames.
    Draining,
}

/// Handle to a running listener thread.
///
/// Dropping the handle stops the thread and waits for it.
pub struct ListenerHandle {
    shutdown_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ListenerHandle {
    /// Check if the listener thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, |t| t.is_finished())
    }

    /// Stop the listener and wait for it to exit.
    pub fn shutdown(&mut self) {
        // Disconnecting the channel wakes the select below.
        self.shutdown_tx.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Listener: thread panicked");
            }
        }
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawn the listener thread for `dispatcher`.
pub fn spawn_listener<T>(dispatcher: Dispatcher<T>) -> Result<ListenerHandle, ModuleError>
where
    T: RadioTransport + ?Sized + 'static,
{
    let signal = dispatcher.transport.frame_signal();
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

    let thread = thread::Builder::new()
        .name("podlink-listener".to_string())
        .spawn(move || listener_main(dispatcher, signal, shutdown_rx))
        .map_err(ModuleError::ListenerSpawn)?;

    Ok(ListenerHandle {
        shutdown_tx: Some(shutdown_tx),
        thread: Some(thread),
    })
}

/// Main function for the listener thread.
///
/// Runs until shut down or until the transport drops its signal sender.
fn listener_main<T>(dispatcher: Dispatcher<T>, signal: FrameSignal, shutdown_rx: Receiver<()>)
where
    T: RadioTransport + ?Sized,
{
    debug!("Listener: started");
    let mut state = ListenerState::WaitingForSignal;

    loop {
        state = match state {
            ListenerState::WaitingForSignal => select! {
                recv(signal) -> msg => match msg {
                    Ok(()) => ListenerState::Draining,
                    Err(_) => {
                        debug!("Listener: frame signal closed");
                        break;
                    }
                },
                recv(shutdown_rx) -> _ => break,
            },
            ListenerState::Draining => {
                let handled = dispatcher.drain();
                trace!("Listener: drained {} frame(s)", handled);
                ListenerState::WaitingForSignal
            }
        };
    }

    debug!("Listener: stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::TransportError;
    use parking_lot::Mutex;
    use podlink_protocol::ConnectType;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Transport fed by the test, recording addressed transmissions.
    struct QueueTransport {
        inbox: Mutex<VecDeque<ReceivedFrame>>,
        sent: Mutex<Vec<(RadioAddress, Vec<u8>)>>,
        signal_tx: Mutex<Option<Sender<()>>>,
        signal_rx: Receiver<()>,
    }

    impl QueueTransport {
        fn new() -> Self {
            let (tx, rx) = crossbeam_channel::unbounded();
            QueueTransport {
                inbox: Mutex::new(VecDeque::new()),
                sent: Mutex::new(Vec::new()),
                signal_tx: Mutex::new(Some(tx)),
                signal_rx: rx,
            }
        }

        fn push(&self, sender: u64, data: &[u8]) {
            self.inbox
                .lock()
                .push_back(ReceivedFrame::new(RadioAddress(sender), data.to_vec()));
            if let Some(tx) = self.signal_tx.lock().as_ref() {
                let _ = tx.send(());
            }
        }

        fn close(&self) {
            self.signal_tx.lock().take();
        }
    }

    impl RadioTransport for QueueTransport {
        fn transmit_broadcast(&self, _frame: &[u8]) -> Result<(), TransportError> {
            Ok(())
        }

        fn transmit_addressed(
            &self,
            address: RadioAddress,
            frame: &[u8],
        ) -> Result<(), TransportError> {
            self.sent.lock().push((address, frame.to_vec()));
            Ok(())
        }

        fn resolve_address(&self, _name: &str) -> Option<RadioAddress> {
            None
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

    fn dispatcher() -> (Dispatcher<QueueTransport>, Arc<QueueTransport>, Arc<SharedState>) {
        let transport = Arc::new(QueueTransport::new());
        let state = Arc::new(SharedState::new(Duration::from_millis(10)));
        let issuer = CommandIssuer::new(
            Arc::clone(&transport),
            Arc::new(ManualClock::new(1)),
            Arc::clone(&state),
        );
        let dispatcher = Dispatcher::new(Arc::clone(&transport), Arc::clone(&state), issuer);
        (dispatcher, transport, state)
    }

    #[test]
    fn test_rsvp_recorded_and_clock_pushed() {
        let (dispatcher, transport, state) = dispatcher();

        let dispatch = dispatcher.dispatch(&ReceivedFrame::new(RadioAddress(0xA), vec![0x10, 0x02]));

        assert_eq!(
            dispatch,
            Dispatch::Rsvp(RsvpOutcome::Recorded {
                index: 0,
                clock_push: Some(RadioAddress(0xA))
            })
        );
        assert_eq!(
            state.directory().unwrap().get(0).unwrap().connect_type,
            ConnectType::ClockAndData
        );
        assert_eq!(
            transport.sent.lock().as_slice(),
            &[(RadioAddress(0xA), vec![0x20, 0, 0, 0, 1])]
        );
    }

    #[test]
    fn test_declined_rsvp_gets_no_clock() {
        let (dispatcher, transport, _) = dispatcher();

        dispatcher.dispatch(&ReceivedFrame::new(RadioAddress(0xB), vec![0x10, 0x00]));

        assert!(transport.sent.lock().is_empty());
    }

    #[test]
    fn test_unexpected_frames_ignored() {
        let (dispatcher, _, state) = dispatcher();

        let unknown = dispatcher.dispatch(&ReceivedFrame::new(RadioAddress(0xA), vec![0x77]));
        let bad_type = dispatcher.dispatch(&ReceivedFrame::new(RadioAddress(0xA), vec![0x10, 0x09]));

        assert_eq!(unknown, Dispatch::Unexpected(ProtocolError::UnknownResponse(0x77)));
        assert_eq!(bad_type, Dispatch::Unexpected(ProtocolError::InvalidConnectType(0x09)));
        assert!(state.directory().unwrap().is_empty());
    }

    #[test]
    fn test_frame_dropped_when_directory_locked() {
        let (dispatcher, _, state) = dispatcher();

        let held = state.directory().unwrap();
        let dispatch = std::thread::scope(|s| {
            s.spawn(|| dispatcher.dispatch(&ReceivedFrame::new(RadioAddress(0xA), vec![0x10, 0x01])))
                .join()
                .unwrap()
        });
        drop(held);

        assert_eq!(dispatch, Dispatch::Skipped);
        assert!(state.directory().unwrap().is_empty());
    }

    #[test]
    fn test_listener_drains_and_reports() {
        let (dispatcher, transport, state) = dispatcher();
        let (report_tx, report_rx) = crossbeam_channel::unbounded();
        let mut handle = spawn_listener(dispatcher.with_reports(report_tx)).unwrap();

        transport.push(0xA, &[0x10, 0x01]);
        transport.push(0xA, &[0x31, 0x00]);

        let first = report_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = report_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(first.dispatch, Dispatch::Rsvp(_)));
        assert_eq!(
            second.dispatch,
            Dispatch::ClockTest(ClockOutcome::Updated { index: 0, good: true })
        );
        assert!(state.directory().unwrap().get(0).unwrap().good_clock);

        handle.shutdown();
        assert!(handle.is_finished());
    }

    #[test]
    fn test_listener_exits_when_signal_closes() {
        let (dispatcher, transport, _) = dispatcher();
        let handle = spawn_listener(dispatcher).unwrap();

        transport.close();

        for _ in 0..200 {
            if handle.is_finished() {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        assert!(handle.is_finished());
    }
}
