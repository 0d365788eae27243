//! # podlink-core
//!
//! Coordination of up to six flight-computer pods from a single command module
//! over a shared radio link.
//!
//! Two fixed-capacity collections are kept side by side:
//!
//! - **Directory**: devices that have answered an invite, keyed by radio
//!   address, with their connect type and clock quality.
//! - **Registry**: pods the operator expects, keyed by pod number, with their
//!   node identifier, payload length and latest telemetry.
//!
//! The reconciler links registry entries to directory slots by resolving node
//! identifiers through the radio. A background listener thread decodes inbound
//! frames and updates both collections; the command issuer sends broadcasts and
//! addressed requests.
//!
//! ## Locking
//!
//! Each collection sits behind its own lock, always acquired with a timeout.
//! Operations needing both take the registry first. An operation that cannot
//! get its lock in time changes nothing; periodic callers simply retry on their
//! next pass.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use podlink_core::{CommandModule, ModuleConfig, PodConfig};
//!
//! let config = ModuleConfig::default().with_pod(PodConfig::new(3, "POD3", 10));
//! let module = CommandModule::start(Arc::new(radio), &config)?;
//!
//! module.commands().invite();
//! module.sync_registry();
//! module.request_data_all();
//! if let Some(data) = module.drain_pod_data(3) {
//!     println!("pod 3: {:02X?}", data);
//! }
//! ```

mod clock;
mod config;
mod directory;
mod error;
mod guard;
mod handlers;
mod issuer;
mod listener;
mod module;
mod reconciler;
mod registry;
mod report;
mod transport;

pub use clock::{ManualClock, SystemClock, WallClock};
pub use config::{ModuleConfig, PodConfig, MAX_RESOLVE_ATTEMPTS};
pub use directory::{BoundedDirectory, DirectoryEntry};
pub use error::{ConfigError, ModuleError, RegistryError, TransportError};
pub use guard::{Guarded, SharedState};
pub use handlers::{
    handle_clock_test, handle_pod_data, handle_rsvp, ClockOutcome, PodDataOutcome, RsvpOutcome,
};
pub use issuer::{clock_test_targets, data_request_targets, CommandIssuer};
pub use listener::{
    spawn_listener, Dispatch, Dispatcher, ListenerHandle, ListenerReport, ListenerState,
};
pub use module::CommandModule;
pub use reconciler::{sync_registry, ReconcileSummary};
pub use registry::{BoundedRegistry, PodData, PodName, RegistryEntry};
pub use report::{
    DirectoryReport, DirectoryRow, PodDataReport, PodDataRow, RegistryReport, RegistryRow,
};
pub use transport::{FrameSignal, RadioTransport, ReceivedFrame};

// Re-export the wire types callers need alongside the module.
pub use podlink_protocol::{Command, ConnectType, RadioAddress, Response};
