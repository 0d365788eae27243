//! # podlink-sim
//!
//! A simulated radio for running the command module without hardware.
//!
//! [`SimRadio`] implements [`podlink_core::RadioTransport`] over a set of
//! scripted pods. Each pod answers invites with its configured connect type,
//! keeps the time from clock pushes, answers clock tests and replies to data
//! requests with seeded pseudo-random telemetry. Arbitrary frames can be
//! injected to exercise the listener with malformed or unexpected traffic.

mod pod;
mod radio;

pub use pod::{SimConnectType, SimPod, SimPodConfig};
pub use radio::{SentFrame, SimRadio};
