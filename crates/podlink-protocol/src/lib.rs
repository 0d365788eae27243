//! Command module ↔ pod radio protocol
//!
//! This crate provides the message types exchanged between the command module
//! and the flight-computer pods it coordinates. Every radio frame starts with a
//! single code byte; any payload that follows is fixed by that code and all
//! multi-byte integers are big-endian.
//!
//! # Protocol Overview
//!
//! - **Commands** (module → pods): broadcast flight-phase announcements and
//!   addressed clock / data requests, codes `0x00..=0x04`, `0x20`, `0x21`, `0x40`.
//! - **Responses** (pod → module): RSVP replies, clock test results and pod
//!   telemetry, codes `0x10`, `0x31`, `0x50`.
//!
//! Framing, addressing and delivery belong to the radio transport; this crate
//! only deals with the payload of a single frame.
//!
//! # Example
//!
//! ```rust
//! use podlink_protocol::{Command, ConnectType, Response};
//!
//! let frame = Command::ClockPush { unix_time: 0x5F5E_1000 }.encode();
//! assert_eq!(frame, vec![0x20, 0x5F, 0x5E, 0x10, 0x00]);
//!
//! let reply = Response::decode(&[0x10, 0x02]).unwrap();
//! assert_eq!(reply, Response::Rsvp { connect_type: ConnectType::ClockAndData });
//! ```

mod commands;
mod constants;
mod error;
mod responses;
mod types;

pub use commands::*;
pub use constants::*;
pub use error::*;
pub use responses::*;
pub use types::*;
