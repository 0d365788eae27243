//! Protocol data types.

use crate::constants::*;
use crate::error::ProtocolError;
use std::fmt;

/// 64-bit radio address of a pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RadioAddress(pub u64);

impl RadioAddress {
    /// Broadcast address used by the radio layer. Never a device address.
    pub const BROADCAST: RadioAddress = RadioAddress(0x0000_0000_0000_FFFF);

    /// Whether this address can identify a single pod.
    pub fn is_device(&self) -> bool {
        self.0 != 0 && *self != Self::BROADCAST
    }
}

impl From<u64> for RadioAddress {
    fn from(value: u64) -> Self {
        RadioAddress(value)
    }
}

impl fmt::Display for RadioAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

/// Connection type a pod declares in its RSVP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectType {
    /// Decline any connection.
    Decline,
    /// Clock synchronization only.
    ClockOnly,
    /// Clock synchronization and telemetry during flight.
    ClockAndData,
}

impl ConnectType {
    /// Whether a pod of this type receives the module's clock.
    pub fn wants_clock(&self) -> bool {
        matches!(self, ConnectType::ClockOnly | ConnectType::ClockAndData)
    }

    /// Whether a pod of this type reports telemetry.
    pub fn sends_data(&self) -> bool {
        matches!(self, ConnectType::ClockAndData)
    }
}

impl TryFrom<u8> for ConnectType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            CONNECT_DECLINE => Ok(ConnectType::Decline),
            CONNECT_CLOCK_ONLY => Ok(ConnectType::ClockOnly),
            CONNECT_CLOCK_AND_DATA => Ok(ConnectType::ClockAndData),
            other => Err(ProtocolError::InvalidConnectType(other)),
        }
    }
}

impl From<ConnectType> for u8 {
    fn from(value: ConnectType) -> Self {
        match value {
            ConnectType::Decline => CONNECT_DECLINE,
            ConnectType::ClockOnly => CONNECT_CLOCK_ONLY,
            ConnectType::ClockAndData => CONNECT_CLOCK_AND_DATA,
        }
    }
}

impl fmt::Display for ConnectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectType::Decline => write!(f, "decline"),
            ConnectType::ClockOnly => write!(f, "clock-only"),
            ConnectType::ClockAndData => write!(f, "clock+data"),
        }
    }
}
