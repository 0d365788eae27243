//! Wall-clock source for clock push and clock test commands.

use std::sync::atomic::{AtomicU32, Ordering};

/// Source of the Unix time sent to pods.
pub trait WallClock: Send + Sync {
    /// Current Unix time in seconds.
    fn unix_time(&self) -> u32;
}

/// The host's system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn unix_time(&self) -> u32 {
        // Saturates outside the 32-bit range carried on the wire.
        chrono::Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU32,
}

impl ManualClock {
    /// Create a clock reading `unix_time`.
    pub fn new(unix_time: u32) -> Self {
        ManualClock {
            now: AtomicU32::new(unix_time),
        }
    }

    /// Set the current reading.
    pub fn set(&self, unix_time: u32) {
        self.now.store(unix_time, Ordering::Relaxed);
    }

    /// Move the clock forward.
    pub fn advance(&self, secs: u32) {
        self.now.fetch_add(secs, Ordering::Relaxed);
    }
}

impl WallClock for ManualClock {
    fn unix_time(&self) -> u32 {
        self.now.load(Ordering::Relaxed)
    }
}
