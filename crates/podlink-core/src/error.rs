//! Error types for the command module.
//!
//! None of these ever reach a caller of the periodic operations: those degrade
//! to "no change this time". They surface from construction, configuration
//! and the transport seam, where the caller can act on them.

use podlink_protocol::RadioAddress;
use thiserror::Error;

/// Errors reported by a radio transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The radio refused or failed the transmission.
    #[error("transmission to {destination} failed: {reason}")]
    TransmitFailed {
        /// Destination, or the broadcast address.
        destination: RadioAddress,
        /// Transport-specific reason.
        reason: String,
    },

    /// Frame exceeds what the radio can carry.
    #[error("frame too long: maximum {max} bytes, got {actual}")]
    FrameTooLong {
        /// Maximum frame size.
        max: usize,
        /// Attempted frame size.
        actual: usize,
    },

    /// The radio link has been shut down.
    #[error("radio link closed")]
    Closed,
}

/// Reasons a registration is refused.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Registry already holds the maximum number of pods.
    #[error("registry full ({capacity} pods)")]
    Full {
        /// Registry capacity.
        capacity: usize,
    },

    /// A pod with this number is already registered.
    #[error("pod {0} already registered")]
    DuplicatePod(u8),

    /// Node identifier does not fit the registry's name field.
    #[error("pod name '{name}' longer than {max} bytes")]
    NameTooLong {
        /// Offending name.
        name: String,
        /// Maximum length.
        max: usize,
    },

    /// Declared payload does not fit the pod data buffer.
    #[error("expected length {actual} exceeds pod buffer of {max} bytes")]
    PayloadTooLarge {
        /// Buffer capacity.
        max: usize,
        /// Declared length.
        actual: usize,
    },
}

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// More pods configured than the module can track.
    #[error("{count} pods configured, at most {max} supported")]
    TooManyPods {
        /// Configured pods.
        count: usize,
        /// Capacity.
        max: usize,
    },

    /// A pod definition would be refused by the registry.
    #[error("invalid pod definition: {0}")]
    InvalidPod(#[from] RegistryError),

    /// Lock timeout must be non-zero.
    #[error("lock timeout must be greater than zero")]
    ZeroLockTimeout,

    /// Resolution attempts outside the allowed range. Reconciliation holds
    /// both locks for up to this many lock timeouts per unlinked pod.
    #[error("{attempts} resolve attempts configured, expected 1 to {max}")]
    ResolveAttempts {
        /// Configured attempts.
        attempts: u32,
        /// Upper bound.
        max: u32,
    },
}

/// Errors starting the command module.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Configuration rejected.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The listener thread could not be spawned.
    #[error("failed to spawn listener thread: {0}")]
    ListenerSpawn(std::io::Error),
}
