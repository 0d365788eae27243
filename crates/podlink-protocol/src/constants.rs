//! Protocol constants
//!
//! Message codes and size limits for the command module ↔ pod radio protocol.

// ============================================================================
// Command Codes (module → pods)
// ============================================================================

/// Invite every listening pod to connect (broadcast).
pub const CMD_INVITE: u8 = 0x00;
/// Launch primed, followed by the telemetry interval in seconds (broadcast).
pub const CMD_LAUNCH_PRIMED: u8 = 0x01;
/// Launch detected (broadcast).
pub const CMD_LAUNCH_DETECTED: u8 = 0x02;
/// Descent detected (broadcast).
pub const CMD_DESCENT_DETECTED: u8 = 0x03;
/// Landing detected (broadcast).
pub const CMD_LANDED: u8 = 0x04;
/// Push the module's Unix time to a pod (addressed).
pub const CMD_CLOCK_PUSH: u8 = 0x20;
/// Ask a pod to compare its clock against the module's Unix time (addressed).
pub const CMD_CLOCK_TEST: u8 = 0x21;
/// Ask a pod for its latest telemetry (addressed).
pub const CMD_DATA_REQUEST: u8 = 0x40;

// ============================================================================
// Response Codes (pod → module)
// ============================================================================

/// Reply to an invite carrying the pod's connect type.
pub const RESP_CODE_RSVP: u8 = 0x10;
/// Result of a clock test.
pub const RESP_CODE_CLOCK_TEST: u8 = 0x31;
/// Pod telemetry payload.
pub const RESP_CODE_POD_DATA: u8 = 0x50;

// ============================================================================
// Connect Types (RSVP payload)
// ============================================================================

/// Pod declines any connection.
pub const CONNECT_DECLINE: u8 = 0x00;
/// Pod wants the clock but sends no data.
pub const CONNECT_CLOCK_ONLY: u8 = 0x01;
/// Pod wants the clock and sends data during flight.
pub const CONNECT_CLOCK_AND_DATA: u8 = 0x02;

/// Clock test result byte reported by a pod whose clock agrees.
pub const CLOCK_TEST_GOOD: u8 = 0x00;

// ============================================================================
// Size Limits
// ============================================================================

/// Maximum number of pods the command module tracks.
pub const MAX_FC: usize = 6;

/// Maximum size of a single radio message, code byte included.
pub const MAX_MSG_LENGTH: usize = 110;

/// Maximum pod telemetry payload, code byte excluded.
pub const MAX_POD_DATA_BYTES: usize = 100;

/// Maximum length of a pod's node identifier.
pub const MAX_NAME_LENGTH: usize = 21;
