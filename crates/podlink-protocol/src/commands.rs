//! Commands the command module sends to pods.

use bytes::BufMut;

use crate::constants::*;
use crate::error::*;

/// Commands sent from the command module to pods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Invite pods to connect. Broadcast.
    Invite,

    /// Launch primed. Broadcast.
    LaunchPrimed {
        /// Time between telemetry transmissions, in seconds.
        interval_secs: u8,
    },

    /// Launch detected. Broadcast.
    LaunchDetected,

    /// Descent detected. Broadcast.
    DescentDetected,

    /// Landing detected. Broadcast.
    Landed,

    /// Set the pod's clock.
    ClockPush {
        /// Unix timestamp in seconds.
        unix_time: u32,
    },

    /// Ask the pod whether its clock agrees with ours.
    ClockTest {
        /// Unix timestamp in seconds.
        unix_time: u32,
    },

    /// Ask the pod for its latest telemetry.
    DataRequest,
}

impl Command {
    /// Get the command code for this command.
    pub fn code(&self) -> u8 {
        match self {
            Command::Invite => CMD_INVITE,
            Command::LaunchPrimed { .. } => CMD_LAUNCH_PRIMED,
            Command::LaunchDetected => CMD_LAUNCH_DETECTED,
            Command::DescentDetected => CMD_DESCENT_DETECTED,
            Command::Landed => CMD_LANDED,
            Command::ClockPush { .. } => CMD_CLOCK_PUSH,
            Command::ClockTest { .. } => CMD_CLOCK_TEST,
            Command::DataRequest => CMD_DATA_REQUEST,
        }
    }

    /// Short name for logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Invite => "invite",
            Command::LaunchPrimed { .. } => "launch_primed",
            Command::LaunchDetected => "launch_detected",
            Command::DescentDetected => "descent_detected",
            Command::Landed => "landed",
            Command::ClockPush { .. } => "clock_push",
            Command::ClockTest { .. } => "clock_test",
            Command::DataRequest => "data_request",
        }
    }

    /// Whether this command goes out as a broadcast rather than to one pod.
    pub fn is_broadcast(&self) -> bool {
        matches!(
            self,
            Command::Invite
                | Command::LaunchPrimed { .. }
                | Command::LaunchDetected
                | Command::DescentDetected
                | Command::Landed
        )
    }

    /// Encode the command to bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(5);
        buf.put_u8(self.code());

        match self {
            Command::LaunchPrimed { interval_secs } => buf.put_u8(*interval_secs),
            Command::ClockPush { unix_time } | Command::ClockTest { unix_time } => {
                buf.put_u32(*unix_time);
            }
            Command::Invite
            | Command::LaunchDetected
            | Command::DescentDetected
            | Command::Landed
            | Command::DataRequest => {}
        }

        buf
    }

    /// Decode a command from a frame, as a pod would on reception.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        let Some(&code) = frame.first() else {
            return Err(ProtocolError::FrameTooShort {
                expected: 1,
                actual: 0,
            });
        };

        match code {
            CMD_INVITE => Ok(Command::Invite),
            CMD_LAUNCH_PRIMED => {
                require_len(frame, 2)?;
                Ok(Command::LaunchPrimed {
                    interval_secs: frame[1],
                })
            }
            CMD_LAUNCH_DETECTED => Ok(Command::LaunchDetected),
            CMD_DESCENT_DETECTED => Ok(Command::DescentDetected),
            CMD_LANDED => Ok(Command::Landed),
            CMD_CLOCK_PUSH => Ok(Command::ClockPush {
                unix_time: read_time(frame)?,
            }),
            CMD_CLOCK_TEST => Ok(Command::ClockTest {
                unix_time: read_time(frame)?,
            }),
            CMD_DATA_REQUEST => Ok(Command::DataRequest),
            other => Err(ProtocolError::UnknownCommand(other)),
        }
    }
}

fn require_len(frame: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if frame.len() < expected {
        return Err(ProtocolError::FrameTooShort {
            expected,
            actual: frame.len(),
        });
    }
    Ok(())
}

fn read_time(frame: &[u8]) -> Result<u32, ProtocolError> {
    require_len(frame, 5)?;
    Ok(u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_commands_have_no_payload() {
        assert_eq!(Command::Invite.encode(), vec![0x00]);
        assert_eq!(Command::LaunchDetected.encode(), vec![0x02]);
        assert_eq!(Command::DescentDetected.encode(), vec![0x03]);
        assert_eq!(Command::Landed.encode(), vec![0x04]);
        assert!(Command::Landed.is_broadcast());
        assert!(!Command::DataRequest.is_broadcast());
    }

    #[test]
    fn test_launch_primed_carries_interval() {
        assert_eq!(
            Command::LaunchPrimed { interval_secs: 30 }.encode(),
            vec![0x01, 30]
        );
    }

    #[test]
    fn test_clock_commands_are_big_endian() {
        let push = Command::ClockPush {
            unix_time: 0x6512_3456,
        };
        assert_eq!(push.encode(), vec![0x20, 0x65, 0x12, 0x34, 0x56]);

        let test = Command::ClockTest { unix_time: 1 };
        assert_eq!(test.encode(), vec![0x21, 0, 0, 0, 1]);
    }

    #[test]
    fn test_decode_clock_test() {
        let cmd = Command::decode(&[0x21, 0x65, 0x12, 0x34, 0x56]).unwrap();
        assert_eq!(
            cmd,
            Command::ClockTest {
                unix_time: 0x6512_3456
            }
        );
    }

    #[test]
    fn test_decode_truncated_clock_push() {
        assert_eq!(
            Command::decode(&[0x20, 0x01, 0x02]),
            Err(ProtocolError::FrameTooShort {
                expected: 5,
                actual: 3
            })
        );
    }

    #[test]
    fn test_decode_unknown_command() {
        assert_eq!(
            Command::decode(&[0x7E]),
            Err(ProtocolError::UnknownCommand(0x7E))
        );
        assert!(Command::decode(&[]).is_err());
    }
}
