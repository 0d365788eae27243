//! Responses received from pods.

use crate::constants::*;
use crate::error::*;
use crate::types::*;

/// Messages a pod sends to the command module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Reply to an invite.
    Rsvp {
        /// Requested connection type.
        connect_type: ConnectType,
    },

    /// Result of a clock test.
    ClockTestResult {
        /// Whether the pod's clock agreed with the module's.
        good: bool,
    },

    /// Telemetry payload with the code byte stripped.
    PodData(Vec<u8>),
}

impl Response {
    /// Get the response code for this response.
    pub fn code(&self) -> u8 {
        match self {
            Response::Rsvp { .. } => RESP_CODE_RSVP,
            Response::ClockTestResult { .. } => RESP_CODE_CLOCK_TEST,
            Response::PodData(_) => RESP_CODE_POD_DATA,
        }
    }

    /// Decode a response from a received frame.
    pub fn decode(frame: &[u8]) -> Result<Self, ProtocolError> {
        if frame.is_empty() {
            return Err(ProtocolError::FrameTooShort {
                expected: 1,
                actual: 0,
            });
        }
        if frame.len() > MAX_MSG_LENGTH {
            return Err(ProtocolError::FrameTooLong {
                max: MAX_MSG_LENGTH,
                actual: frame.len(),
            });
        }

        let code = frame[0];
        log::trace!("decoding response 0x{:02X} ({} bytes)", code, frame.len());

        match code {
            RESP_CODE_RSVP => {
                if frame.len() < 2 {
                    return Err(ProtocolError::FrameTooShort {
                        expected: 2,
                        actual: frame.len(),
                    });
                }
                let connect_type = ConnectType::try_from(frame[1])?;
                Ok(Response::Rsvp { connect_type })
            }

            RESP_CODE_CLOCK_TEST => {
                if frame.len() < 2 {
                    return Err(ProtocolError::FrameTooShort {
                        expected: 2,
                        actual: frame.len(),
                    });
                }
                Ok(Response::ClockTestResult {
                    good: frame[1] == CLOCK_TEST_GOOD,
                })
            }

            RESP_CODE_POD_DATA => Ok(Response::PodData(frame[1..].to_vec())),

            other => Err(ProtocolError::UnknownResponse(other)),
        }
    }

    /// Encode the response to bytes, as a pod would before transmitting.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(MAX_MSG_LENGTH);
        buf.push(self.code());

        match self {
            Response::Rsvp { connect_type } => buf.push((*connect_type).into()),
            Response::ClockTestResult { good } => {
                // Any non-zero byte reads as a bad clock.
                buf.push(if *good { CLOCK_TEST_GOOD } else { 0x01 });
            }
            Response::PodData(payload) => buf.extend_from_slice(payload),
        }

        buf
    }
}
