//! Acknowledgement frames
//!
//! Every command is answered by a 4-byte frame whose third byte carries
//! the outcome code.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ProtocolError, ACK_FRAME_LEN};

/// Outcome reported by an acknowledgement frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AcknowledgementOutcome {
    /// 0x01: frame not acknowledged, incorrect syntax
    FrameSyntaxError,
    /// 0x02: communication timeout, less data than expected
    Timeout,
    /// 0x04: wake-up message after boot
    WakeUp,
    /// 0x11: valid TCP client-socket connection
    TcpSocketOpen,
    /// 0x81: command has not been executed
    NotAcknowledgedNotExecuted,
    /// 0x82: command could not be recognized
    NotAcknowledgedUnrecognized,
    /// 0x83: command executed successfully
    Acknowledged,
    /// 0x84: system operational and ready to receive data
    SystemReady,
    /// Nothing arrived before the read timeout
    NoResponse,
}

impl AcknowledgementOutcome {
    /// Look up an outcome by its wire code
    pub fn from_code(code: u8) -> Option<Self> {
        use AcknowledgementOutcome::*;
        Some(match code {
            0x01 => FrameSyntaxError,
            0x02 => Timeout,
            0x04 => WakeUp,
            0x11 => TcpSocketOpen,
            0x81 => NotAcknowledgedNotExecuted,
            0x82 => NotAcknowledgedUnrecognized,
            0x83 => Acknowledged,
            0x84 => SystemReady,
            _ => return None,
        })
    }

    /// Wire code, `None` for the synthesized `NoResponse`
    pub fn code(&self) -> Option<u8> {
        use AcknowledgementOutcome::*;
        match self {
            FrameSyntaxError => Some(0x01),
            Timeout => Some(0x02),
            WakeUp => Some(0x04),
            TcpSocketOpen => Some(0x11),
            NotAcknowledgedNotExecuted => Some(0x81),
            NotAcknowledgedUnrecognized => Some(0x82),
            Acknowledged => Some(0x83),
            SystemReady => Some(0x84),
            NoResponse => None,
        }
    }

    /// Human-readable meaning
    pub fn reason(&self) -> &'static str {
        use AcknowledgementOutcome::*;
        match self {
            FrameSyntaxError => "Frame-Not-Acknowledge: Incorrect syntax",
            Timeout => "Timeout: Communication-timeout (less data than expected)",
            WakeUp => "Wake-Up Message: System boot ready",
            TcpSocketOpen => "TCP-Socket: Valid TCP client-socket connection",
            NotAcknowledgedNotExecuted => "Not-Acknowledge: Command has not been executed",
            NotAcknowledgedUnrecognized => "Not-Acknowledge: Command could not be recognized",
            Acknowledged => "Command-Acknowledge: Command has been executed successfully",
            SystemReady => {
                "System-Ready Message: System is operational and ready to receive data"
            }
            NoResponse => "No response before read timeout",
        }
    }
}

impl fmt::Display for AcknowledgementOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(code) => write!(f, "{:02X} {}", code, self.reason()),
            None => f.write_str(self.reason()),
        }
    }
}

/// Classify raw acknowledgement bytes.
///
/// An empty buffer means the read timed out. Anything else must be a
/// whole 4-byte frame with a known code.
pub fn classify(raw: &[u8]) -> Result<AcknowledgementOutcome, ProtocolError> {
    if raw.is_empty() {
        return Ok(AcknowledgementOutcome::NoResponse);
    }
    if raw.len() != ACK_FRAME_LEN {
        return Err(ProtocolError::MalformedFrame(format!(
            "acknowledgement must be {} bytes, got {}: {:02X?}",
            ACK_FRAME_LEN,
            raw.len(),
            raw
        )));
    }
    AcknowledgementOutcome::from_code(raw[2]).ok_or_else(|| {
        ProtocolError::MalformedFrame(format!("unknown acknowledgement code {:#04x}", raw[2]))
    })
}

/// Fail unless the command went through.
///
/// "Not executed" passes: the instrument answers that way for some
/// commands it does not support, and lets them through silently.
pub fn assert_executed(outcome: AcknowledgementOutcome) -> Result<(), ProtocolError> {
    match outcome {
        AcknowledgementOutcome::Acknowledged | AcknowledgementOutcome::NotAcknowledgedNotExecuted => {
            Ok(())
        }
        AcknowledgementOutcome::NoResponse => Err(ProtocolError::NoAcknowledgement),
        other => Err(ProtocolError::CommandRejected {
            outcome: other,
            reason: other.reason().to_string(),
        }),
    }
}
