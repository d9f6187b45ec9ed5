//! Protocol errors

use thiserror::Error;

use super::AcknowledgementOutcome;

/// Errors that can occur while talking to the instrument
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("No acknowledgement from device")]
    NoAcknowledgement,

    #[error("Command rejected ({outcome:?}): {reason}")]
    CommandRejected {
        outcome: AcknowledgementOutcome,
        reason: String,
    },

    #[error("Invalid sweep: frequency count {count} is outside 1..={max}")]
    InvalidSweep { count: u8, max: u8 },

    #[error("Unsupported option for {field}: '{value}'")]
    UnsupportedOption { field: &'static str, value: String },

    #[error("No sweep configured in this session")]
    SweepNotConfigured,

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    #[error("Unsupported result frame type: {0:#04x}")]
    UnsupportedResultType(u8),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProtocolError {
    /// Bad input from the caller; nothing was sent to the device
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::InvalidSweep { .. }
                | ProtocolError::UnsupportedOption { .. }
                | ProtocolError::SweepNotConfigured
                | ProtocolError::InvalidState { .. }
                | ProtocolError::Config(_)
        )
    }

    /// Bytes on the wire did not match the frame layout
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::MalformedFrame(_) | ProtocolError::UnsupportedResultType(_)
        )
    }

    /// The device answered, but refused or ignored the command
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::CommandRejected { .. } | ProtocolError::NoAcknowledgement
        )
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(err: std::io::Error) -> Self {
        ProtocolError::TransportUnavailable(err.to_string())
    }
}
