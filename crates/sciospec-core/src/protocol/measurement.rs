//! Measurement result frames
//!
//! While a measurement runs the instrument streams one result frame per
//! sweep point. Only the layout with a current-range byte and without a
//! timestamp is decoded:
//!
//! ```text
//! [0xB8][0x0B][id_hi][id_lo][range][re: f32 BE][im: f32 BE][0xB8]
//! ```
//!
//! Timestamp-bearing layouts are switched on by separate device commands
//! this crate never sends; they are reported as
//! [`ProtocolError::UnsupportedResultType`].

use serde::{Deserialize, Serialize};

use super::frame::{decode_f32_be, decode_u16_be, decode_u8};
use super::{ProtocolError, RESULT_FRAME_LEN, TAG_MEASUREMENT};

/// Result type byte of the current-range/no-timestamp layout
pub const RESULT_TYPE_WITH_RANGE: u8 = 0x0B;

/// One decoded impedance value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementFrame {
    /// Layout selector byte
    pub result_type: u8,
    /// Channel or frequency-point id
    pub channel_or_id: u16,
    /// Current range code in effect, when the layout carries it
    pub current_range: Option<u8>,
    /// Real part
    pub real: f32,
    /// Imaginary part
    pub imaginary: f32,
}

impl MeasurementFrame {
    /// Decode a single result frame
    pub fn decode(raw: &[u8]) -> Result<Self, ProtocolError> {
        if raw.len() < 2 {
            return Err(ProtocolError::MalformedFrame(format!(
                "result frame truncated to {} bytes",
                raw.len()
            )));
        }
        if raw[0] != TAG_MEASUREMENT {
            return Err(ProtocolError::MalformedFrame(format!(
                "result frame starts with {:#04x}, expected {:#04x}",
                raw[0], TAG_MEASUREMENT
            )));
        }

        let result_type = raw[1];
        if result_type != RESULT_TYPE_WITH_RANGE {
            return Err(ProtocolError::UnsupportedResultType(result_type));
        }

        if raw.len() != RESULT_FRAME_LEN {
            return Err(ProtocolError::MalformedFrame(format!(
                "result frame must be {} bytes, got {}",
                RESULT_FRAME_LEN,
                raw.len()
            )));
        }
        if raw[RESULT_FRAME_LEN - 1] != TAG_MEASUREMENT {
            return Err(ProtocolError::MalformedFrame(format!(
                "result frame ends with {:#04x}, expected {:#04x}",
                raw[RESULT_FRAME_LEN - 1],
                TAG_MEASUREMENT
            )));
        }

        Ok(Self {
            result_type,
            channel_or_id: decode_u16_be(&raw[2..4])?,
            current_range: Some(decode_u8(&raw[4..5])?),
            real: decode_f32_be(&raw[5..9])?,
            imaginary: decode_f32_be(&raw[9..13])?,
        })
    }

    /// Real and imaginary part
    pub fn impedance(&self) -> (f32, f32) {
        (self.real, self.imaginary)
    }

    /// |Z|
    pub fn magnitude(&self) -> f32 {
        self.real.hypot(self.imaginary)
    }

    /// Phase angle in degrees
    pub fn phase_degrees(&self) -> f32 {
        self.imaginary.atan2(self.real).to_degrees()
    }
}
