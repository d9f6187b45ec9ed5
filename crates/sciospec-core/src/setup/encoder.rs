//! Setup encoding
//!
//! Turns [`SetupConfiguration`] and [`FrontendConfiguration`] into the
//! payload bytes of the set-setup and set-frontend commands.
//!
//! Set-setup payload (frequency list option):
//! - 1 byte: option 0x03 (add frequency list)
//! - 4 bytes: start frequency (f32)
//! - 4 bytes: end frequency (f32)
//! - 4 bytes: point count (f32, although it is a small integer)
//! - 1 byte: scale
//! - 4 bytes: precision (f32)
//! - 4 bytes: amplitude in volts (f32)
//!
//! Set-frontend payload: mode, channel, current range, voltage range,
//! one byte each.

use super::{
    Channel, CurrentRange, FrequencySweep, FrontendConfiguration, MeasurementMode, Precision,
    Scale, SetupConfiguration, VoltageRange,
};
use crate::protocol::frame::PayloadBuilder;
use crate::protocol::ProtocolError;

/// Setup option byte selecting "add frequency list"
pub const SETUP_OPTION_FREQUENCY_LIST: u8 = 0x03;

/// Set-setup option byte that resets the measurement setup
pub const SETUP_OPTION_RESET: u8 = 0x01;

/// Get-setup option byte that requests the frequency list
pub const GET_SETUP_FREQUENCY_LIST: u8 = 0x04;

/// Set-frontend payload that clears the channel selection
pub const CLEAR_CHANNEL: [u8; 3] = [0xFF, 0xFF, 0xFF];

impl Scale {
    /// Wire code
    pub fn code(&self) -> u8 {
        match self {
            Scale::Linear => 0x00,
            Scale::Logarithmic => 0x01,
        }
    }
}

impl Precision {
    /// Wire value, sent as a float
    pub fn code(&self) -> f32 {
        match self {
            Precision::Low => 0.0,
            Precision::Medium => 1.0,
            Precision::High => 2.0,
            Precision::VeryHigh => 3.0,
        }
    }
}

impl MeasurementMode {
    /// Wire code
    pub fn code(&self) -> u8 {
        match self {
            MeasurementMode::TwoPoint => 0x01,
            MeasurementMode::FourPoint => 0x02,
            MeasurementMode::ThreePoint => 0x03,
        }
    }
}

impl Channel {
    /// Wire code
    pub fn code(&self) -> u8 {
        match self {
            Channel::Bnc => 0x01,
            Channel::Ext1 => 0x02,
            Channel::Ext2 => 0x04,
        }
    }
}

impl CurrentRange {
    /// Wire code
    pub fn code(&self) -> u8 {
        match self {
            CurrentRange::Auto => 0x00,
            CurrentRange::R100 => 0x01,
            CurrentRange::R10k => 0x02,
            CurrentRange::R1M => 0x04,
            CurrentRange::R100M => 0x06,
        }
    }
}

impl VoltageRange {
    /// Wire code
    pub fn code(&self) -> u8 {
        match self {
            VoltageRange::Auto => 0x00,
            VoltageRange::R1V => 0x01,
            VoltageRange::R0_09V => 0x02,
        }
    }
}

/// Encode the frequency-list payload of the set-setup command.
///
/// Fails with `InvalidSweep` before building anything if the point
/// count does not fit one frame.
pub fn encode_sweep(
    sweep: &FrequencySweep,
    precision: Precision,
    amplitude_volts: f32,
) -> Result<Vec<u8>, ProtocolError> {
    sweep.validate()?;

    Ok(PayloadBuilder::new()
        .byte(SETUP_OPTION_FREQUENCY_LIST)
        .f32_be(sweep.start_freq)
        .f32_be(sweep.end_freq)
        .f32_be(f32::from(sweep.count))
        .byte(sweep.scale.code())
        .f32_be(precision.code())
        .f32_be(amplitude_volts)
        .build())
}

/// Encode a full setup configuration
pub fn encode_setup(setup: &SetupConfiguration) -> Result<Vec<u8>, ProtocolError> {
    encode_sweep(&setup.sweep, setup.precision, setup.amplitude_volts)
}

/// Encode the frontend settings payload.
///
/// Returns `None` when no voltage range is configured: the frontend
/// frame is then not sent at all.
pub fn encode_frontend(cfg: &FrontendConfiguration) -> Option<Vec<u8>> {
    let voltage_range = cfg.voltage_range?;
    Some(vec![
        cfg.mode.code(),
        cfg.channel.code(),
        cfg.current_range.code(),
        voltage_range.code(),
    ])
}
