//! Protocol commands
//!
//! Defines the commands the host sends to the instrument and how each one
//! maps onto a tagged frame.

use super::{
    frame::CommandFrame, ProtocolError, SETUP_DECLARED_LENGTH, TAG_DEVICE_ID, TAG_FIRMWARE_ID,
    TAG_GET_SETUP, TAG_MEASUREMENT, TAG_SET_FRONTEND, TAG_SET_SETUP,
};
use crate::setup::encoder::{
    encode_frontend, encode_setup, CLEAR_CHANNEL, GET_SETUP_FREQUENCY_LIST, SETUP_OPTION_RESET,
};
use crate::setup::{FrontendConfiguration, SetupConfiguration};

/// Commands understood by the instrument
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Clear the measurement setup (0xB6, option 0x01)
    ResetSetup,

    /// Add a frequency list with precision and amplitude (0xB6, option 0x03)
    SetSetup(SetupConfiguration),

    /// Deselect the measurement channel (0xB0, `FF FF FF`)
    ClearChannel,

    /// Select mode, channel and ranges (0xB0)
    SetFrontend(FrontendConfiguration),

    /// Read back the configured frequency list (0xB7, option 0x04)
    GetFrequencyList,

    /// Start streaming result frames (0xB8)
    StartMeasurement,

    /// Stop streaming result frames (0xB8)
    StopMeasurement,

    /// Query the device id (0xD1)
    GetDeviceId,

    /// Query the firmware id (0xD2)
    GetFirmwareId,
}

impl Command {
    /// Frame tag for this command
    pub fn tag(&self) -> u8 {
        match self {
            Command::ResetSetup | Command::SetSetup(_) => TAG_SET_SETUP,
            Command::ClearChannel | Command::SetFrontend(_) => TAG_SET_FRONTEND,
            Command::GetFrequencyList => TAG_GET_SETUP,
            Command::StartMeasurement | Command::StopMeasurement => TAG_MEASUREMENT,
            Command::GetDeviceId => TAG_DEVICE_ID,
            Command::GetFirmwareId => TAG_FIRMWARE_ID,
        }
    }

    /// Short name for logs and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::ResetSetup => "reset setup",
            Command::SetSetup(_) => "set setup",
            Command::ClearChannel => "clear channel",
            Command::SetFrontend(_) => "set frontend",
            Command::GetFrequencyList => "get frequency list",
            Command::StartMeasurement => "start measurement",
            Command::StopMeasurement => "stop measurement",
            Command::GetDeviceId => "get device id",
            Command::GetFirmwareId => "get firmware id",
        }
    }

    /// Check if the device answers with a tagged data frame rather than
    /// only an acknowledgement
    pub fn expects_data_frame(&self) -> bool {
        matches!(
            self,
            Command::GetFrequencyList | Command::GetDeviceId | Command::GetFirmwareId
        )
    }

    /// Build the frame for this command.
    ///
    /// Returns `Ok(None)` for a frontend configuration without a voltage
    /// range, which is not sent.
    pub fn to_frame(&self) -> Result<Option<CommandFrame>, ProtocolError> {
        let tag = self.tag();
        let frame = match self {
            Command::ResetSetup => CommandFrame::new(tag, vec![SETUP_OPTION_RESET])?,
            Command::SetSetup(setup) => {
                CommandFrame::with_declared_length(tag, encode_setup(setup)?, SETUP_DECLARED_LENGTH)
            }
            Command::ClearChannel => CommandFrame::new(tag, CLEAR_CHANNEL.to_vec())?,
            Command::SetFrontend(cfg) => match encode_frontend(cfg) {
                Some(payload) => CommandFrame::new(tag, payload)?,
                None => return Ok(None),
            },
            Command::GetFrequencyList => CommandFrame::new(tag, vec![GET_SETUP_FREQUENCY_LIST])?,
            Command::StartMeasurement => CommandFrame::new(tag, vec![0x01, 0x00, 0x00])?,
            Command::StopMeasurement => CommandFrame::new(tag, vec![0x00, 0x00, 0x00])?,
            Command::GetDeviceId | Command::GetFirmwareId => CommandFrame::new(tag, Vec::new())?,
        };
        Ok(Some(frame))
    }
}
