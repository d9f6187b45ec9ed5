//! Device session
//!
//! Owns the transport and sequences command/acknowledgement exchanges.
//!
//! ```text
//! Disconnected -> Connected -> SweepConfigured <-> MeasurementRunning
//! ```
//!
//! The wire protocol lets the host start a measurement without a frequency
//! list; the session does not. The number of result frames to read comes
//! from the last successful `configure_sweep`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    ack::{assert_executed, classify},
    frame::{decode_f32_be, read_exact, CommandFrame},
    AcknowledgementOutcome, Command, MeasurementFrame, ProtocolError, SerialChannel, TcpChannel,
    Transport, ACK_FRAME_LEN, RESULT_FRAME_LEN, TAG_DEVICE_ID, TAG_FIRMWARE_ID, TAG_GET_SETUP,
};
use crate::config::ConnectionConfig;
use crate::setup::{FrontendConfiguration, SetupConfiguration};

/// Tag of acknowledgement frames (`18 01 <code> 18`)
const TAG_ACK: u8 = 0x18;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No transport
    Disconnected,
    /// Transport attached, no frequency list configured
    Connected,
    /// Frequency list configured and acknowledged
    SweepConfigured,
    /// Device is streaming result frames
    MeasurementRunning,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connected => "connected",
            SessionState::SweepConfigured => "sweep configured",
            SessionState::MeasurementRunning => "measurement running",
        })
    }
}

const CONNECTED: &[SessionState] = &[
    SessionState::Connected,
    SessionState::SweepConfigured,
    SessionState::MeasurementRunning,
];

const IDLE: &[SessionState] = &[SessionState::Connected, SessionState::SweepConfigured];

/// A session with one instrument over one transport
pub struct DeviceSession {
    /// Transport handle
    transport: Option<Box<dyn Transport>>,
    /// Current session state
    state: SessionState,
    /// Point count of the last acknowledged sweep
    configured_frequency_count: Option<u8>,
    /// Metrics: cumulative bytes/frames sent & received
    tx_bytes: u64,
    rx_bytes: u64,
    tx_frames: u64,
    rx_frames: u64,
}

impl DeviceSession {
    /// Create a session without a transport
    pub fn new() -> Self {
        Self {
            transport: None,
            state: SessionState::Disconnected,
            configured_frequency_count: None,
            tx_bytes: 0,
            rx_bytes: 0,
            tx_frames: 0,
            rx_frames: 0,
        }
    }

    /// Open the configured serial port and connect
    pub fn open_serial(config: &ConnectionConfig) -> Result<Self, ProtocolError> {
        let port = super::open_port(&config.port_name, config.baud_rate, config.timeout())?;
        let mut session = Self::new();
        session.connect(Box::new(SerialChannel::new(port)))?;
        Ok(session)
    }

    /// Connect to an Ethernet-equipped device
    pub fn open_tcp(addr: SocketAddr, timeout: Duration) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| ProtocolError::TransportUnavailable(format!("{}: {}", addr, e)))?;
        let mut channel = TcpChannel::new(stream);
        channel.set_timeout(timeout)?;
        let mut session = Self::new();
        session.connect(Box::new(channel))?;
        Ok(session)
    }

    /// Attach an already opened transport
    pub fn connect(&mut self, transport: Box<dyn Transport>) -> Result<(), ProtocolError> {
        self.require("connect", &[SessionState::Disconnected])?;
        info!("session connected to {}", transport.describe());
        self.transport = Some(transport);
        self.state = SessionState::Connected;
        Ok(())
    }

    /// Detach and return the transport, forgetting all session state
    pub fn disconnect(&mut self) -> Option<Box<dyn Transport>> {
        if self.state == SessionState::MeasurementRunning {
            warn!("disconnecting while a measurement is running");
        }
        self.state = SessionState::Disconnected;
        self.configured_frequency_count = None;
        self.transport.take()
    }

    /// Get current session state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Point count of the last acknowledged sweep
    pub fn configured_frequency_count(&self) -> Option<u8> {
        self.configured_frequency_count
    }

    /// Get cumulative tx/rx bytes and frame counters
    pub fn counters(&self) -> (u64, u64, u64, u64) {
        (self.tx_bytes, self.rx_bytes, self.tx_frames, self.rx_frames)
    }

    /// Clear the device's measurement setup.
    ///
    /// The session keeps its configured point count.
    pub fn reset_setup(&mut self) -> Result<(), ProtocolError> {
        self.require("reset setup", IDLE)?;
        self.send_command(&Command::ResetSetup)?;
        Ok(())
    }

    /// Send a frequency list with precision and amplitude.
    ///
    /// An invalid sweep fails before anything is written and leaves the
    /// session untouched.
    pub fn configure_sweep(&mut self, setup: &SetupConfiguration) -> Result<(), ProtocolError> {
        let command = Command::SetSetup(*setup);
        let frame = command.to_frame()?;
        self.require("configure sweep", IDLE)?;

        if let Some(frame) = frame {
            self.exchange(&frame, command.name())?;
        }

        self.configured_frequency_count = Some(setup.sweep.count);
        self.state = SessionState::SweepConfigured;
        info!(
            "sweep configured: {} points, {} Hz to {} Hz ({})",
            setup.sweep.count, setup.sweep.start_freq, setup.sweep.end_freq, setup.sweep.scale
        );
        Ok(())
    }

    /// Clear the channel, then apply the frontend settings.
    ///
    /// Without a voltage range only the clear-channel frame is sent.
    pub fn configure_frontend(&mut self, cfg: &FrontendConfiguration) -> Result<(), ProtocolError> {
        self.require("configure frontend", CONNECTED)?;
        self.send_command(&Command::ClearChannel)?;
        if !self.send_command(&Command::SetFrontend(*cfg))? {
            debug!("no voltage range configured, frontend settings not sent");
        }
        Ok(())
    }

    /// Start streaming result frames
    pub fn start_measurement(&mut self) -> Result<(), ProtocolError> {
        self.require("start measurement", CONNECTED)?;
        if self.configured_frequency_count.is_none() {
            return Err(ProtocolError::SweepNotConfigured);
        }
        self.require("start measurement", &[SessionState::SweepConfigured])?;

        self.send_command(&Command::StartMeasurement)?;
        self.state = SessionState::MeasurementRunning;
        info!("measurement started");
        Ok(())
    }

    /// Stop streaming result frames
    pub fn stop_measurement(&mut self) -> Result<(), ProtocolError> {
        self.require("stop measurement", CONNECTED)?;
        self.send_command(&Command::StopMeasurement)?;
        if self.state == SessionState::MeasurementRunning {
            self.state = SessionState::SweepConfigured;
            info!("measurement stopped");
        }
        Ok(())
    }

    /// Read one result frame per configured sweep point
    pub fn read_measurement_results(&mut self) -> Result<Vec<MeasurementFrame>, ProtocolError> {
        let count = self
            .configured_frequency_count
            .ok_or(ProtocolError::SweepNotConfigured)?;
        self.require("read measurement results", &[SessionState::MeasurementRunning])?;
        self.read_result_frames(count)
    }

    /// Start, read all results, and always stop again.
    ///
    /// If reading fails the stop is still sent. When both fail the read
    /// error is returned and the stop error is logged.
    pub fn run_measurement(&mut self) -> Result<Vec<MeasurementFrame>, ProtocolError> {
        let mut run = self.begin_measurement()?;
        let results = run.read_results();
        let stopped = run.finish();

        match (results, stopped) {
            (Ok(results), Ok(())) => Ok(results),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(stop_err)) => {
                warn!("stop after failed read also failed: {}", stop_err);
                Err(e)
            }
        }
    }

    /// Start a measurement and hand back a guard that stops it again
    pub fn begin_measurement(&mut self) -> Result<MeasurementRun<'_>, ProtocolError> {
        self.start_measurement()?;
        let frequency_count = self
            .configured_frequency_count
            .ok_or(ProtocolError::SweepNotConfigured)?;
        Ok(MeasurementRun {
            session: self,
            frequency_count,
            finished: false,
        })
    }

    /// Read back the configured frequency list in Hz
    pub fn get_frequency_list(&mut self) -> Result<Vec<f32>, ProtocolError> {
        self.require("get frequency list", IDLE)?;
        let payload = self.query(&Command::GetFrequencyList, TAG_GET_SETUP)?;

        if payload.len() % 4 != 0 {
            return Err(ProtocolError::MalformedFrame(format!(
                "frequency list of {} bytes is not a whole number of floats",
                payload.len()
            )));
        }
        payload.chunks_exact(4).map(decode_f32_be).collect()
    }

    /// Query the device id bytes
    pub fn get_device_id(&mut self) -> Result<Vec<u8>, ProtocolError> {
        self.require("get device id", IDLE)?;
        self.query(&Command::GetDeviceId, TAG_DEVICE_ID)
    }

    /// Query the firmware id bytes
    pub fn get_firmware_id(&mut self) -> Result<Vec<u8>, ProtocolError> {
        self.require("get firmware id", IDLE)?;
        self.query(&Command::GetFirmwareId, TAG_FIRMWARE_ID)
    }

    fn require(
        &self,
        operation: &'static str,
        allowed: &[SessionState],
    ) -> Result<(), ProtocolError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ProtocolError::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    fn transport(
        &mut self,
        operation: &'static str,
    ) -> Result<&mut (dyn Transport + 'static), ProtocolError> {
        match self.transport.as_deref_mut() {
            Some(transport) => Ok(transport),
            None => Err(ProtocolError::InvalidState {
                operation,
                state: SessionState::Disconnected.to_string(),
            }),
        }
    }

    /// Send an acknowledged command. Returns `false` if the command had
    /// nothing to send.
    fn send_command(&mut self, command: &Command) -> Result<bool, ProtocolError> {
        match command.to_frame()? {
            Some(frame) => {
                self.exchange(&frame, command.name())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write a frame, read its acknowledgement and require execution
    fn exchange(&mut self, frame: &CommandFrame, name: &'static str) -> Result<(), ProtocolError> {
        self.write_frame(frame, name)?;
        let raw = self.read_bytes(ACK_FRAME_LEN, name)?;
        self.check_ack(&raw, name)
    }

    /// Send a data query and return the payload of its response frame
    fn query(&mut self, command: &Command, tag: u8) -> Result<Vec<u8>, ProtocolError> {
        debug_assert!(command.expects_data_frame());
        let frame = command.to_frame()?.ok_or_else(|| {
            ProtocolError::MalformedFrame(format!("{} produced no frame", command.name()))
        })?;
        self.write_frame(&frame, command.name())?;
        self.read_data_frame(tag, command.name())
    }

    fn write_frame(&mut self, frame: &CommandFrame, name: &'static str) -> Result<(), ProtocolError> {
        let bytes = frame.to_bytes();
        let port = self.transport(name)?;

        // Safety net for bytes no exchange claimed
        if let Err(e) = port.clear_input_buffer() {
            warn!("{}: failed to clear input buffer: {} (continuing)", name, e);
        }

        debug!("{}: sending {} bytes: {:02X?}", name, bytes.len(), bytes);
        port.write_all(&bytes)?;
        port.flush()?;

        self.tx_bytes = self.tx_bytes.saturating_add(bytes.len() as u64);
        self.tx_frames = self.tx_frames.saturating_add(1);
        Ok(())
    }

    fn read_bytes(&mut self, n: usize, name: &'static str) -> Result<Vec<u8>, ProtocolError> {
        let port = self.transport(name)?;
        let data = read_exact(port, n)?;
        debug!("{}: read {} of {} bytes: {:02X?}", name, data.len(), n, data);
        self.rx_bytes = self.rx_bytes.saturating_add(data.len() as u64);
        Ok(data)
    }

    /// Read `[tag][len][payload][tag]` plus the acknowledgement that goes
    /// with it.
    ///
    /// The device may acknowledge before or after the data. A leading
    /// acknowledgement must pass before the data is read; otherwise a
    /// trailing one is read after it, and silence there is accepted.
    fn read_data_frame(&mut self, tag: u8, name: &'static str) -> Result<Vec<u8>, ProtocolError> {
        let mut header = self.read_bytes(2, name)?;
        if header.is_empty() {
            return Err(ProtocolError::NoAcknowledgement);
        }

        let acknowledged_first = header[0] == TAG_ACK;
        if acknowledged_first {
            let rest = ACK_FRAME_LEN - header.len();
            let mut raw = header;
            raw.extend(self.read_bytes(rest, name)?);
            self.check_ack(&raw, name)?;

            header = self.read_bytes(2, name)?;
            if header.is_empty() {
                return Err(ProtocolError::MalformedFrame(format!(
                    "{}: device acknowledged but sent no data",
                    name
                )));
            }
        }

        if header.len() < 2 {
            return Err(ProtocolError::MalformedFrame(format!(
                "{}: response header truncated to {:02X?}",
                name, header
            )));
        }
        if header[0] != tag {
            return Err(ProtocolError::MalformedFrame(format!(
                "{}: response tag {:#04x}, expected {:#04x}",
                name, header[0], tag
            )));
        }

        let remaining = header[1] as usize + 1;
        let body = self.read_bytes(remaining, name)?;
        if body.len() != remaining {
            return Err(ProtocolError::MalformedFrame(format!(
                "{}: response truncated, {} of {} bytes after header",
                name,
                body.len(),
                remaining
            )));
        }

        let mut raw = header;
        raw.extend(body);
        let frame = CommandFrame::from_bytes(&raw, tag)?;
        self.rx_frames = self.rx_frames.saturating_add(1);

        if !acknowledged_first {
            let trailing = self.read_bytes(ACK_FRAME_LEN, name)?;
            if !trailing.is_empty() {
                self.check_ack(&trailing, name)?;
            }
        }
        Ok(frame.payload)
    }

    /// Classify a complete acknowledgement and require execution
    fn check_ack(&mut self, raw: &[u8], name: &'static str) -> Result<(), ProtocolError> {
        let outcome = classify(raw)?;
        if outcome != AcknowledgementOutcome::NoResponse {
            self.rx_frames = self.rx_frames.saturating_add(1);
        }
        debug!("{}: acknowledgement {}", name, outcome);
        if outcome == AcknowledgementOutcome::NotAcknowledgedNotExecuted {
            warn!("{}: device did not execute the command, continuing", name);
        }
        assert_executed(outcome)
    }

    fn read_result_frames(&mut self, count: u8) -> Result<Vec<MeasurementFrame>, ProtocolError> {
        let mut results = Vec::with_capacity(count as usize);
        for index in 0..count {
            let raw = self.read_bytes(RESULT_FRAME_LEN, "read measurement results")?;
            if raw.is_empty() {
                return Err(ProtocolError::MalformedFrame(format!(
                    "result frame {} of {} missing (read timed out)",
                    index + 1,
                    count
                )));
            }
            results.push(MeasurementFrame::decode(&raw)?);
            self.rx_frames = self.rx_frames.saturating_add(1);
        }
        Ok(results)
    }
}

impl Default for DeviceSession {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// A running measurement.
///
/// Holds the sweep's point count, so results can be read without
/// re-checking the session. Call [`finish`](Self::finish) to stop and
/// see the outcome; dropping the guard stops the measurement too, but can
/// only log a failure.
pub struct MeasurementRun<'s> {
    session: &'s mut DeviceSession,
    frequency_count: u8,
    finished: bool,
}

impl MeasurementRun<'_> {
    /// Number of result frames one pass produces
    pub fn frequency_count(&self) -> u8 {
        self.frequency_count
    }

    /// Read one result frame per sweep point
    pub fn read_results(&mut self) -> Result<Vec<MeasurementFrame>, ProtocolError> {
        self.session.read_result_frames(self.frequency_count)
    }

    /// Stop the measurement
    pub fn finish(mut self) -> Result<(), ProtocolError> {
        self.finished = true;
        self.session.stop_measurement()
    }
}

impl Drop for MeasurementRun<'_> {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.session.stop_measurement() {
                warn!("failed to stop measurement on drop: {}", e);
            }
        }
    }
}
