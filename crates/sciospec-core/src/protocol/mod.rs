//! Sciospec Serial Protocol
//!
//! Implements the tagged binary frame protocol spoken by Sciospec
//! impedance analyzers.
//!
//! Every command is framed as `[tag][length][payload...][tag]`, every
//! command is answered by a 4-byte acknowledgement frame, and data-bearing
//! responses reuse the same tag framing. Multi-byte numbers are big-endian.

pub mod ack;
pub mod commands;
mod error;
pub mod frame;
pub mod measurement;
pub mod serial;
mod session;
pub mod stream;

pub use ack::AcknowledgementOutcome;
pub use commands::Command;
pub use error::ProtocolError;
pub use frame::CommandFrame;
pub use measurement::MeasurementFrame;
pub use serial::{list_ports, open_port, PortInfo};
pub use session::{DeviceSession, MeasurementRun, SessionState};
pub use stream::{SerialChannel, TcpChannel, Transport};

/// Default baud rate for the instrument's USB-serial bridge
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default read timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Set frontend settings / clear channel
pub const TAG_SET_FRONTEND: u8 = 0xB0;

/// Set setup (reset, frequency list)
pub const TAG_SET_SETUP: u8 = 0xB6;

/// Get setup (frequency list echo)
pub const TAG_GET_SETUP: u8 = 0xB7;

/// Start/stop measurement; also tags result frames
pub const TAG_MEASUREMENT: u8 = 0xB8;

/// Get device id
pub const TAG_DEVICE_ID: u8 = 0xD1;

/// Get firmware id
pub const TAG_FIRMWARE_ID: u8 = 0xD2;

/// Length the instrument expects in the set-setup frame header for a
/// frequency-list payload, whatever the payload's actual size.
pub const SETUP_DECLARED_LENGTH: u8 = 16;

/// Size of an acknowledgement frame
pub const ACK_FRAME_LEN: usize = 4;

/// Size of a result frame carrying a current range and no timestamp
pub const RESULT_FRAME_LEN: usize = 14;

/// Largest frequency count that fits a single setup frame
pub const MAX_FREQUENCY_COUNT: u8 = 61;
