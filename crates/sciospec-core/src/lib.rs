//! # Sciospec Core Library
//!
//! Host-side driver for Sciospec impedance-spectroscopy instruments.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Tagged binary frame encoding/decoding
//! - Acknowledgement interpretation
//! - Sweep and frontend setup encoding
//! - A device session that sequences configure-before-measure
//!
//! ## Example
//!
//! ```rust,ignore
//! use sciospec_core::prelude::*;
//!
//! let mut session = DeviceSession::open_serial(&ConnectionConfig::for_port("/dev/ttyUSB0"))?;
//!
//! let setup = SetupConfiguration {
//!     sweep: FrequencySweep::new(100.0, 100_000.0, 20, Scale::Logarithmic)?,
//!     precision: Precision::Medium,
//!     amplitude_volts: 0.25,
//! };
//! session.configure_sweep(&setup)?;
//!
//! for point in session.run_measurement()? {
//!     println!("{} -> {:?}", point.channel_or_id, point.impedance());
//! }
//! ```

pub mod config;
pub mod protocol;
pub mod setup;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ConnectionConfig, InstrumentConfig};
    pub use crate::protocol::{
        AcknowledgementOutcome, Command, DeviceSession, MeasurementFrame, ProtocolError,
        SessionState, Transport,
    };
    pub use crate::setup::{
        Channel, CurrentRange, FrequencySweep, FrontendConfiguration, MeasurementMode, Precision,
        Scale, SetupConfiguration, VoltageRange,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
