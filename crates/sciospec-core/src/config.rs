//! Configuration
//!
//! Connection settings and JSON instrument configuration files.
//!
//! ```json
//! {
//!   "connection": { "port_name": "/dev/ttyUSB0", "baud_rate": 9600, "timeout_ms": 1000 },
//!   "setup": {
//!     "sweep": { "start_freq": 100.0, "end_freq": 100000.0, "count": 20, "scale": "Logarithmic" },
//!     "precision": "Medium",
//!     "amplitude_volts": 0.25
//!   },
//!   "frontend": { "mode": "FourPoint", "channel": "BNC", "current_range": "10k", "voltage_range": "Auto" }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::protocol::{ProtocolError, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT_MS};
use crate::setup::{FrontendConfiguration, SetupConfiguration};

/// Serial connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
}

impl ConnectionConfig {
    /// Configuration for a named port with default speed and timeout
    pub fn for_port(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Read timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Everything needed to run a measurement from a file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InstrumentConfig {
    /// Where the instrument is attached
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Sweep, precision and amplitude
    #[serde(default)]
    pub setup: Option<SetupConfiguration>,
    /// Frontend settings
    #[serde(default)]
    pub frontend: Option<FrontendConfiguration>,
}

impl InstrumentConfig {
    /// Parse and validate JSON text
    pub fn from_json_str(content: &str) -> Result<Self, ProtocolError> {
        let config: InstrumentConfig =
            serde_json::from_str(content).map_err(|e| ProtocolError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ProtocolError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ProtocolError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&content)
    }

    /// Check the parts that serde cannot
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if let Some(setup) = &self.setup {
            setup.sweep.validate()?;
        }
        Ok(())
    }

    /// Serialize as pretty JSON
    pub fn to_json_string(&self) -> Result<String, ProtocolError> {
        serde_json::to_string_pretty(self).map_err(|e| ProtocolError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_config_default() {
        let config = ConnectionConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout(), Duration::from_millis(1000));
        assert!(config.port_name.is_empty());
    }

    #[test]
    fn test_for_port() {
        let config = ConnectionConfig::for_port("COM5");
        assert_eq!(config.port_name, "COM5");
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
    }

    #[test]
    fn test_partial_connection_uses_defaults() {
        let config = InstrumentConfig::from_json_str(r#"{"connection":{"port_name":"/dev/ttyUSB0"}}"#)
            .unwrap();
        assert_eq!(config.connection.port_name, "/dev/ttyUSB0");
        assert_eq!(config.connection.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(config.setup.is_none());
        assert!(config.frontend.is_none());
    }

    #[test]
    fn test_empty_document() {
        let config = InstrumentConfig::from_json_str("{}").unwrap();
        assert_eq!(config, InstrumentConfig::default());
    }
}
