//! Serial ports
//!
//! Enumerates candidate ports for the analyzer's USB-serial bridge and
//! opens one with the instrument's line settings. Which port to use is
//! always the caller's choice; the listing is informational.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use std::time::Duration;

use super::ProtocolError;

/// A port the analyzer might be attached to
#[derive(Debug, Clone, Default)]
pub struct PortInfo {
    /// Path or name to pass to [`open_port`]
    pub name: String,
    /// Bridge vendor id
    pub vid: Option<u16>,
    /// Bridge product id
    pub pid: Option<u16>,
    /// Bridge manufacturer string
    pub manufacturer: Option<String>,
    /// Bridge product string
    pub product: Option<String>,
}

impl PortInfo {
    fn named(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb) => Self {
                name: info.port_name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                manufacturer: usb.manufacturer,
                product: usb.product,
            },
            _ => Self::named(info.port_name),
        }
    }
}

/// USB bridges (`ttyUSB`, then `ttyACM`) before `COM` ports before the
/// rest, numbered ports in numeric order.
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    let numbered = [("ttyUSB", 0u8), ("ttyACM", 1), ("COM", 2)];
    for (prefix, rank) in numbered {
        if let Some(rest) = basename.strip_prefix(prefix) {
            let num = rest.parse::<usize>().unwrap_or(usize::MAX);
            return (rank, num, basename.to_string());
        }
    }
    (3, 0, basename.to_string())
}

/// Candidate ports, analyzer-like bridges first.
///
/// Enumeration failures yield an empty list rather than an error.
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: HashMap<String, PortInfo> = serialport::available_ports()
        .unwrap_or_default()
        .into_iter()
        .map(|info| {
            let port = PortInfo::from(info);
            (port.name.clone(), port)
        })
        .collect();

    // Bridge nodes can exist before enumeration reports them
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        let bridges = entries
            .flatten()
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|node| node.starts_with("ttyUSB") || node.starts_with("ttyACM"));
        for node in bridges {
            let path = format!("/dev/{}", node);
            ports
                .entry(path.clone())
                .or_insert_with(|| PortInfo::named(path));
        }
    }

    let mut sorted: Vec<PortInfo> = ports.into_values().collect();
    sorted.sort_by_key(|p| port_sort_key(&p.name));
    sorted
}

/// Open and configure a serial port (8N1, no flow control)
pub fn open_port(
    name: &str,
    baud_rate: u32,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, ProtocolError> {
    serialport::new(name, baud_rate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(timeout)
        .open()
        .map_err(|e| ProtocolError::TransportUnavailable(format!("{}: {}", name, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_ports_is_sorted() {
        let ports = list_ports();
        let keys: Vec<_> = ports.iter().map(|p| port_sort_key(&p.name)).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_open_missing_port() {
        let result = open_port("/dev/does-not-exist-sciospec", 9600, Duration::from_millis(10));
        assert!(matches!(result, Err(ProtocolError::TransportUnavailable(_))));
    }

    #[test]
    fn test_port_sorting() {
        let names = vec![
            "/dev/ttyACM0",
            "/dev/ttyUSB1",
            "COM10",
            "/dev/ttyUSB0",
            "/dev/someport",
            "COM5",
            "/dev/ttyUSB10",
        ];
        let mut ports: Vec<PortInfo> = names
            .into_iter()
            .map(|n| PortInfo::named(n.to_string()))
            .collect();

        ports.sort_by_key(|p| port_sort_key(&p.name));
        let ordered: Vec<String> = ports.into_iter().map(|p| p.name).collect();

        assert_eq!(
            ordered,
            vec![
                "/dev/ttyUSB0",
                "/dev/ttyUSB1",
                "/dev/ttyUSB10",
                "/dev/ttyACM0",
                "COM5",
                "COM10",
                "/dev/someport",
            ]
        );
    }
}
