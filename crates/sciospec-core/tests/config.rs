use pretty_assertions::assert_eq;
use sciospec_core::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const FULL_CONFIG: &str = r#"{
    "connection": { "port_name": "/dev/ttyUSB0", "baud_rate": 115200 },
    "setup": {
        "sweep": { "start_freq": 100.0, "end_freq": 100000.0, "count": 20, "scale": "log" },
        "precision": "High",
        "amplitude_volts": 0.1
    },
    "frontend": { "mode": "4pt", "channel": "BNC", "current_range": "10k", "voltage_range": "0.09" }
}"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(FULL_CONFIG);
    let config = InstrumentConfig::from_file(file.path()).unwrap();

    assert_eq!(config.connection.port_name, "/dev/ttyUSB0");
    assert_eq!(config.connection.baud_rate, 115200);
    assert_eq!(config.connection.timeout_ms, 1000);

    let setup = config.setup.unwrap();
    assert_eq!(setup.sweep.count, 20);
    assert_eq!(setup.sweep.scale, Scale::Logarithmic);
    assert_eq!(setup.precision, Precision::High);

    let frontend = config.frontend.unwrap();
    assert_eq!(frontend.mode, MeasurementMode::FourPoint);
    assert_eq!(frontend.current_range, CurrentRange::R10k);
    assert_eq!(frontend.voltage_range, Some(VoltageRange::R0_09V));
}

#[test]
fn test_config_survives_serialization() {
    let config = InstrumentConfig::from_json_str(FULL_CONFIG).unwrap();
    let text = config.to_json_string().unwrap();
    assert!(text.contains("\"10k\""));
    assert_eq!(InstrumentConfig::from_json_str(&text).unwrap(), config);
}

#[test]
fn test_unknown_option_names_field() {
    let content = FULL_CONFIG.replace("\"10k\"", "\"5k\"");
    let err = InstrumentConfig::from_json_str(&content).unwrap_err();
    assert!(matches!(err, ProtocolError::Config(_)));
    let message = err.to_string();
    assert!(message.contains("current_range"), "{}", message);
    assert!(message.contains("5k"), "{}", message);
}

#[test]
fn test_sweep_count_out_of_range() {
    let content = FULL_CONFIG.replace("\"count\": 20", "\"count\": 62");
    assert!(matches!(
        InstrumentConfig::from_json_str(&content),
        Err(ProtocolError::InvalidSweep { count: 62, max: 61 })
    ));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    match InstrumentConfig::from_file(&path) {
        Err(ProtocolError::Config(message)) => assert!(message.contains("absent.json")),
        other => panic!("expected Config error, got {:?}", other),
    }
}

#[test]
fn test_invalid_json() {
    let file = write_config("{ not json");
    assert!(matches!(
        InstrumentConfig::from_file(file.path()),
        Err(ProtocolError::Config(_))
    ));
}
