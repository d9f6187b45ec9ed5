//! Sciospec Instrument Probe
//!
//! Opens a session, prints the device and firmware ids and, when a
//! configuration file with a setup is given, runs one sweep.
//!
//! Usage:
//!   cargo run --example sciospec_probe -- [OPTIONS] [PORT]
//!
//! Options:
//!   --port PORT       Serial port (required unless --tcp or the config names one)
//!   --baud RATE       Baud rate (default: 9600)
//!   --timeout MS      Read timeout in ms (default: 1000)
//!   --config FILE     JSON instrument configuration
//!   --tcp ADDR        Connect over Ethernet instead, e.g. 192.168.1.20:5000
//!   --list            List serial ports and exit
//!
//! Set `RUST_LOG=sciospec_core=debug` to see every frame on the wire.

use anyhow::{bail, Context, Result};
use sciospec_core::prelude::*;
use sciospec_core::protocol::list_ports;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut port_name: Option<String> = None;
    let mut baud_rate: Option<u32> = None;
    let mut timeout_ms: Option<u64> = None;
    let mut config_path: Option<String> = None;
    let mut tcp_addr: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                i += 1;
                port_name = args.get(i).cloned();
            }
            "--baud" | "-b" => {
                i += 1;
                if let Some(value) = args.get(i) {
                    baud_rate = Some(value.parse().context("invalid baud rate")?);
                }
            }
            "--timeout" | "-t" => {
                i += 1;
                if let Some(value) = args.get(i) {
                    timeout_ms = Some(value.parse().context("invalid timeout")?);
                }
            }
            "--config" | "-c" => {
                i += 1;
                config_path = args.get(i).cloned();
            }
            "--tcp" => {
                i += 1;
                tcp_addr = args.get(i).cloned();
            }
            "--list" | "-l" => {
                for port in list_ports() {
                    println!(
                        "{:<16} {}",
                        port.name,
                        port.product.as_deref().unwrap_or("")
                    );
                }
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            arg if !arg.starts_with('-') => {
                port_name = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
            }
        }
        i += 1;
    }

    let mut config = match &config_path {
        Some(path) => InstrumentConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None => InstrumentConfig::default(),
    };

    // Command line wins over the file
    if let Some(name) = port_name {
        config.connection.port_name = name;
    }
    if let Some(baud) = baud_rate {
        config.connection.baud_rate = baud;
    }
    if let Some(ms) = timeout_ms {
        config.connection.timeout_ms = ms;
    }

    let mut session = match &tcp_addr {
        Some(addr) => {
            let addr: SocketAddr = addr.parse().context("invalid --tcp address")?;
            println!("Connecting to {}...", addr);
            DeviceSession::open_tcp(addr, config.connection.timeout())?
        }
        None => {
            if config.connection.port_name.is_empty() {
                let names: Vec<String> = list_ports().into_iter().map(|p| p.name).collect();
                if names.is_empty() {
                    bail!("no serial port given and none detected");
                }
                bail!("no serial port given; detected: {}", names.join(", "));
            }
            println!(
                "Opening {} at {} baud...",
                config.connection.port_name, config.connection.baud_rate
            );
            DeviceSession::open_serial(&config.connection)?
        }
    };

    println!("Device id:   {}", hex(&session.get_device_id()?));
    println!("Firmware id: {}", hex(&session.get_firmware_id()?));

    let Some(setup) = config.setup else {
        println!("No setup configured, done.");
        return Ok(());
    };

    if let Some(frontend) = &config.frontend {
        session.configure_frontend(frontend)?;
        println!(
            "Frontend: {} on {}, current range {}",
            frontend.mode, frontend.channel, frontend.current_range
        );
    }

    session.configure_sweep(&setup)?;
    let frequencies = session.get_frequency_list()?;

    let results = session.run_measurement()?;
    println!();
    println!("{:>12}  {:>14}  {:>14}  {:>12}  {:>8}", "f [Hz]", "Re [Ω]", "Im [Ω]", "|Z| [Ω]", "φ [°]");
    for (index, point) in results.iter().enumerate() {
        let freq = frequencies
            .get(index)
            .map(|f| format!("{:.1}", f))
            .unwrap_or_else(|| "?".to_string());
        println!(
            "{:>12}  {:>14.4}  {:>14.4}  {:>12.4}  {:>8.2}",
            freq,
            point.real,
            point.imaginary,
            point.magnitude(),
            point.phase_degrees()
        );
    }

    let (tx_bytes, rx_bytes, tx_frames, rx_frames) = session.counters();
    println!();
    println!(
        "Sent {} frames ({} bytes), received {} frames ({} bytes)",
        tx_frames, tx_bytes, rx_frames, rx_bytes
    );
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_help() {
    println!("Sciospec Instrument Probe");
    println!();
    println!("Usage: sciospec_probe [OPTIONS] [PORT]");
    println!();
    println!("Options:");
    println!("  -p, --port PORT      Serial port (required unless --tcp or the config names one)");
    println!("  -b, --baud RATE      Baud rate (default: 9600)");
    println!("  -t, --timeout MS     Read timeout in ms (default: 1000)");
    println!("  -c, --config FILE    JSON instrument configuration");
    println!("      --tcp ADDR       Connect over Ethernet instead of serial");
    println!("  -l, --list           List serial ports and exit");
    println!("  -h, --help           Show this help");
}
