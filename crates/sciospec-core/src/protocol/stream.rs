//! Byte transports
//!
//! The session talks to the instrument through [`Transport`], a blocking
//! byte stream whose reads give up after a timeout. A timed-out read
//! surfaces as `Ok(0)` or a `TimedOut`/`WouldBlock` error, which
//! [`read_exact`](super::frame::read_exact) turns into a short buffer.

use serialport::SerialPort;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

/// Abstraction for communication channels (serial or TCP)
pub trait Transport: Read + Write + Send {
    /// Set timeout for read/write operations
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Drop any unread input
    fn clear_input_buffer(&mut self) -> io::Result<()>;

    /// Human-readable endpoint description for logs
    fn describe(&self) -> String;
}

/// Serial port wrapper implementing Transport
pub struct SerialChannel {
    port: Box<dyn SerialPort>,
}

impl SerialChannel {
    /// Wrap an opened serial port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Read for SerialChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.port.read(buf)
    }
}

impl Write for SerialChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }
}

impl Transport for SerialChannel {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }

    fn describe(&self) -> String {
        self.port
            .name()
            .unwrap_or_else(|| "serial port".to_string())
    }
}

/// TCP stream wrapper implementing Transport (Ethernet-equipped devices)
pub struct TcpChannel {
    stream: TcpStream,
}

impl TcpChannel {
    /// Wrap a connected socket
    pub fn new(stream: TcpStream) -> Self {
        Self { stream }
    }
}

impl Read for TcpChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }
}

impl Write for TcpChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

impl Transport for TcpChannel {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.stream.set_read_timeout(Some(timeout))?;
        self.stream.set_write_timeout(Some(timeout))?;
        Ok(())
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        // No flush syscall for sockets: drain whatever is queued without
        // blocking, then go back to blocking mode.
        self.stream.set_nonblocking(true)?;
        let mut buf = [0u8; 1024];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    let _ = self.stream.set_nonblocking(false);
                    return Err(e);
                }
            }
        }
        self.stream.set_nonblocking(false)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "tcp socket".to_string())
    }
}
