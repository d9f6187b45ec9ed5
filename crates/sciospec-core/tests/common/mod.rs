//! Scripted transport shared by the integration tests.

#![allow(dead_code)]

use sciospec_core::protocol::frame::encode_f32_be;
use sciospec_core::protocol::Transport;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct MockState {
    /// Bytes the "device" will answer with, in order
    recv_buffer: VecDeque<u8>,
    /// One entry per write call
    sent: Vec<Vec<u8>>,
    fail_on_send: bool,
    clears: usize,
}

/// Mock serial port. Clones share state, so a test can keep a handle
/// after the session takes ownership of the boxed transport.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw response bytes
    pub fn respond(&self, bytes: &[u8]) -> &Self {
        self.state.lock().unwrap().recv_buffer.extend(bytes);
        self
    }

    /// Queue an acknowledgement frame with the given code
    pub fn ack(&self, code: u8) -> &Self {
        self.respond(&[0x18, 0x01, code, 0x18])
    }

    pub fn set_fail_on_send(&self, fail: bool) {
        self.state.lock().unwrap().fail_on_send = fail;
    }

    /// Every frame written so far
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Response bytes not consumed yet
    pub fn unread(&self) -> usize {
        self.state.lock().unwrap().recv_buffer.len()
    }

    pub fn clears(&self) -> usize {
        self.state.lock().unwrap().clears
    }

    pub fn boxed(&self) -> Box<dyn Transport> {
        Box::new(self.clone())
    }
}

impl Read for MockTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        let mut n = 0;
        while n < buf.len() {
            match state.recv_buffer.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        // Nothing left behaves like a read timeout
        Ok(n)
    }
}

impl Write for MockTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on_send {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "Serial write failed"));
        }
        state.sent.push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for MockTransport {
    fn set_timeout(&mut self, _timeout: Duration) -> io::Result<()> {
        Ok(())
    }

    fn clear_input_buffer(&mut self) -> io::Result<()> {
        // Scripted responses are queued up front, so they must survive.
        self.state.lock().unwrap().clears += 1;
        Ok(())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

/// A 14-byte result frame with a current-range byte and no timestamp
pub fn result_frame(id: u16, current_range: u8, re: f32, im: f32) -> Vec<u8> {
    let mut raw = vec![0xB8, 0x0B];
    raw.extend_from_slice(&id.to_be_bytes());
    raw.push(current_range);
    raw.extend_from_slice(&encode_f32_be(re));
    raw.extend_from_slice(&encode_f32_be(im));
    raw.push(0xB8);
    raw
}

/// A tagged response frame around `payload`
pub fn data_frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut raw = vec![tag, payload.len() as u8];
    raw.extend_from_slice(payload);
    raw.push(tag);
    raw
}
