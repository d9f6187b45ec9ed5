//! Frame encoding/decoding
//!
//! Implements the tagged frame format used in both directions.
//!
//! Frame format:
//! - 1 byte: Tag (command family)
//! - 1 byte: Declared payload length
//! - N bytes: Payload
//! - 1 byte: Tag again (frame boundary marker, not a checksum)
//!
//! Numeric fields inside payloads are big-endian; floats are IEEE-754
//! single precision.

use byteorder::{BigEndian, ByteOrder};
use std::io::{ErrorKind, Read};

use super::ProtocolError;

/// A tagged command frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    /// Command tag, repeated as the trailing byte
    pub tag: u8,
    /// Length byte written to the header
    pub declared_length: u8,
    /// Frame payload
    pub payload: Vec<u8>,
}

impl CommandFrame {
    /// Create a frame whose declared length is the payload length
    pub fn new(tag: u8, payload: Vec<u8>) -> Result<Self, ProtocolError> {
        let declared_length = u8::try_from(payload.len()).map_err(|_| {
            ProtocolError::MalformedFrame(format!(
                "payload of {} bytes does not fit a one-byte length field",
                payload.len()
            ))
        })?;
        Ok(Self {
            tag,
            declared_length,
            payload,
        })
    }

    /// Create a frame with a hardcoded length byte.
    ///
    /// The set-setup command must declare 16 bytes even though the
    /// frequency-list payload it carries is longer.
    pub fn with_declared_length(tag: u8, payload: Vec<u8>, declared_length: u8) -> Self {
        Self {
            tag,
            declared_length,
            payload,
        }
    }

    /// Decode a complete tagged frame, checking both tag bytes and the
    /// length byte against `expected_tag` and the data actually present.
    pub fn from_bytes(data: &[u8], expected_tag: u8) -> Result<Self, ProtocolError> {
        if data.len() < 3 {
            return Err(ProtocolError::MalformedFrame(format!(
                "frame of {} bytes is shorter than header and trailer",
                data.len()
            )));
        }

        let tag = data[0];
        if tag != expected_tag {
            return Err(ProtocolError::MalformedFrame(format!(
                "expected tag {:#04x}, got {:#04x}",
                expected_tag, tag
            )));
        }

        let declared_length = data[1];
        let trailer = data[data.len() - 1];
        if trailer != tag {
            return Err(ProtocolError::MalformedFrame(format!(
                "trailing tag {:#04x} does not match {:#04x}",
                trailer, tag
            )));
        }

        let payload = &data[2..data.len() - 1];
        if payload.len() != declared_length as usize {
            return Err(ProtocolError::MalformedFrame(format!(
                "length byte says {} but frame carries {} payload bytes",
                declared_length,
                payload.len()
            )));
        }

        Ok(Self {
            tag,
            declared_length,
            payload: payload.to_vec(),
        })
    }

    /// Encode the frame to raw bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.encoded_size());
        bytes.push(self.tag);
        bytes.push(self.declared_length);
        bytes.extend_from_slice(&self.payload);
        bytes.push(self.tag);
        bytes
    }

    /// Get the total encoded size
    pub fn encoded_size(&self) -> usize {
        self.payload.len() + 3
    }
}

/// Encode `[tag, length, payload..., tag]`.
///
/// `declared_length_override` replaces the length byte; without it the
/// payload length is used.
pub fn encode_command(
    tag: u8,
    payload: &[u8],
    declared_length_override: Option<u8>,
) -> Result<Vec<u8>, ProtocolError> {
    let frame = match declared_length_override {
        Some(len) => CommandFrame::with_declared_length(tag, payload.to_vec(), len),
        None => CommandFrame::new(tag, payload.to_vec())?,
    };
    Ok(frame.to_bytes())
}

/// Encode an f32 as 4 big-endian bytes
pub fn encode_f32_be(value: f32) -> [u8; 4] {
    let mut buf = [0u8; 4];
    BigEndian::write_f32(&mut buf, value);
    buf
}

/// Builder for frame payloads
#[derive(Debug, Default)]
pub struct PayloadBuilder {
    payload: Vec<u8>,
}

impl PayloadBuilder {
    /// Create an empty payload builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a single byte
    pub fn byte(mut self, b: u8) -> Self {
        self.payload.push(b);
        self
    }

    /// Add a 32-bit float (big-endian)
    pub fn f32_be(mut self, value: f32) -> Self {
        self.payload.extend_from_slice(&encode_f32_be(value));
        self
    }

    /// Finish the payload
    pub fn build(self) -> Vec<u8> {
        self.payload
    }
}

fn expect_width(bytes: &[u8], width: usize, what: &str) -> Result<(), ProtocolError> {
    if bytes.len() != width {
        return Err(ProtocolError::MalformedFrame(format!(
            "{} needs exactly {} bytes, got {}",
            what,
            width,
            bytes.len()
        )));
    }
    Ok(())
}

/// Decode a single byte
pub fn decode_u8(bytes: &[u8]) -> Result<u8, ProtocolError> {
    expect_width(bytes, 1, "u8")?;
    Ok(bytes[0])
}

/// Decode a big-endian u16
pub fn decode_u16_be(bytes: &[u8]) -> Result<u16, ProtocolError> {
    expect_width(bytes, 2, "u16")?;
    Ok(BigEndian::read_u16(bytes))
}

/// Decode a big-endian f32
pub fn decode_f32_be(bytes: &[u8]) -> Result<f32, ProtocolError> {
    expect_width(bytes, 4, "f32")?;
    Ok(BigEndian::read_f32(bytes))
}

/// Read up to `n` bytes one at a time.
///
/// Stops early when the reader times out or reaches end of stream and
/// returns whatever was collected, possibly nothing. Callers decide what
/// a short buffer means. Any other I/O failure is a transport error.
pub fn read_exact<R: Read + ?Sized>(reader: &mut R, n: usize) -> Result<Vec<u8>, ProtocolError> {
    let mut buffer = Vec::with_capacity(n);
    let mut byte = [0u8; 1];

    while buffer.len() < n {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => buffer.push(byte[0]),
            Err(ref e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(ref e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                break
            }
            Err(e) => return Err(ProtocolError::TransportUnavailable(e.to_string())),
        }
    }

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};

    #[test]
    fn test_frame_layout() {
        let bytes = encode_command(0xB8, &[0x01, 0x00, 0x00], None).unwrap();
        assert_eq!(bytes, vec![0xB8, 0x03, 0x01, 0x00, 0x00, 0xB8]);
    }

    #[test]
    fn test_empty_payload() {
        let bytes = encode_command(0xD1, &[], None).unwrap();
        assert_eq!(bytes, vec![0xD1, 0x00, 0xD1]);
    }

    #[test]
    fn test_length_and_tags_for_any_payload() {
        for len in [0usize, 1, 4, 22, 255] {
            let payload = vec![0xAA; len];
            let bytes = encode_command(0x42, &payload, None).unwrap();
            assert_eq!(bytes.len(), len + 3);
            assert_eq!(bytes[0], 0x42);
            assert_eq!(bytes[bytes.len() - 1], 0x42);
            assert_eq!(bytes[1] as usize, len);
        }
    }

    #[test]
    fn test_length_override() {
        let payload = vec![0u8; 22];
        let bytes = encode_command(0xB6, &payload, Some(16)).unwrap();
        assert_eq!(bytes[1], 16);
        assert_eq!(bytes.len(), 25);
        assert_eq!(bytes[24], 0xB6);
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let payload = vec![0u8; 256];
        assert!(matches!(
            encode_command(0xB0, &payload, None),
            Err(ProtocolError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_f32_roundtrip_is_bitwise() {
        let values = [
            0.0f32,
            -0.0,
            1.5,
            -2.0,
            0.25,
            f32::MIN_POSITIVE,
            f32::MAX,
            f32::INFINITY,
            f32::NEG_INFINITY,
            1.0e-42, // subnormal
        ];
        for v in values {
            let decoded = decode_f32_be(&encode_f32_be(v)).unwrap();
            assert_eq!(decoded.to_bits(), v.to_bits());
        }

        let nan = f32::from_bits(0x7FC0_1234);
        let decoded = decode_f32_be(&encode_f32_be(nan)).unwrap();
        assert_eq!(decoded.to_bits(), nan.to_bits());
    }

    #[test]
    fn test_f32_is_big_endian() {
        assert_eq!(encode_f32_be(1.0), [0x3F, 0x80, 0x00, 0x00]);
        assert_eq!(encode_f32_be(100.0), [0x42, 0xC8, 0x00, 0x00]);
    }

    #[test]
    fn test_decoders_require_exact_width() {
        assert_eq!(decode_u8(&[0x7F]).unwrap(), 0x7F);
        assert_eq!(decode_u16_be(&[0x01, 0x02]).unwrap(), 0x0102);
        assert!(decode_u8(&[]).is_err());
        assert!(decode_u16_be(&[0x01]).is_err());
        assert!(decode_u16_be(&[0x01, 0x02, 0x03]).is_err());
        assert!(decode_f32_be(&[0x3F, 0x80, 0x00]).is_err());
    }

    #[test]
    fn test_from_bytes() {
        let frame = CommandFrame::from_bytes(&[0xD1, 0x02, 0xAB, 0xCD, 0xD1], 0xD1).unwrap();
        assert_eq!(frame.payload, vec![0xAB, 0xCD]);

        // wrong trailer
        assert!(CommandFrame::from_bytes(&[0xD1, 0x02, 0xAB, 0xCD, 0xD2], 0xD1).is_err());
        // wrong leading tag
        assert!(CommandFrame::from_bytes(&[0xD2, 0x02, 0xAB, 0xCD, 0xD2], 0xD1).is_err());
        // length byte disagrees with payload
        assert!(CommandFrame::from_bytes(&[0xD1, 0x03, 0xAB, 0xCD, 0xD1], 0xD1).is_err());
        assert!(CommandFrame::from_bytes(&[0xD1, 0x00], 0xD1).is_err());
    }

    #[test]
    fn test_read_exact_short_on_eof() {
        let mut reader = Cursor::new(vec![1u8, 2, 3]);
        assert_eq!(read_exact(&mut reader, 4).unwrap(), vec![1, 2, 3]);
        assert!(read_exact(&mut reader, 4).unwrap().is_empty());
    }

    struct TimingOut;

    impl Read for TimingOut {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::TimedOut, "timed out"))
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::BrokenPipe, "unplugged"))
        }
    }

    #[test]
    fn test_read_exact_timeout_is_not_an_error() {
        assert!(read_exact(&mut TimingOut, 4).unwrap().is_empty());
    }

    #[test]
    fn test_read_exact_transport_failure() {
        assert!(matches!(
            read_exact(&mut Broken, 4),
            Err(ProtocolError::TransportUnavailable(_))
        ));
    }
}
