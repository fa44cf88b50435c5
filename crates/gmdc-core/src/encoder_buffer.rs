use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Quat, Vec2, Vec3};

use crate::status::{GmdcError, Result};

/// Output buffer for resource file serialization.
///
/// Writes into a `Vec<u8>` never fail, so the primitive encoders return
/// nothing. Only strings and counts, which can be out of range for the
/// format, are fallible.
#[derive(Debug, Clone, Default)]
pub struct EncoderBuffer {
    buffer: Vec<u8>,
}

impl EncoderBuffer {
    /// Create a new empty encoder buffer
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a buffer with initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Get the current buffer data
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer size
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    /// Consume the buffer and return the encoded bytes
    pub fn into_vec(self) -> Vec<u8> {
        self.buffer
    }

    pub fn encode_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn encode_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn encode_i32(&mut self, value: i32) {
        // Writing to a Vec cannot fail.
        let _ = self.buffer.write_i32::<LittleEndian>(value);
    }

    pub fn encode_u32(&mut self, value: u32) {
        let _ = self.buffer.write_u32::<LittleEndian>(value);
    }

    pub fn encode_f32(&mut self, value: f32) {
        let _ = self.buffer.write_f32::<LittleEndian>(value);
    }

    pub fn encode_vec2(&mut self, value: Vec2) {
        for c in value.to_array() {
            self.encode_f32(c);
        }
    }

    pub fn encode_vec3(&mut self, value: Vec3) {
        for c in value.to_array() {
            self.encode_f32(c);
        }
    }

    /// Encodes a quaternion as `x, y, z, w`.
    pub fn encode_quat(&mut self, value: Quat) {
        for c in value.to_array() {
            self.encode_f32(c);
        }
    }

    /// Encodes an element count as a signed 32-bit integer.
    pub fn encode_count(&mut self, count: usize) -> Result<()> {
        let value = i32::try_from(count).map_err(|_| {
            GmdcError::invalid_parameter(format!("count {} does not fit in an i32", count))
        })?;
        self.encode_i32(value);
        Ok(())
    }

    /// Encodes a count that is stored in a single byte.
    pub fn encode_small_count(&mut self, count: usize) -> Result<()> {
        let value = u8::try_from(count).map_err(|_| {
            GmdcError::invalid_parameter(format!("count {} does not fit in a byte", count))
        })?;
        self.encode_u8(value);
        Ok(())
    }

    /// Encodes a `u32` length-prefixed string, one byte per char.
    ///
    /// # Errors
    ///
    /// Returns `GmdcError::InvalidParameter` if the string holds a char
    /// above U+00FF.
    pub fn encode_string(&mut self, value: &str) -> Result<()> {
        let bytes = string_bytes(value)?;
        let len = u32::try_from(bytes.len()).map_err(|_| {
            GmdcError::invalid_parameter(format!("string of {} bytes is too long", bytes.len()))
        })?;
        self.encode_u32(len);
        self.encode_bytes(&bytes);
        Ok(())
    }
}

/// Converts a string to its one-byte-per-char file representation.
pub fn string_bytes(value: &str) -> Result<Vec<u8>> {
    value
        .chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                GmdcError::invalid_parameter(format!(
                    "character {:?} in {:?} cannot be stored in a resource file",
                    c, value
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder_buffer::DecoderBuffer;

    #[test]
    fn test_little_endian_layout() {
        let mut buffer = EncoderBuffer::new();
        buffer.encode_u32(0x12345678);
        buffer.encode_i32(-1);
        buffer.encode_f32(1.0);
        assert_eq!(
            buffer.data(),
            &[0x78, 0x56, 0x34, 0x12, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0x80, 0x3F]
        );
    }

    #[test]
    fn test_quat_component_order() {
        let mut buffer = EncoderBuffer::new();
        buffer.encode_quat(Quat::from_xyzw(1.0, 2.0, 3.0, 4.0));
        let mut decoder = DecoderBuffer::new(buffer.data());
        assert_eq!(decoder.decode_f32().unwrap(), 1.0);
        decoder.decode_f32().unwrap();
        decoder.decode_f32().unwrap();
        assert_eq!(decoder.decode_f32().unwrap(), 4.0);
    }

    #[test]
    fn test_latin1_string() {
        let mut buffer = EncoderBuffer::new();
        buffer.encode_string("caf\u{e9}").unwrap();
        assert_eq!(buffer.data(), &[4, 0, 0, 0, b'c', b'a', b'f', 0xE9]);
    }

    #[test]
    fn test_wide_char_rejected() {
        let mut buffer = EncoderBuffer::new();
        let err = buffer.encode_string("bone\u{263a}").unwrap_err();
        assert!(matches!(err, GmdcError::InvalidParameter(_)));
    }

    #[test]
    fn test_small_count_overflow() {
        let mut buffer = EncoderBuffer::new();
        assert!(buffer.encode_small_count(255).is_ok());
        assert!(buffer.encode_small_count(256).is_err());
    }
}
