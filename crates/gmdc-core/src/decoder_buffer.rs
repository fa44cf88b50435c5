use byteorder::{ByteOrder, LittleEndian};
use glam::{Quat, Vec2, Vec3};

use crate::status::{GmdcError, Result};

/// Input buffer for reading resource file records.
///
/// `DecoderBuffer` provides sequential little-endian access to the raw bytes
/// of a resource file. Every read is bounds checked; running past the end of
/// the data yields `GmdcError::Truncated` with the offset of the failed read.
///
/// # Example
///
/// ```
/// use gmdc_core::DecoderBuffer;
///
/// let data = [0x01, 0x00, 0xFF, 0xFF, 0x02, 0x00, 0x00, 0x00];
/// let mut buffer = DecoderBuffer::new(&data);
///
/// buffer.expect_bytes(&[0x01, 0x00, 0xFF, 0xFF]).unwrap();
/// assert_eq!(buffer.decode_u32().unwrap(), 2);
/// assert_eq!(buffer.remaining_size(), 0);
/// ```
pub struct DecoderBuffer<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DecoderBuffer<'a> {
    /// Creates a new `DecoderBuffer` from a byte slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current read position in bytes.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of bytes remaining in the buffer.
    pub fn remaining_size(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Peeks at the next `len` bytes without advancing the position.
    pub fn peek_bytes(&self, len: usize) -> &'a [u8] {
        let end = std::cmp::min(self.pos + len, self.data.len());
        &self.data[self.pos..end]
    }

    /// Decodes and returns a slice of the specified size.
    ///
    /// # Errors
    ///
    /// Returns `GmdcError::Truncated` if not enough bytes remain.
    pub fn decode_slice(&mut self, size: usize) -> Result<&'a [u8]> {
        if size > self.remaining_size() {
            return Err(GmdcError::Truncated {
                offset: self.pos,
                needed: size,
                available: self.remaining_size(),
            });
        }
        let slice = &self.data[self.pos..self.pos + size];
        self.pos += size;
        Ok(slice)
    }

    /// Decodes a fixed-size opaque byte block.
    pub fn decode_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.decode_slice(N)?);
        Ok(out)
    }

    /// Reads `expected.len()` bytes and checks them against `expected`.
    ///
    /// # Errors
    ///
    /// Returns `GmdcError::Format` carrying the offset of the block and both
    /// byte strings when the data differs. The position is not advanced on
    /// failure.
    pub fn expect_bytes(&mut self, expected: &[u8]) -> Result<()> {
        let actual = self.peek_bytes(expected.len());
        if actual != expected {
            return Err(GmdcError::format(self.pos, expected, actual));
        }
        self.pos += expected.len();
        Ok(())
    }

    pub fn decode_u8(&mut self) -> Result<u8> {
        Ok(self.decode_slice(1)?[0])
    }

    pub fn decode_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.decode_slice(4)?))
    }

    pub fn decode_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.decode_slice(4)?))
    }

    pub fn decode_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.decode_slice(4)?))
    }

    pub fn decode_vec2(&mut self) -> Result<Vec2> {
        let mut v = [0f32; 2];
        LittleEndian::read_f32_into(self.decode_slice(8)?, &mut v);
        Ok(Vec2::from_array(v))
    }

    pub fn decode_vec3(&mut self) -> Result<Vec3> {
        let mut v = [0f32; 3];
        LittleEndian::read_f32_into(self.decode_slice(12)?, &mut v);
        Ok(Vec3::from_array(v))
    }

    /// Decodes a quaternion stored as `x, y, z, w`.
    pub fn decode_quat(&mut self) -> Result<Quat> {
        let mut v = [0f32; 4];
        LittleEndian::read_f32_into(self.decode_slice(16)?, &mut v);
        Ok(Quat::from_array(v))
    }

    /// Decodes a signed element count and checks that `count * element_size`
    /// bytes are still available, so corrupt counts fail before allocating.
    pub fn decode_count(&mut self, element_size: usize) -> Result<usize> {
        let offset = self.pos;
        let count = self.decode_i32()?;
        if count < 0 {
            return Err(GmdcError::invalid_record(
                offset,
                format!("negative element count {}", count),
            ));
        }
        let count = count as usize;
        let needed = count.saturating_mul(element_size);
        if needed > self.remaining_size() {
            return Err(GmdcError::Truncated {
                offset: self.pos,
                needed,
                available: self.remaining_size(),
            });
        }
        Ok(count)
    }

    /// Decodes a length-prefixed string.
    ///
    /// The length is a little-endian `u32`; the bytes are passed through one
    /// to one as code points U+0000..=U+00FF so that any byte sequence
    /// survives a decode/encode cycle unchanged.
    pub fn decode_string(&mut self) -> Result<String> {
        let offset = self.pos;
        let len = self.decode_u32()? as usize;
        if len > self.remaining_size() {
            return Err(GmdcError::Truncated {
                offset,
                needed: len,
                available: self.remaining_size(),
            });
        }
        let bytes = self.decode_slice(len)?;
        Ok(bytes.iter().map(|&b| b as char).collect())
    }
}
