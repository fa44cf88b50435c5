//! Tagged property values stored in `cDataListExtension` nodes.

use std::fmt;

use glam::{Vec3, Vec4};

use crate::decoder_buffer::DecoderBuffer;
use crate::encoder_buffer::EncoderBuffer;
use crate::status::{to_hex, GmdcError, Result};

/// Nesting limit for property lists.
pub const MAX_LIST_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    String(String),
    List(Vec<DataEntry>),
    Vec4(Vec4),
    Bytes(Vec<u8>),
}

impl DataValue {
    pub fn tag(&self) -> u8 {
        match self {
            DataValue::Int(_) => 0x02,
            DataValue::Float(_) => 0x03,
            DataValue::Vec3(_) => 0x05,
            DataValue::String(_) => 0x06,
            DataValue::List(_) => 0x07,
            DataValue::Vec4(_) => 0x08,
            DataValue::Bytes(_) => 0x09,
        }
    }
}

/// A named property value.
#[derive(Debug, Clone, PartialEq)]
pub struct DataEntry {
    pub name: String,
    pub value: DataValue,
}

impl DataEntry {
    pub fn new(name: impl Into<String>, value: DataValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn decode(buffer: &mut DecoderBuffer) -> Result<Self> {
        Self::decode_at_depth(buffer, 0)
    }

    fn decode_at_depth(buffer: &mut DecoderBuffer, depth: usize) -> Result<Self> {
        let offset = buffer.position();
        let tag = buffer.decode_u8()?;
        let name = buffer.decode_string()?;
        let value = match tag {
            0x02 => DataValue::Int(buffer.decode_i32()?),
            0x03 => DataValue::Float(buffer.decode_f32()?),
            0x05 => DataValue::Vec3(buffer.decode_vec3()?),
            0x06 => DataValue::String(buffer.decode_string()?),
            0x07 => {
                if depth >= MAX_LIST_DEPTH {
                    return Err(GmdcError::invalid_record(
                        offset,
                        format!("property list \"{}\" is nested too deeply", name),
                    ));
                }
                // Each entry needs at least a tag and a name length.
                let count = buffer.decode_count(5)?;
                let entries = (0..count)
                    .map(|_| Self::decode_at_depth(buffer, depth + 1))
                    .collect::<Result<Vec<_>>>()?;
                DataValue::List(entries)
            }
            0x08 => {
                let q = buffer.decode_quat()?;
                DataValue::Vec4(Vec4::from_array(q.to_array()))
            }
            0x09 => {
                let len = buffer.decode_count(1)?;
                DataValue::Bytes(buffer.decode_slice(len)?.to_vec())
            }
            other => {
                return Err(GmdcError::invalid_record(
                    offset,
                    format!("unknown property type {:#04x} for \"{}\"", other, name),
                ))
            }
        };
        Ok(Self { name, value })
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer) -> Result<()> {
        buffer.encode_u8(self.value.tag());
        buffer.encode_string(&self.name)?;
        match &self.value {
            DataValue::Int(v) => buffer.encode_i32(*v),
            DataValue::Float(v) => buffer.encode_f32(*v),
            DataValue::Vec3(v) => buffer.encode_vec3(*v),
            DataValue::String(s) => buffer.encode_string(s)?,
            DataValue::List(entries) => {
                buffer.encode_count(entries.len())?;
                for e in entries {
                    e.encode(buffer)?;
                }
            }
            DataValue::Vec4(v) => {
                for c in v.to_array() {
                    buffer.encode_f32(c);
                }
            }
            DataValue::Bytes(b) => {
                buffer.encode_count(b.len())?;
                buffer.encode_bytes(b);
            }
        }
        Ok(())
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let pad = "  ".repeat(indent);
        match &self.value {
            DataValue::Int(v) => write!(f, "{}\"{}\": {}", pad, self.name, v),
            DataValue::Float(v) => write!(f, "{}\"{}\": {:.6}", pad, self.name, v),
            DataValue::Vec3(v) => write!(
                f,
                "{}\"{}\": ({:.6}, {:.6}, {:.6})",
                pad, self.name, v.x, v.y, v.z
            ),
            DataValue::String(s) => write!(f, "{}\"{}\": \"{}\"", pad, self.name, s),
            DataValue::Vec4(v) => write!(
                f,
                "{}\"{}\": ({:.6}, {:.6}, {:.6}, {:.6})",
                pad, self.name, v.x, v.y, v.z, v.w
            ),
            DataValue::Bytes(b) => write!(
                f,
                "{}\"{}\" ({} bytes): {}",
                pad,
                self.name,
                b.len(),
                to_hex(b)
            ),
            DataValue::List(entries) => {
                write!(f, "{}list \"{}\" ({}):", pad, self.name, entries.len())?;
                for e in entries {
                    writeln!(f)?;
                    e.fmt_indented(f, indent + 1)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for DataEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
