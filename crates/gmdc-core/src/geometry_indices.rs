use std::fmt;

use crate::decoder_buffer::DecoderBuffer;
use crate::encoder_buffer::EncoderBuffer;
use crate::status::Result;

/// Cross reference to another node, stored as `(u8, u8, i32)`.
///
/// Only `index` is interpreted (as a position in the node list); the two
/// leading bytes are kept as read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub kind: u8,
    pub subindex: u8,
    pub index: i32,
}

impl NodeRef {
    pub fn new(kind: u8, subindex: u8, index: i32) -> Self {
        Self {
            kind,
            subindex,
            index,
        }
    }

    pub fn decode(buffer: &mut DecoderBuffer) -> Result<Self> {
        Ok(Self {
            kind: buffer.decode_u8()?,
            subindex: buffer.decode_u8()?,
            index: buffer.decode_i32()?,
        })
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer) {
        buffer.encode_u8(self.kind);
        buffer.encode_u8(self.subindex);
        buffer.encode_i32(self.index);
    }

    /// The referenced node position, if it is a valid position at all.
    pub fn node_index(&self) -> Option<usize> {
        usize::try_from(self.index).ok()
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.kind, self.subindex, self.index)
    }
}

/// Handle of a node in a [`TransformTree`](crate::TransformTree) arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransformNodeId(pub u32);

impl From<usize> for TransformNodeId {
    fn from(v: usize) -> Self {
        Self(v as u32)
    }
}

impl From<TransformNodeId> for usize {
    fn from(v: TransformNodeId) -> Self {
        v.0 as usize
    }
}

impl fmt::Display for TransformNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_ref_layout() {
        let mut buffer = EncoderBuffer::new();
        NodeRef::new(0, 1, 3).encode(&mut buffer);
        assert_eq!(buffer.data(), &[0x00, 0x01, 0x03, 0x00, 0x00, 0x00]);

        let mut decoder = DecoderBuffer::new(buffer.data());
        let r = NodeRef::decode(&mut decoder).unwrap();
        assert_eq!(r.node_index(), Some(3));
    }

    #[test]
    fn test_negative_index_is_not_a_position() {
        assert_eq!(NodeRef::new(0, 0, -1).node_index(), None);
    }
}
