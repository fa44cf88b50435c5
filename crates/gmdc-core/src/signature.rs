//! Fixed byte signatures of the resource file format.
//!
//! Every shared block starts with a pascal-style class name, a 4-byte magic
//! and a 4-byte embedded count or version. The blocks are matched byte for
//! byte; see [`DecoderBuffer::expect_bytes`](crate::DecoderBuffer::expect_bytes).

/// First four bytes of every resource file.
pub const FILE_SIGNATURE: [u8; 4] = [0x01, 0x00, 0xFF, 0xFF];

/// Size in bytes of one linked resource entry (four `u32` values).
pub const LINKED_RESOURCE_SIZE: usize = 16;

/// Size in bytes of a `NodeRef` triple (`u8`, `u8`, `i32`).
pub const NODE_REF_SIZE: usize = 6;

pub const SG_RESOURCE: &[u8] = b"\x0bcSGResource\x00\x00\x00\x00\x02\x00\x00\x00";

pub const OBJECT_GRAPH_NODE: &[u8] = b"\x10cObjectGraphNode\x00\x00\x00\x00\x04\x00\x00\x00";

pub const COMPOSITION_TREE_NODE: &[u8] =
    b"\x14cCompositionTreeNode\x00\x00\x00\x00\x0b\x00\x00\x00";

/// Embedded transform block; the trailing `07000000` is its version.
pub const TRANSFORM_NODE: &[u8] = b"\x0ecTransformNode\x62\x64\x24\x65\x07\x00\x00\x00";

pub const BOUNDED_NODE: &[u8] = b"\x0ccBoundedNode\x00\x00\x00\x00\x05\x00\x00\x00";

pub const RENDERABLE_NODE: &[u8] = b"\x0fcRenderableNode\x00\x00\x00\x00\x05\x00\x00\x00";

pub const EXTENSION: &[u8] = b"\x0acExtension\x00\x00\x00\x00\x03\x00\x00\x00";

pub const VIEWER_REF_NODE_BASE: &[u8] =
    b"\x12cViewerRefNodeBase\x00\x00\x00\x00\x05\x00\x00\x00";

/// Bone index value meaning "no bone".
pub const NO_BONE_INDEX: i32 = 0x7FFF_FFFF;

/// Builds the type header of a top-level node: pascal name followed by magic.
pub fn type_header(type_name: &str, magic: [u8; 4]) -> Vec<u8> {
    let mut header = Vec::with_capacity(type_name.len() + 5);
    header.push(type_name.len() as u8);
    header.extend_from_slice(type_name.as_bytes());
    header.extend_from_slice(&magic);
    header
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_lengths() {
        assert_eq!(SG_RESOURCE.len(), 20);
        assert_eq!(OBJECT_GRAPH_NODE.len(), 25);
        assert_eq!(COMPOSITION_TREE_NODE.len(), 29);
        assert_eq!(TRANSFORM_NODE.len(), 23);
        assert_eq!(BOUNDED_NODE.len(), 21);
        assert_eq!(RENDERABLE_NODE.len(), 24);
        assert_eq!(EXTENSION.len(), 19);
        assert_eq!(VIEWER_REF_NODE_BASE.len(), 27);
    }

    #[test]
    fn test_type_header_matches_transform_block() {
        let header = type_header("cTransformNode", [0x62, 0x64, 0x24, 0x65]);
        assert_eq!(&TRANSFORM_NODE[..header.len()], header.as_slice());
    }
}
