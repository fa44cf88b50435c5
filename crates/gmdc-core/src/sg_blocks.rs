//! Shared sub-blocks embedded in node payloads.
//!
//! Each block starts with its fixed signature from [`crate::signature`]. The
//! blocks nest: a renderable block holds a bounded block, which holds a
//! transform block, which holds a composition tree, which holds an object
//! graph.

use std::fmt;

use glam::{Quat, Vec3};

use crate::decoder_buffer::DecoderBuffer;
use crate::encoder_buffer::EncoderBuffer;
use crate::geometry_indices::NodeRef;
use crate::signature::{
    BOUNDED_NODE, COMPOSITION_TREE_NODE, EXTENSION, NODE_REF_SIZE, NO_BONE_INDEX,
    OBJECT_GRAPH_NODE, RENDERABLE_NODE, SG_RESOURCE, TRANSFORM_NODE, VIEWER_REF_NODE_BASE,
};
use crate::status::Result;
use crate::transform::Transform;

pub fn decode_node_refs(buffer: &mut DecoderBuffer) -> Result<Vec<NodeRef>> {
    let count = buffer.decode_count(NODE_REF_SIZE)?;
    (0..count).map(|_| NodeRef::decode(buffer)).collect()
}

pub fn encode_node_refs(buffer: &mut EncoderBuffer, refs: &[NodeRef]) -> Result<()> {
    buffer.encode_count(refs.len())?;
    for r in refs {
        r.encode(buffer);
    }
    Ok(())
}

/// Decodes `count` strings, failing early if fewer than `count` length
/// prefixes could fit in the remaining data.
pub fn decode_strings(buffer: &mut DecoderBuffer, count: usize) -> Result<Vec<String>> {
    (0..count).map(|_| buffer.decode_string()).collect()
}

pub fn decode_string_list(buffer: &mut DecoderBuffer) -> Result<Vec<String>> {
    let count = buffer.decode_count(4)?;
    decode_strings(buffer, count)
}

pub fn encode_string_list(buffer: &mut EncoderBuffer, strings: &[String]) -> Result<()> {
    buffer.encode_count(strings.len())?;
    for s in strings {
        buffer.encode_string(s)?;
    }
    Ok(())
}

/// Reads a `cSGResource` block and returns the resource name.
pub fn decode_resource_name(buffer: &mut DecoderBuffer) -> Result<String> {
    buffer.expect_bytes(SG_RESOURCE)?;
    buffer.decode_string()
}

pub fn encode_resource_name(buffer: &mut EncoderBuffer, name: &str) -> Result<()> {
    buffer.encode_bytes(SG_RESOURCE);
    buffer.encode_string(name)
}

/// Reads the `cExtension` marker that precedes extension payloads.
pub fn decode_extension_marker(buffer: &mut DecoderBuffer) -> Result<()> {
    buffer.expect_bytes(EXTENSION)
}

pub fn encode_extension_marker(buffer: &mut EncoderBuffer) {
    buffer.encode_bytes(EXTENSION);
}

/// `cObjectGraphNode`: extension references and the node's name string.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectGraph {
    pub extensions: Vec<NodeRef>,
    pub name: String,
}

impl ObjectGraph {
    pub fn decode(buffer: &mut DecoderBuffer) -> Result<Self> {
        buffer.expect_bytes(OBJECT_GRAPH_NODE)?;
        let extensions = decode_node_refs(buffer)?;
        let name = buffer.decode_string()?;
        Ok(Self { extensions, name })
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer) -> Result<()> {
        buffer.encode_bytes(OBJECT_GRAPH_NODE);
        encode_node_refs(buffer, &self.extensions)?;
        buffer.encode_string(&self.name)
    }
}

/// `cCompositionTreeNode`: an object graph plus child references.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositionTree {
    pub object_graph: ObjectGraph,
    pub children: Vec<NodeRef>,
}

impl CompositionTree {
    pub fn decode(buffer: &mut DecoderBuffer) -> Result<Self> {
        buffer.expect_bytes(COMPOSITION_TREE_NODE)?;
        let object_graph = ObjectGraph::decode(buffer)?;
        let children = decode_node_refs(buffer)?;
        Ok(Self {
            object_graph,
            children,
        })
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer) -> Result<()> {
        buffer.encode_bytes(COMPOSITION_TREE_NODE);
        self.object_graph.encode(buffer)?;
        encode_node_refs(buffer, &self.children)
    }
}

/// `cTransformNode` block: local transform and optional bone index.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformBlock {
    pub tree: CompositionTree,
    pub translation: Vec3,
    pub rotation: Quat,
    pub bone_index: Option<i32>,
}

impl TransformBlock {
    /// Decodes an embedded transform block, including its signature.
    pub fn decode(buffer: &mut DecoderBuffer) -> Result<Self> {
        buffer.expect_bytes(TRANSFORM_NODE)?;
        Self::decode_body(buffer)
    }

    /// Decodes the fields following the signature and version.
    pub fn decode_body(buffer: &mut DecoderBuffer) -> Result<Self> {
        let tree = CompositionTree::decode(buffer)?;
        let translation = buffer.decode_vec3()?;
        let rotation = buffer.decode_quat()?;
        let bone_index = match buffer.decode_i32()? {
            NO_BONE_INDEX => None,
            i => Some(i),
        };
        Ok(Self {
            tree,
            translation,
            rotation,
            bone_index,
        })
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer) -> Result<()> {
        buffer.encode_bytes(TRANSFORM_NODE);
        self.encode_body(buffer)
    }

    pub fn encode_body(&self, buffer: &mut EncoderBuffer) -> Result<()> {
        self.tree.encode(buffer)?;
        buffer.encode_vec3(self.translation);
        buffer.encode_quat(self.rotation);
        buffer.encode_i32(self.bone_index.unwrap_or(NO_BONE_INDEX));
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.tree.object_graph.name
    }

    pub fn children(&self) -> &[NodeRef] {
        &self.tree.children
    }

    pub fn local_transform(&self) -> Transform {
        Transform::new(self.translation, self.rotation)
    }
}

impl fmt::Display for TransformBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  name: \"{}\"", self.name())?;
        if !self.tree.object_graph.extensions.is_empty() {
            write!(f, "  extensions:")?;
            for r in &self.tree.object_graph.extensions {
                write!(f, " {}", r)?;
            }
            writeln!(f)?;
        }
        write!(f, "  children ({}):", self.tree.children.len())?;
        for r in &self.tree.children {
            write!(f, " {}", r)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "  transform: {}",
            Transform::new(self.translation, self.rotation)
        )?;
        match self.bone_index {
            Some(i) => write!(f, "  bone index: {}", i),
            None => write!(f, "  bone index: none"),
        }
    }
}

/// `cRenderableNode` wrapping a `cBoundedNode`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderableBlock {
    pub transform: TransformBlock,
    /// The two leading bytes of the `(u8, u8, i32)` string table header.
    pub header: [u8; 2],
    pub strings: Vec<String>,
    pub trailer: [u8; 5],
}

impl RenderableBlock {
    pub fn decode(buffer: &mut DecoderBuffer) -> Result<Self> {
        buffer.expect_bytes(RENDERABLE_NODE)?;
        buffer.expect_bytes(BOUNDED_NODE)?;
        let transform = TransformBlock::decode(buffer)?;
        let header = buffer.decode_array::<2>()?;
        let count = buffer.decode_count(4)?;
        let strings = decode_strings(buffer, count)?;
        let trailer = buffer.decode_array::<5>()?;
        Ok(Self {
            transform,
            header,
            strings,
            trailer,
        })
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer) -> Result<()> {
        buffer.encode_bytes(RENDERABLE_NODE);
        buffer.encode_bytes(BOUNDED_NODE);
        self.transform.encode(buffer)?;
        buffer.encode_bytes(&self.header);
        encode_string_list(buffer, &self.strings)?;
        buffer.encode_bytes(&self.trailer);
        Ok(())
    }
}

/// `cViewerRefNodeBase`: a renderable block behind its own signature.
pub fn decode_viewer_base(buffer: &mut DecoderBuffer) -> Result<RenderableBlock> {
    buffer.expect_bytes(VIEWER_REF_NODE_BASE)?;
    RenderableBlock::decode(buffer)
}

pub fn encode_viewer_base(buffer: &mut EncoderBuffer, block: &RenderableBlock) -> Result<()> {
    buffer.encode_bytes(VIEWER_REF_NODE_BASE);
    block.encode(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::GmdcError;

    fn sample_transform() -> TransformBlock {
        TransformBlock {
            tree: CompositionTree {
                object_graph: ObjectGraph {
                    extensions: vec![NodeRef::new(0, 0, 2)],
                    name: "spine0".to_string(),
                },
                children: vec![NodeRef::new(0, 0, 3), NodeRef::new(0, 0, 4)],
            },
            translation: Vec3::new(0.0, 1.5, -0.25),
            rotation: Quat::from_xyzw(0.0, 0.0, 0.0, 1.0),
            bone_index: Some(1),
        }
    }

    #[test]
    fn test_transform_block_round_trip() {
        let block = sample_transform();
        let mut buffer = EncoderBuffer::new();
        block.encode(&mut buffer).unwrap();

        let mut decoder = DecoderBuffer::new(buffer.data());
        let decoded = TransformBlock::decode(&mut decoder).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoder.remaining_size(), 0);
    }

    #[test]
    fn test_missing_bone_index_uses_sentinel() {
        let mut block = sample_transform();
        block.bone_index = None;
        let mut buffer = EncoderBuffer::new();
        block.encode(&mut buffer).unwrap();
        let data = buffer.data();
        assert_eq!(&data[data.len() - 4..], &[0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_renderable_string_count_follows_strings() {
        let block = RenderableBlock {
            transform: sample_transform(),
            header: [1, 0],
            strings: vec!["Practical".to_string(), "Sims".to_string()],
            trailer: [0, 1, 2, 3, 4],
        };
        let mut buffer = EncoderBuffer::new();
        block.encode(&mut buffer).unwrap();
        let mut decoder = DecoderBuffer::new(buffer.data());
        assert_eq!(RenderableBlock::decode(&mut decoder).unwrap(), block);
    }

    #[test]
    fn test_wrong_signature_is_format_error() {
        let mut data = SG_RESOURCE.to_vec();
        data[16] = 0x03;
        data.extend_from_slice(&[0, 0, 0, 0]);
        let mut decoder = DecoderBuffer::new(&data);
        match decode_resource_name(&mut decoder) {
            Err(GmdcError::Format { offset, .. }) => assert_eq!(offset, 0),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
