//! Scene-graph node types and their registry.

use std::fmt;

use tracing::debug;

use crate::data_list::DataEntry;
use crate::decoder_buffer::DecoderBuffer;
use crate::encoder_buffer::EncoderBuffer;
use crate::geometry_container::{decode_geometry, encode_geometry};
use crate::geometry_data::GeometryData;
use crate::geometry_indices::NodeRef;
use crate::sg_blocks::{
    decode_extension_marker, decode_node_refs, decode_resource_name, decode_string_list,
    decode_strings, decode_viewer_base, encode_extension_marker, encode_node_refs,
    encode_resource_name, encode_string_list, encode_viewer_base, CompositionTree, ObjectGraph,
    RenderableBlock, TransformBlock,
};
use crate::signature::type_header;
use crate::status::{to_hex, ByteString, GmdcError, Result};
use crate::version::*;

/// Closed set of node types understood by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Resource,
    Transform,
    ShapeRef,
    DataListExtension,
    BoneDataExtension,
    LightRef,
    ViewerRef,
    ViewerRefRecursive,
    Geometry,
    GeometryDataContainer,
    MaterialDefinition,
}

impl NodeKind {
    pub const ALL: [NodeKind; 11] = [
        NodeKind::Resource,
        NodeKind::Transform,
        NodeKind::ShapeRef,
        NodeKind::DataListExtension,
        NodeKind::BoneDataExtension,
        NodeKind::LightRef,
        NodeKind::ViewerRef,
        NodeKind::ViewerRefRecursive,
        NodeKind::Geometry,
        NodeKind::GeometryDataContainer,
        NodeKind::MaterialDefinition,
    ];

    /// The 4-byte type tag, in file order.
    pub fn magic(self) -> [u8; 4] {
        match self {
            NodeKind::Resource => [0x33, 0xC9, 0x19, 0xE5],
            NodeKind::Transform => [0x62, 0x64, 0x24, 0x65],
            NodeKind::ShapeRef => [0x17, 0x55, 0x24, 0x65],
            NodeKind::DataListExtension => [0x56, 0x6D, 0x83, 0x6A],
            NodeKind::BoneDataExtension => [0xC5, 0x5B, 0x07, 0xE9],
            NodeKind::LightRef => [0x18, 0x20, 0x3D, 0x25],
            NodeKind::ViewerRef => [0xBB, 0x6D, 0xA7, 0xDC],
            NodeKind::ViewerRefRecursive => [0x8E, 0x2B, 0x15, 0x0C],
            NodeKind::Geometry => [0x8C, 0x83, 0xA3, 0x7B],
            NodeKind::GeometryDataContainer => [0x87, 0x86, 0x4F, 0xAC],
            NodeKind::MaterialDefinition => [0x78, 0x69, 0x59, 0x49],
        }
    }

    pub fn from_magic(magic: &[u8]) -> Option<NodeKind> {
        NodeKind::ALL.into_iter().find(|k| k.magic() == magic)
    }

    pub fn type_name(self) -> &'static str {
        match self {
            NodeKind::Resource => "cResourceNode",
            NodeKind::Transform => "cTransformNode",
            NodeKind::ShapeRef => "cShapeRefNode",
            NodeKind::DataListExtension => "cDataListExtension",
            NodeKind::BoneDataExtension => "cBoneDataExtension",
            NodeKind::LightRef => "cLightRefNode",
            NodeKind::ViewerRef => "cViewerRefNode",
            NodeKind::ViewerRefRecursive => "cViewerRefNodeRecursive",
            NodeKind::Geometry => "cGeometryNode",
            NodeKind::GeometryDataContainer => "cGeometryDataContainer",
            NodeKind::MaterialDefinition => "cMaterialDefinition",
        }
    }

    pub fn supported_versions(self) -> &'static [i32] {
        match self {
            NodeKind::Resource => RESOURCE_NODE_VERSIONS,
            NodeKind::Transform => TRANSFORM_NODE_VERSIONS,
            NodeKind::ShapeRef => SHAPE_REF_NODE_VERSIONS,
            NodeKind::DataListExtension => DATA_LIST_EXTENSION_VERSIONS,
            NodeKind::BoneDataExtension => BONE_DATA_EXTENSION_VERSIONS,
            NodeKind::LightRef => LIGHT_REF_NODE_VERSIONS,
            NodeKind::ViewerRef => VIEWER_REF_NODE_VERSIONS,
            NodeKind::ViewerRefRecursive => VIEWER_REF_NODE_RECURSIVE_VERSIONS,
            NodeKind::Geometry => GEOMETRY_NODE_VERSIONS,
            NodeKind::GeometryDataContainer => GEOMETRY_DATA_CONTAINER_VERSIONS,
            NodeKind::MaterialDefinition => MATERIAL_DEFINITION_VERSIONS,
        }
    }

    /// Pascal name plus magic, as found at the start of a node body.
    pub fn type_header(self) -> Vec<u8> {
        type_header(self.type_name(), self.magic())
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    pub unknown1: [u8; 1],
    pub resource_name: String,
    pub tree: CompositionTree,
    pub unknown2: [u8; 5],
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeRefNode {
    pub renderable: RenderableBlock,
    pub refs: Vec<NodeRef>,
    pub unknown1: [u8; 4],
    /// Opaque 4-byte records, one per morph slot.
    pub records: Vec<[u8; 4]>,
    /// One string per record; only stored from version 0x15 on and must be
    /// empty before it.
    pub record_strings: Vec<String>,
    pub unknown2: Vec<u8>,
    pub unknown3: [u8; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoneDataExtension {
    pub unknown: [u8; 12],
    pub value: f32,
    pub quat: [f32; 4],
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightRefNode {
    pub renderable: RenderableBlock,
    pub light: NodeRef,
    pub unknown: [u8; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerRefNode {
    pub base: RenderableBlock,
    /// 0x9C bytes for version 0x0E, 0x9B bytes for version 0x0D.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewerRefNodeRecursive {
    pub base: RenderableBlock,
    pub unknown: [u8; 1],
    pub name: String,
    pub data: [u8; 64],
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometryNode {
    pub object_graph: ObjectGraph,
    pub resource_name: String,
    pub unknown: [u8; 7],
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometryDataContainer {
    pub resource_name: String,
    pub geometry: GeometryData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDefinition {
    pub resource_name: String,
    pub name: String,
    pub material_type: String,
    pub properties: Vec<(String, String)>,
    pub references: Vec<String>,
}

/// Typed node payload. The variant determines the node kind.
#[derive(Debug, Clone, PartialEq)]
pub enum NodePayload {
    Resource(ResourceNode),
    Transform(TransformBlock),
    ShapeRef(ShapeRefNode),
    DataListExtension(DataEntry),
    BoneDataExtension(BoneDataExtension),
    LightRef(LightRefNode),
    ViewerRef(ViewerRefNode),
    ViewerRefRecursive(ViewerRefNodeRecursive),
    Geometry(GeometryNode),
    GeometryDataContainer(GeometryDataContainer),
    MaterialDefinition(MaterialDefinition),
}

/// One entry of a resource file's node list.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub index: usize,
    pub version: i32,
    pub payload: NodePayload,
}

impl Node {
    pub fn new(index: usize, version: i32, payload: NodePayload) -> Self {
        Self {
            index,
            version,
            payload,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match &self.payload {
            NodePayload::Resource(_) => NodeKind::Resource,
            NodePayload::Transform(_) => NodeKind::Transform,
            NodePayload::ShapeRef(_) => NodeKind::ShapeRef,
            NodePayload::DataListExtension(_) => NodeKind::DataListExtension,
            NodePayload::BoneDataExtension(_) => NodeKind::BoneDataExtension,
            NodePayload::LightRef(_) => NodeKind::LightRef,
            NodePayload::ViewerRef(_) => NodeKind::ViewerRef,
            NodePayload::ViewerRefRecursive(_) => NodeKind::ViewerRefRecursive,
            NodePayload::Geometry(_) => NodeKind::Geometry,
            NodePayload::GeometryDataContainer(_) => NodeKind::GeometryDataContainer,
            NodePayload::MaterialDefinition(_) => NodeKind::MaterialDefinition,
        }
    }

    /// Decodes one node, reading its own type header and dispatching on the
    /// magic found there.
    pub fn decode(buffer: &mut DecoderBuffer, index: usize) -> Result<Node> {
        let offset = buffer.position();
        let name_len = buffer.decode_u8()? as usize;
        let name = buffer.decode_slice(name_len)?;
        let magic = buffer.decode_slice(4)?;
        let kind = NodeKind::from_magic(magic).ok_or_else(|| GmdcError::UnknownNodeType {
            node_index: index,
            offset,
            tag: ByteString(magic.to_vec()),
        })?;
        if name != kind.type_name().as_bytes() {
            return Err(GmdcError::format(
                offset,
                &kind.type_header(),
                &type_header_bytes(name, magic),
            ));
        }

        let version = buffer.decode_i32()?;
        if !kind.supported_versions().contains(&version) {
            return Err(GmdcError::Version {
                node_index: index,
                type_name: kind.type_name(),
                version,
            });
        }
        debug!(
            "Node #{} ({}, version {:#x}) at offset {:#x}",
            index, kind, version, offset
        );

        let payload = decode_payload(buffer, kind, version)?;
        Ok(Node {
            index,
            version,
            payload,
        })
    }

    pub fn encode(&self, buffer: &mut EncoderBuffer) -> Result<()> {
        let kind = self.kind();
        if !kind.supported_versions().contains(&self.version) {
            return Err(GmdcError::invalid_parameter(format!(
                "node #{}: {} version {:#x} cannot be written",
                self.index, kind, self.version
            )));
        }
        buffer.encode_bytes(&kind.type_header());
        buffer.encode_i32(self.version);
        encode_payload(buffer, &self.payload, self.version)
    }

    /// The object graph name, for node types that carry one.
    pub fn name(&self) -> Option<&str> {
        match &self.payload {
            NodePayload::Resource(n) => Some(&n.tree.object_graph.name),
            NodePayload::Transform(t) => Some(t.name()),
            NodePayload::ShapeRef(n) => Some(n.renderable.transform.name()),
            NodePayload::LightRef(n) => Some(n.renderable.transform.name()),
            NodePayload::ViewerRef(n) => Some(n.base.transform.name()),
            NodePayload::ViewerRefRecursive(n) => Some(n.base.transform.name()),
            NodePayload::Geometry(n) => Some(&n.object_graph.name),
            _ => None,
        }
    }

    pub fn resource_name(&self) -> Option<&str> {
        match &self.payload {
            NodePayload::Resource(n) => Some(&n.resource_name),
            NodePayload::Geometry(n) => Some(&n.resource_name),
            NodePayload::GeometryDataContainer(n) => Some(&n.resource_name),
            NodePayload::MaterialDefinition(n) => Some(&n.resource_name),
            _ => None,
        }
    }

    /// The transform block of a `cTransformNode`.
    pub fn transform(&self) -> Option<&TransformBlock> {
        match &self.payload {
            NodePayload::Transform(t) => Some(t),
            _ => None,
        }
    }

    /// Child references of nodes with a composition tree.
    pub fn child_refs(&self) -> &[NodeRef] {
        match &self.payload {
            NodePayload::Resource(n) => &n.tree.children,
            NodePayload::Transform(t) => t.children(),
            NodePayload::ShapeRef(n) => n.renderable.transform.children(),
            NodePayload::LightRef(n) => n.renderable.transform.children(),
            NodePayload::ViewerRef(n) => n.base.transform.children(),
            NodePayload::ViewerRefRecursive(n) => n.base.transform.children(),
            _ => &[],
        }
    }

    pub fn geometry(&self) -> Option<&GeometryData> {
        match &self.payload {
            NodePayload::GeometryDataContainer(c) => Some(&c.geometry),
            _ => None,
        }
    }
}

fn type_header_bytes(name: &[u8], magic: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(name.len() + 5);
    v.push(name.len() as u8);
    v.extend_from_slice(name);
    v.extend_from_slice(magic);
    v
}

fn decode_payload(buffer: &mut DecoderBuffer, kind: NodeKind, version: i32) -> Result<NodePayload> {
    let payload = match kind {
        NodeKind::Resource => NodePayload::Resource(ResourceNode {
            unknown1: buffer.decode_array()?,
            resource_name: decode_resource_name(buffer)?,
            tree: CompositionTree::decode(buffer)?,
            unknown2: buffer.decode_array()?,
        }),
        NodeKind::Transform => NodePayload::Transform(TransformBlock::decode_body(buffer)?),
        NodeKind::ShapeRef => {
            let renderable = RenderableBlock::decode(buffer)?;
            let refs = decode_node_refs(buffer)?;
            let unknown1 = buffer.decode_array()?;
            let count = buffer.decode_count(4)?;
            let records = (0..count)
                .map(|_| buffer.decode_array::<4>())
                .collect::<Result<Vec<_>>>()?;
            let record_strings = if version >= SHAPE_REF_STRINGS_VERSION {
                decode_strings(buffer, count)?
            } else {
                Vec::new()
            };
            let len = buffer.decode_count(1)?;
            let unknown2 = buffer.decode_slice(len)?.to_vec();
            let unknown3 = buffer.decode_array()?;
            NodePayload::ShapeRef(ShapeRefNode {
                renderable,
                refs,
                unknown1,
                records,
                record_strings,
                unknown2,
                unknown3,
            })
        }
        NodeKind::DataListExtension => {
            decode_extension_marker(buffer)?;
            NodePayload::DataListExtension(DataEntry::decode(buffer)?)
        }
        NodeKind::BoneDataExtension => {
            decode_extension_marker(buffer)?;
            NodePayload::BoneDataExtension(BoneDataExtension {
                unknown: buffer.decode_array()?,
                value: buffer.decode_f32()?,
                quat: buffer.decode_quat()?.to_array(),
            })
        }
        NodeKind::LightRef => NodePayload::LightRef(LightRefNode {
            renderable: RenderableBlock::decode(buffer)?,
            light: NodeRef::decode(buffer)?,
            unknown: buffer.decode_array()?,
        }),
        NodeKind::ViewerRef => NodePayload::ViewerRef(ViewerRefNode {
            base: decode_viewer_base(buffer)?,
            data: buffer.decode_slice(viewer_ref_data_len(version))?.to_vec(),
        }),
        NodeKind::ViewerRefRecursive => NodePayload::ViewerRefRecursive(ViewerRefNodeRecursive {
            base: decode_viewer_base(buffer)?,
            unknown: buffer.decode_array()?,
            name: buffer.decode_string()?,
            data: buffer.decode_array()?,
        }),
        NodeKind::Geometry => NodePayload::Geometry(GeometryNode {
            object_graph: ObjectGraph::decode(buffer)?,
            resource_name: decode_resource_name(buffer)?,
            unknown: buffer.decode_array()?,
        }),
        NodeKind::GeometryDataContainer => {
            NodePayload::GeometryDataContainer(GeometryDataContainer {
                resource_name: decode_resource_name(buffer)?,
                geometry: decode_geometry(buffer)?,
            })
        }
        NodeKind::MaterialDefinition => {
            let resource_name = decode_resource_name(buffer)?;
            let name = buffer.decode_string()?;
            let material_type = buffer.decode_string()?;
            let count = buffer.decode_count(8)?;
            let properties = (0..count)
                .map(|_| Ok((buffer.decode_string()?, buffer.decode_string()?)))
                .collect::<Result<Vec<_>>>()?;
            let references = decode_string_list(buffer)?;
            NodePayload::MaterialDefinition(MaterialDefinition {
                resource_name,
                name,
                material_type,
                properties,
                references,
            })
        }
    };
    Ok(payload)
}

fn encode_payload(buffer: &mut EncoderBuffer, payload: &NodePayload, version: i32) -> Result<()> {
    match payload {
        NodePayload::Resource(n) => {
            buffer.encode_bytes(&n.unknown1);
            encode_resource_name(buffer, &n.resource_name)?;
            n.tree.encode(buffer)?;
            buffer.encode_bytes(&n.unknown2);
        }
        NodePayload::Transform(t) => t.encode_body(buffer)?,
        NodePayload::ShapeRef(n) => {
            n.renderable.encode(buffer)?;
            encode_node_refs(buffer, &n.refs)?;
            buffer.encode_bytes(&n.unknown1);
            buffer.encode_count(n.records.len())?;
            for r in &n.records {
                buffer.encode_bytes(r);
            }
            if version >= SHAPE_REF_STRINGS_VERSION {
                if n.record_strings.len() != n.records.len() {
                    return Err(GmdcError::invalid_parameter(format!(
                        "shape reference has {} records but {} record strings",
                        n.records.len(),
                        n.record_strings.len()
                    )));
                }
                for s in &n.record_strings {
                    buffer.encode_string(s)?;
                }
            } else if !n.record_strings.is_empty() {
                return Err(GmdcError::invalid_parameter(format!(
                    "shape reference version {:#x} cannot store {} record strings",
                    version,
                    n.record_strings.len()
                )));
            }
            buffer.encode_count(n.unknown2.len())?;
            buffer.encode_bytes(&n.unknown2);
            buffer.encode_bytes(&n.unknown3);
        }
        NodePayload::DataListExtension(entry) => {
            encode_extension_marker(buffer);
            entry.encode(buffer)?;
        }
        NodePayload::BoneDataExtension(n) => {
            encode_extension_marker(buffer);
            buffer.encode_bytes(&n.unknown);
            buffer.encode_f32(n.value);
            for c in n.quat {
                buffer.encode_f32(c);
            }
        }
        NodePayload::LightRef(n) => {
            n.renderable.encode(buffer)?;
            n.light.encode(buffer);
            buffer.encode_bytes(&n.unknown);
        }
        NodePayload::ViewerRef(n) => {
            let expected = viewer_ref_data_len(version);
            if n.data.len() != expected {
                return Err(GmdcError::invalid_parameter(format!(
                    "viewer reference version {:#x} needs {} data bytes, has {}",
                    version,
                    expected,
                    n.data.len()
                )));
            }
            encode_viewer_base(buffer, &n.base)?;
            buffer.encode_bytes(&n.data);
        }
        NodePayload::ViewerRefRecursive(n) => {
            encode_viewer_base(buffer, &n.base)?;
            buffer.encode_bytes(&n.unknown);
            buffer.encode_string(&n.name)?;
            buffer.encode_bytes(&n.data);
        }
        NodePayload::Geometry(n) => {
            n.object_graph.encode(buffer)?;
            encode_resource_name(buffer, &n.resource_name)?;
            buffer.encode_bytes(&n.unknown);
        }
        NodePayload::GeometryDataContainer(n) => {
            encode_resource_name(buffer, &n.resource_name)?;
            encode_geometry(buffer, &n.geometry)?;
        }
        NodePayload::MaterialDefinition(n) => {
            encode_resource_name(buffer, &n.resource_name)?;
            buffer.encode_string(&n.name)?;
            buffer.encode_string(&n.material_type)?;
            buffer.encode_count(n.properties.len())?;
            for (key, value) in &n.properties {
                buffer.encode_string(key)?;
                buffer.encode_string(value)?;
            }
            encode_string_list(buffer, &n.references)?;
        }
    }
    Ok(())
}

fn fmt_renderable(f: &mut fmt::Formatter<'_>, block: &RenderableBlock) -> fmt::Result {
    writeln!(f, "{}", block.transform)?;
    writeln!(f, "  header: {}", to_hex(&block.header))?;
    writeln!(f, "  strings: {:?}", block.strings)?;
    write!(f, "  trailer: {}", to_hex(&block.trailer))
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "#{} {} (version {:#04x})",
            self.index,
            self.kind(),
            self.version
        )?;
        match &self.payload {
            NodePayload::Resource(n) => {
                writeln!(f, "  resource: \"{}\"", n.resource_name)?;
                writeln!(f, "  name: \"{}\"", n.tree.object_graph.name)?;
                write!(f, "  children ({}):", n.tree.children.len())?;
                for r in &n.tree.children {
                    write!(f, " {}", r)?;
                }
                Ok(())
            }
            NodePayload::Transform(t) => write!(f, "{}", t),
            NodePayload::ShapeRef(n) => {
                fmt_renderable(f, &n.renderable)?;
                writeln!(f)?;
                write!(f, "  refs ({}):", n.refs.len())?;
                for r in &n.refs {
                    write!(f, " {}", r)?;
                }
                writeln!(f)?;
                write!(f, "  morph records ({}):", n.records.len())?;
                for (i, r) in n.records.iter().enumerate() {
                    write!(f, "\n    {}", to_hex(r))?;
                    if let Some(s) = n.record_strings.get(i) {
                        write!(f, " \"{}\"", s)?;
                    }
                }
                Ok(())
            }
            NodePayload::DataListExtension(entry) => write!(f, "{}", entry),
            NodePayload::BoneDataExtension(n) => {
                writeln!(f, "  unknown: {}", to_hex(&n.unknown))?;
                writeln!(f, "  value: {:.6}", n.value)?;
                write!(
                    f,
                    "  quaternion: ({:.6}, {:.6}, {:.6}, {:.6})",
                    n.quat[0], n.quat[1], n.quat[2], n.quat[3]
                )
            }
            NodePayload::LightRef(n) => {
                fmt_renderable(f, &n.renderable)?;
                write!(f, "\n  light: {}", n.light)
            }
            NodePayload::ViewerRef(n) => {
                fmt_renderable(f, &n.base)?;
                write!(f, "\n  data: {} bytes", n.data.len())
            }
            NodePayload::ViewerRefRecursive(n) => {
                fmt_renderable(f, &n.base)?;
                write!(f, "\n  string: \"{}\"", n.name)
            }
            NodePayload::Geometry(n) => {
                writeln!(f, "  name: \"{}\"", n.object_graph.name)?;
                write!(f, "  resource: \"{}\"", n.resource_name)
            }
            NodePayload::GeometryDataContainer(n) => {
                writeln!(f, "  resource: \"{}\"", n.resource_name)?;
                write!(f, "{}", n.geometry)
            }
            NodePayload::MaterialDefinition(n) => {
                writeln!(f, "  resource: \"{}\"", n.resource_name)?;
                writeln!(f, "  name: \"{}\"", n.name)?;
                writeln!(f, "  type: \"{}\"", n.material_type)?;
                for (k, v) in &n.properties {
                    writeln!(f, "  \"{}\": \"{}\"", k, v)?;
                }
                write!(f, "  references: {:?}", n.references)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn transform_node(index: usize, name: &str, bone: Option<i32>) -> Node {
        Node::new(
            index,
            7,
            NodePayload::Transform(TransformBlock {
                tree: CompositionTree {
                    object_graph: ObjectGraph {
                        extensions: vec![],
                        name: name.to_string(),
                    },
                    children: vec![],
                },
                translation: Vec3::new(1.0, 2.0, 3.0),
                rotation: Quat::IDENTITY,
                bone_index: bone,
            }),
        )
    }

    fn encoded(node: &Node) -> Vec<u8> {
        let mut buffer = EncoderBuffer::new();
        node.encode(&mut buffer).unwrap();
        buffer.into_vec()
    }

    #[test]
    fn test_magic_lookup() {
        for kind in NodeKind::ALL {
            assert_eq!(NodeKind::from_magic(&kind.magic()), Some(kind));
        }
        assert_eq!(NodeKind::from_magic(&[0, 0, 0, 0]), None);
    }

    #[test]
    fn test_transform_node_starts_with_block_signature() {
        let data = encoded(&transform_node(0, "root", None));
        assert!(data.starts_with(crate::signature::TRANSFORM_NODE));
        let mut decoder = DecoderBuffer::new(&data);
        let node = Node::decode(&mut decoder, 0).unwrap();
        assert_eq!(node.name(), Some("root"));
        assert_eq!(node.transform().and_then(|t| t.bone_index), None);
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = encoded(&transform_node(0, "root", Some(0)));
        // The version follows the 19-byte type header.
        data[19] = 8;
        let mut decoder = DecoderBuffer::new(&data);
        match Node::decode(&mut decoder, 5) {
            Err(GmdcError::Version {
                node_index,
                type_name,
                version,
            }) => {
                assert_eq!(node_index, 5);
                assert_eq!(type_name, "cTransformNode");
                assert_eq!(version, 8);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_magic() {
        let mut data = vec![4];
        data.extend_from_slice(b"cFoo");
        data.extend_from_slice(&[1, 2, 3, 4, 1, 0, 0, 0]);
        let mut decoder = DecoderBuffer::new(&data);
        assert!(matches!(
            Node::decode(&mut decoder, 2),
            Err(GmdcError::UnknownNodeType { node_index: 2, .. })
        ));
    }

    #[test]
    fn test_material_definition_round_trip() {
        let node = Node::new(
            0,
            0x0B,
            NodePayload::MaterialDefinition(MaterialDefinition {
                resource_name: "##0x1c050000!body_txmt".to_string(),
                name: "body".to_string(),
                material_type: "StandardMaterial".to_string(),
                properties: vec![("stdMatAlphaBlendMode".to_string(), "none".to_string())],
                references: vec!["body_txtr".to_string()],
            }),
        );
        let data = encoded(&node);
        let mut decoder = DecoderBuffer::new(&data);
        assert_eq!(Node::decode(&mut decoder, 0).unwrap(), node);
        assert_eq!(decoder.remaining_size(), 0);
    }

    #[test]
    fn test_shape_ref_record_strings_follow_version() {
        let renderable = RenderableBlock {
            transform: match transform_node(0, "shape", None).payload {
                NodePayload::Transform(t) => t,
                _ => unreachable!(),
            },
            header: [1, 0],
            strings: vec!["Practical".to_string()],
            trailer: [0; 5],
        };
        let shape = ShapeRefNode {
            renderable,
            refs: vec![NodeRef::new(0, 1, 1)],
            unknown1: [0xFF; 4],
            records: vec![[0, 0, 0, 0], [1, 0, 0, 0]],
            record_strings: vec!["".to_string(), "smile".to_string()],
            unknown2: vec![1, 2, 3],
            unknown3: [0; 4],
        };
        let node = Node::new(1, 0x15, NodePayload::ShapeRef(shape.clone()));
        let data = encoded(&node);
        let mut decoder = DecoderBuffer::new(&data);
        assert_eq!(Node::decode(&mut decoder, 1).unwrap(), node);

        let mut old = shape;
        old.record_strings.clear();
        let node = Node::new(1, 0x14, NodePayload::ShapeRef(old));
        let data = encoded(&node);
        let mut decoder = DecoderBuffer::new(&data);
        assert_eq!(Node::decode(&mut decoder, 1).unwrap(), node);
    }

    #[test]
    fn test_old_shape_ref_rejects_record_strings() {
        let shape = ShapeRefNode {
            renderable: RenderableBlock {
                transform: match transform_node(0, "shape", None).payload {
                    NodePayload::Transform(t) => t,
                    _ => unreachable!(),
                },
                header: [1, 0],
                strings: vec![],
                trailer: [0; 5],
            },
            refs: vec![],
            unknown1: [0; 4],
            records: vec![[0, 0, 0, 0]],
            record_strings: vec!["smile".to_string()],
            unknown2: vec![],
            unknown3: [0; 4],
        };
        let node = Node::new(1, 0x14, NodePayload::ShapeRef(shape));
        let mut buffer = EncoderBuffer::new();
        assert!(matches!(
            node.encode(&mut buffer),
            Err(GmdcError::InvalidParameter(_))
        ));
    }
}
