use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::decoder_buffer::DecoderBuffer;
use crate::encoder_buffer::EncoderBuffer;
use crate::geometry_data::GeometryData;
use crate::node::{GeometryDataContainer, Node, NodeKind, NodePayload};
use crate::signature::{FILE_SIGNATURE, LINKED_RESOURCE_SIZE};
use crate::status::{ByteString, GmdcError, Result};
use crate::version::DEFAULT_GEOMETRY_DATA_CONTAINER_VERSION;

/// Suffix conventionally appended to geometry resource names.
pub const LOCATOR_SUFFIX: &str = "_tslocator_gmdc";

/// A decoded resource file: linked resource table and ordered node list.
///
/// # Example
///
/// ```
/// use gmdc_core::{GeometryData, ResourceFile};
///
/// let file = ResourceFile::from_geometry("body_tslocator_gmdc", GeometryData::default());
/// let bytes = file.encode().unwrap();
/// let decoded = ResourceFile::decode(&bytes).unwrap();
/// assert_eq!(decoded.resource_name(), Some("body_tslocator_gmdc"));
/// assert_eq!(decoded.encode().unwrap(), bytes);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceFile {
    pub linked_resources: Vec<[u32; 4]>,
    pub nodes: Vec<Node>,
}

impl ResourceFile {
    /// Decodes a complete resource file. Any failure discards everything
    /// decoded so far.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut buffer = DecoderBuffer::new(data);
        buffer.expect_bytes(&FILE_SIGNATURE)?;

        let count = decode_table_count(&mut buffer, LINKED_RESOURCE_SIZE)?;
        let linked_resources = (0..count)
            .map(|_| {
                Ok([
                    buffer.decode_u32()?,
                    buffer.decode_u32()?,
                    buffer.decode_u32()?,
                    buffer.decode_u32()?,
                ])
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("Linked resources: {}", linked_resources.len());

        let count = decode_table_count(&mut buffer, 4)?;
        let tags = (0..count)
            .map(|_| buffer.decode_array::<4>())
            .collect::<Result<Vec<_>>>()?;
        debug!("Number of nodes: {}", tags.len());

        let mut nodes = Vec::with_capacity(tags.len());
        for (index, tag) in tags.iter().enumerate() {
            let offset = buffer.position();
            let kind = NodeKind::from_magic(tag).ok_or_else(|| GmdcError::UnknownNodeType {
                node_index: index,
                offset,
                tag: ByteString(tag.to_vec()),
            })?;
            let node = Node::decode(&mut buffer, index)?;
            if node.kind() != kind {
                return Err(GmdcError::format(
                    offset,
                    &kind.type_header(),
                    &node.kind().type_header(),
                ));
            }
            nodes.push(node);
        }

        if buffer.remaining_size() > 0 {
            warn!(
                "{} trailing bytes after the last node at offset {:#x}",
                buffer.remaining_size(),
                buffer.position()
            );
        }

        Ok(Self {
            linked_resources,
            nodes,
        })
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buffer = EncoderBuffer::new();
        buffer.encode_bytes(&FILE_SIGNATURE);

        buffer.encode_u32(table_count(self.linked_resources.len())?);
        for entry in &self.linked_resources {
            for &v in entry {
                buffer.encode_u32(v);
            }
        }

        buffer.encode_u32(table_count(self.nodes.len())?);
        for node in &self.nodes {
            buffer.encode_bytes(&node.kind().magic());
        }
        for node in &self.nodes {
            node.encode(&mut buffer)?;
        }
        Ok(buffer.into_vec())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading resource file {}", path.display());
        let data = fs::read(path)?;
        Self::decode(&data)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let data = self.encode()?;
        info!("Writing {} bytes to {}", data.len(), path.display());
        fs::write(path, data)?;
        Ok(())
    }

    /// Builds a file holding a single geometry data container.
    pub fn from_geometry(resource_name: impl Into<String>, geometry: GeometryData) -> Self {
        let container = GeometryDataContainer {
            resource_name: resource_name.into(),
            geometry,
        };
        Self {
            linked_resources: Vec::new(),
            nodes: vec![Node::new(
                0,
                DEFAULT_GEOMETRY_DATA_CONTAINER_VERSION,
                NodePayload::GeometryDataContainer(container),
            )],
        }
    }

    /// Resource name of the first node, if it carries one.
    pub fn resource_name(&self) -> Option<&str> {
        self.nodes.first().and_then(Node::resource_name)
    }

    /// The first geometry data container of the file.
    pub fn geometry(&self) -> Option<&GeometryData> {
        self.nodes.iter().find_map(Node::geometry)
    }

    /// True when the first node is a `cResourceNode`, as in skeleton files.
    pub fn is_resource_node_file(&self) -> bool {
        self.nodes
            .first()
            .map_or(false, |n| n.kind() == NodeKind::Resource)
    }
}

/// Derives the resource name for a new geometry file: the explicit name if
/// non-blank, otherwise the file name without its last extension,
/// optionally followed by [`LOCATOR_SUFFIX`].
pub fn geometry_resource_name(explicit: Option<&str>, path: &Path, locator_suffix: bool) -> String {
    let mut name = match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None => {
            let file_name = path
                .file_name()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            match file_name.rsplit_once('.') {
                Some((stem, _)) => stem.to_string(),
                None => file_name,
            }
        }
    };
    if locator_suffix {
        name.push_str(LOCATOR_SUFFIX);
    }
    name
}

fn decode_table_count(buffer: &mut DecoderBuffer, entry_size: usize) -> Result<usize> {
    let offset = buffer.position();
    let count = buffer.decode_u32()? as usize;
    let needed = count.saturating_mul(entry_size);
    if needed > buffer.remaining_size() {
        return Err(GmdcError::Truncated {
            offset,
            needed,
            available: buffer.remaining_size(),
        });
    }
    Ok(count)
}

fn table_count(len: usize) -> Result<u32> {
    u32::try_from(len)
        .map_err(|_| GmdcError::invalid_parameter(format!("table of {} entries is too large", len)))
}

impl fmt::Display for ResourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ResourceFile")?;
        if let Some(name) = self.resource_name() {
            writeln!(f, "resource name: \"{}\"", name)?;
        }
        writeln!(f, "linked resources ({}):", self.linked_resources.len())?;
        for [a, b, c, d] in &self.linked_resources {
            writeln!(f, "  {:08X} - {:08X} - {:08X} - {:08X}", a, b, c, d)?;
        }
        write!(f, "number of nodes: {}", self.nodes.len())
    }
}
