use std::fmt;

use thiserror::Error;

/// Error type shared by every crate of the workspace.
///
/// Decoding errors carry the byte offset at which they were detected, node
/// errors carry the node index, and geometry errors name the mesh and vertex
/// that caused them, so a failed run can be diagnosed from the message alone.
#[derive(Error, Debug)]
pub enum GmdcError {
    #[error("Format error at offset {offset:#x}: expected {expected}, found {actual}")]
    Format {
        offset: usize,
        expected: ByteString,
        actual: ByteString,
    },
    #[error("Format error at offset {offset:#x}: record needs {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("Format error at offset {offset:#x}: {message}")]
    InvalidRecord { offset: usize, message: String },
    #[error("Node #{node_index}: {type_name} version {version:#x} is not supported")]
    Version {
        node_index: usize,
        type_name: &'static str,
        version: i32,
    },
    #[error("Node #{node_index} at offset {offset:#x}: unknown node type {tag}")]
    UnknownNodeType {
        node_index: usize,
        offset: usize,
        tag: ByteString,
    },
    #[error("Reference error: {0}")]
    Reference(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Vertex #{vertex} of mesh \"{mesh}\" is influenced by {count} bones (max 4)")]
    TooManyInfluences {
        mesh: String,
        vertex: usize,
        count: usize,
    },
    #[error("Vertex #{vertex} of mesh \"{mesh}\" is affected by more than 4 shape keys")]
    TooManyMorphs { mesh: String, vertex: usize },
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GmdcError>;

impl GmdcError {
    pub fn format(offset: usize, expected: &[u8], actual: &[u8]) -> Self {
        GmdcError::Format {
            offset,
            expected: ByteString(expected.to_vec()),
            actual: ByteString(actual.to_vec()),
        }
    }

    pub fn invalid_record(offset: usize, message: impl Into<String>) -> Self {
        GmdcError::InvalidRecord {
            offset,
            message: message.into(),
        }
    }

    pub fn reference(message: impl Into<String>) -> Self {
        GmdcError::Reference(message.into())
    }

    pub fn invalid_geometry(message: impl Into<String>) -> Self {
        GmdcError::InvalidGeometry(message.into())
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        GmdcError::InvalidParameter(message.into())
    }
}

/// Raw bytes rendered as space separated hex in error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteString(pub Vec<u8>);

impl fmt::Display for ByteString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{:02X}", b)?;
        }
        write!(f, "]")
    }
}

pub fn to_hex(bytes: &[u8]) -> String {
    ByteString(bytes.to_vec()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_error_display() {
        let err = GmdcError::format(0x10, &[0x01, 0x00, 0xFF, 0xFF], &[0x00, 0x00]);
        assert_eq!(
            err.to_string(),
            "Format error at offset 0x10: expected [01 00 FF FF], found [00 00]"
        );
    }

    #[test]
    fn test_version_error_names_node() {
        let err = GmdcError::Version {
            node_index: 3,
            type_name: "cShapeRefNode",
            version: 0x16,
        };
        let msg = err.to_string();
        assert!(msg.contains("#3"));
        assert!(msg.contains("cShapeRefNode"));
        assert!(msg.contains("0x16"));
    }

    #[test]
    fn test_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: GmdcError = io_error.into();
        assert!(matches!(err, GmdcError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
