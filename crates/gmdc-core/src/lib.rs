//! GMDC Core Library
//!
//! Binary codec for scene-graph resource files (`.cres` skeletons,
//! `.gmdc`/`.5gd` geometry): record buffers, the node type registry, the
//! resource container, the geometry data model and the transform hierarchy.

#![allow(clippy::needless_range_loop)] // Columnar vertex data is walked by index

// =============================================================================
// Record codec
// =============================================================================

pub mod decoder_buffer;
pub mod encoder_buffer;
pub mod geometry_indices;
pub mod signature;
pub mod status;
pub mod version;

// =============================================================================
// Nodes and container
// =============================================================================

pub mod data_list;
pub mod node;
pub mod resource_file;
pub mod sg_blocks;

// =============================================================================
// Geometry and hierarchy
// =============================================================================

pub mod geometry_container;
pub mod geometry_data;
pub mod transform;
pub mod transform_tree;

// =============================================================================
// Re-exports
// =============================================================================

pub use data_list::{DataEntry, DataValue};
pub use decoder_buffer::DecoderBuffer;
pub use encoder_buffer::EncoderBuffer;
pub use geometry_data::{
    float_key, vec2_key, vec3_key, BoundingMesh, DataGroup, GeometryData, IndexGroup, MorphName,
    DEFAULT_INDEX_GROUP_FLAGS, MAX_BONE_INFLUENCES, MAX_MORPH_INFLUENCES,
};
pub use geometry_indices::{NodeRef, TransformNodeId};
pub use node::{Node, NodeKind, NodePayload};
pub use resource_file::{geometry_resource_name, ResourceFile, LOCATOR_SUFFIX};
pub use sg_blocks::{CompositionTree, ObjectGraph, RenderableBlock, TransformBlock};
pub use status::{GmdcError, Result};
pub use transform::Transform;
pub use transform_tree::{NodeQuery, TransformTree, TransformTreeNode};
