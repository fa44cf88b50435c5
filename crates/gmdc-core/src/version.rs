// Node version allow-lists.
//
// Each node type carries an `i32` version right after its type header. Only
// the versions listed here are understood; anything else is rejected with
// `GmdcError::Version` before the payload is read.

pub const RESOURCE_NODE_VERSIONS: &[i32] = &[0x07];

/// The embedded transform block always carries version 7 as well.
pub const TRANSFORM_NODE_VERSIONS: &[i32] = &[0x07];

/// Version 0x15 adds one string per morph record.
pub const SHAPE_REF_NODE_VERSIONS: &[i32] = &[0x14, 0x15];

/// First shape reference version that stores morph record strings.
pub const SHAPE_REF_STRINGS_VERSION: i32 = 0x15;

pub const DATA_LIST_EXTENSION_VERSIONS: &[i32] = &[0x01];

pub const BONE_DATA_EXTENSION_VERSIONS: &[i32] = &[0x04, 0x05];

pub const LIGHT_REF_NODE_VERSIONS: &[i32] = &[0x0A];

pub const VIEWER_REF_NODE_VERSIONS: &[i32] = &[0x0D, 0x0E];

pub const VIEWER_REF_NODE_RECURSIVE_VERSIONS: &[i32] = &[0x01];

pub const GEOMETRY_NODE_VERSIONS: &[i32] = &[0x0C];

/// Only the layout described in `geometry_container` is supported.
pub const GEOMETRY_DATA_CONTAINER_VERSIONS: &[i32] = &[0x04];

pub const MATERIAL_DEFINITION_VERSIONS: &[i32] = &[0x0B];

/// Version written for newly built geometry containers.
pub const DEFAULT_GEOMETRY_DATA_CONTAINER_VERSION: i32 = 0x04;

/// Length of the trailing opaque block of a viewer reference node.
pub fn viewer_ref_data_len(version: i32) -> usize {
    if version == 0x0E {
        0x9C
    } else {
        0x9B
    }
}
