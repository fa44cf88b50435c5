use glam::{Quat, Vec2, Vec3};
use proptest::prelude::*;

use gmdc_core::{
    CompositionTree, DataGroup, GeometryData, GmdcError, IndexGroup, Node, NodePayload, NodeRef,
    ObjectGraph, ResourceFile, Transform, TransformBlock, TransformTree,
};
use gmdc_mesh::{
    pack, unpack, unpack_index_group, ExportContext, ExportOptions, ImportContext, ImportOptions,
    MeshProperties, MorphExport, ShapeKey, SourceFace, SourceMesh, SourceVertex,
};

fn transform_node(index: usize, name: &str, t: Vec3, bone: Option<i32>, children: &[i32]) -> Node {
    Node::new(
        index,
        7,
        NodePayload::Transform(TransformBlock {
            tree: CompositionTree {
                object_graph: ObjectGraph {
                    extensions: vec![],
                    name: name.to_string(),
                },
                children: children.iter().map(|&c| NodeRef::new(0, 0, c)).collect(),
            },
            translation: t,
            rotation: Quat::IDENTITY,
            bone_index: bone,
        }),
    )
}

/// root_trans -> spine0 (bone 0, at y=1) -> spine1 (bone 1, at y=1.5)
fn skeleton() -> TransformTree {
    TransformTree::build(&[
        transform_node(0, "root_trans", Vec3::ZERO, None, &[1]),
        transform_node(1, "spine0", Vec3::Y, Some(0), &[2]),
        transform_node(2, "spine1", Vec3::new(0.0, 0.5, 0.0), Some(1), &[]),
    ])
    .unwrap()
}

fn triangle(name: &str) -> SourceMesh {
    let mut mesh = SourceMesh::new(name);
    mesh.vertices = vec![
        SourceVertex::new(Vec3::ZERO, Vec3::Z),
        SourceVertex::new(Vec3::X, Vec3::Z),
        SourceVertex::new(Vec3::Y, Vec3::Z),
    ];
    mesh.faces = vec![SourceFace::new(
        vec![0, 1, 2],
        vec![Vec2::ZERO, Vec2::new(1.0, 0.0), Vec2::new(0.0, 0.25)],
    )];
    mesh
}

fn quad(name: &str) -> SourceMesh {
    let mut mesh = SourceMesh::new(name);
    mesh.vertices = vec![
        SourceVertex::new(Vec3::ZERO, Vec3::Z),
        SourceVertex::new(Vec3::X, Vec3::Z),
        SourceVertex::new(Vec3::new(1.0, 1.0, 0.0), Vec3::Z),
        SourceVertex::new(Vec3::Y, Vec3::Z),
    ];
    mesh.faces = vec![SourceFace::new(
        vec![0, 1, 2, 3],
        vec![Vec2::ZERO, Vec2::X, Vec2::ONE, Vec2::Y],
    )];
    mesh
}

fn pack_with(meshes: &[SourceMesh], options: &ExportOptions) -> (GeometryData, ExportContext) {
    let mut ctx = ExportContext::new();
    let geometry = pack(meshes, None, None, options, &mut ctx).unwrap();
    (geometry, ctx)
}

#[test]
fn single_triangle_round_trip() {
    let (geometry, _) = pack_with(&[triangle("plane")], &ExportOptions::new());
    assert_eq!(geometry.data_groups.len(), 1);
    assert_eq!(geometry.data_groups[0].count(), 3);
    assert!(!geometry.data_groups[0].has_skin());
    assert_eq!(geometry.index_groups[0].indices, vec![[0, 1, 2]]);
    assert_eq!(geometry.index_groups[0].name, "plane");
    // Texture coordinates are stored with v pointing down.
    assert_eq!(geometry.data_groups[0].tex_coords[2], Vec2::new(0.0, 0.75));
    assert!(geometry.inverse_transforms.is_none());

    let mut ctx = ImportContext::new();
    let mesh = unpack_index_group(&geometry, 0, None, &mut ctx).unwrap();
    assert_eq!(mesh.positions, vec![Vec3::ZERO, Vec3::X, Vec3::Y]);
    assert_eq!(mesh.triangles, vec![[0, 1, 2]]);
    assert_eq!(mesh.uvs[0][2], Vec2::new(0.0, 0.25));
    assert_eq!(mesh.flags_property(), "FFFFFFFF");
    assert!(mesh.skin.is_none());
    assert!(ctx.diagnostics.is_empty());
}

#[test]
fn quad_is_split_along_first_diagonal() {
    let (geometry, _) = pack_with(&[quad("quad")], &ExportOptions::new());
    assert_eq!(geometry.data_groups[0].count(), 4);
    assert_eq!(geometry.index_groups[0].indices, vec![[0, 1, 2], [0, 2, 3]]);
}

#[test]
fn flat_faces_use_the_face_normal() {
    let mut mesh = quad("flat");
    mesh.faces[0] = mesh.faces[0].clone().flat(Vec3::NEG_Z);
    let (geometry, _) = pack_with(&[mesh], &ExportOptions::new());
    assert_eq!(geometry.data_groups[0].normals, vec![Vec3::NEG_Z; 4]);
}

#[test]
fn origin_is_added_to_positions() {
    let mut mesh = triangle("moved");
    mesh.origin = Vec3::new(0.0, 0.0, 2.0);
    let (geometry, _) = pack_with(&[mesh], &ExportOptions::new());
    assert_eq!(geometry.data_groups[0].vertices[1], Vec3::new(1.0, 0.0, 2.0));
}

#[test]
fn tangents_are_written_only_when_enabled() {
    let mut mesh = triangle("bumpy");
    mesh.faces[0].tangents = Some(vec![Vec3::X; 3]);
    let (geometry, _) = pack_with(&[mesh.clone()], &ExportOptions::new());
    assert!(!geometry.data_groups[0].has_tangents());
    let (geometry, _) = pack_with(&[mesh], &ExportOptions::new().with_tangents(true));
    assert_eq!(geometry.data_groups[0].tangents, vec![Vec3::X; 3]);
}

#[test]
fn compatible_meshes_share_a_data_group() {
    let (geometry, _) = pack_with(&[triangle("a"), quad("b")], &ExportOptions::new());
    assert_eq!(geometry.data_groups.len(), 1);
    assert_eq!(geometry.data_groups[0].count(), 7);
    assert_eq!(geometry.index_groups[1].data_group_index, 0);
    assert_eq!(geometry.index_groups[1].indices, vec![[3, 4, 5], [3, 5, 6]]);

    let mut ctx = ImportContext::new();
    let b = unpack_index_group(&geometry, 1, None, &mut ctx).unwrap();
    assert_eq!(b.positions.len(), 4);
    assert_eq!(b.triangles, vec![[0, 1, 2], [0, 2, 3]]);
}

#[test]
fn skinned_and_static_meshes_use_separate_groups() {
    let tree = skeleton();
    let mut skinned = triangle("skinned");
    for v in &mut skinned.vertices {
        v.groups.push(("spine0".to_string(), 1.0));
    }
    let options = ExportOptions::new().with_rigging(true);
    let mut ctx = ExportContext::new();
    let geometry = pack(&[skinned, triangle("static")], None, Some(&tree), &options, &mut ctx).unwrap();
    assert_eq!(geometry.data_groups.len(), 2);
    assert!(geometry.data_groups[0].has_skin());
    assert!(!geometry.data_groups[1].has_skin());
    assert!(geometry.index_groups[1].bone_index_map.is_empty());
}

#[test]
fn rigging_maps_bones_and_normalizes_weights() {
    let tree = skeleton();
    let mut mesh = triangle("body");
    mesh.vertices[0].groups = vec![("spine1".to_string(), 3.0)];
    mesh.vertices[1].groups = vec![("spine0".to_string(), 1.0), ("spine1".to_string(), 1.0)];
    mesh.vertices[2].groups = vec![("ghost".to_string(), 1.0)];

    let options = ExportOptions::new().with_rigging(true);
    let mut ctx = ExportContext::new();
    let geometry = pack(&[mesh], None, Some(&tree), &options, &mut ctx).unwrap();

    let group = &geometry.data_groups[0];
    // Local slots in first-use order: spine1 (bone 1), then spine0 (bone 0).
    assert_eq!(geometry.index_groups[0].bone_index_map, vec![1, 0]);
    assert_eq!(group.bones, vec![vec![0], vec![1, 0], vec![]]);
    assert_eq!(group.weights, vec![vec![1.0], vec![0.5, 0.5], vec![]]);
    assert_eq!(ctx.diagnostics.warnings().count(), 1);

    let inverse = geometry.inverse_transforms.as_ref().unwrap();
    assert_eq!(inverse.len(), 2);
    assert_eq!(inverse[0].translation, Vec3::new(0.0, -1.0, 0.0));
    assert_eq!(inverse[1].translation, Vec3::new(0.0, -1.5, 0.0));

    let mut import = ImportContext::new();
    let unpacked = unpack_index_group(&geometry, 0, Some(&tree), &mut import).unwrap();
    let skin = unpacked.skin.unwrap();
    assert_eq!(skin.groups, vec!["spine1#1".to_string(), "spine0#0".to_string()]);
    assert_eq!(skin.vertices[0], vec![(0, 1.0)]);
    assert_eq!(skin.vertices[1], vec![(1, 0.5), (0, 0.5)]);
    assert!(skin.vertices[2].is_empty());
    assert_eq!(skin.members(1), vec![(1, 0.5)]);
}

#[test]
fn zero_weight_sum_gives_zero_weights() {
    let tree = skeleton();
    let mut mesh = triangle("limp");
    mesh.vertices[0].groups = vec![("spine0".to_string(), 0.0)];
    let options = ExportOptions::new().with_rigging(true);
    let mut ctx = ExportContext::new();
    let geometry = pack(&[mesh], None, Some(&tree), &options, &mut ctx).unwrap();
    assert_eq!(geometry.data_groups[0].weights[0], vec![0.0]);
}

#[test]
fn four_bones_store_three_weights() {
    let nodes: Vec<Node> = (0..4)
        .map(|i| transform_node(i, &format!("b{}", i), Vec3::ZERO, Some(i as i32), &[]))
        .collect();
    let tree = TransformTree::build(&nodes).unwrap();
    let mut mesh = triangle("four");
    mesh.vertices[0].groups = (0..4).map(|i| (format!("b{}", i), 1.0)).collect();
    let options = ExportOptions::new().with_rigging(true);
    let mut ctx = ExportContext::new();
    let geometry = pack(&[mesh], None, Some(&tree), &options, &mut ctx).unwrap();
    let group = &geometry.data_groups[0];
    assert_eq!(group.bones[0].len(), 4);
    assert_eq!(group.weights[0], vec![0.25; 3]);
    let full = group.vertex_weights(0);
    assert!((full[3] - 0.25).abs() < 1e-6);
}

#[test]
fn five_bones_are_rejected() {
    let nodes: Vec<Node> = (0..5)
        .map(|i| transform_node(i, &format!("b{}", i), Vec3::ZERO, Some(i as i32), &[]))
        .collect();
    let tree = TransformTree::build(&nodes).unwrap();
    let mut mesh = triangle("crowded");
    mesh.vertices[1].groups = (0..5).map(|i| (format!("b{}", i), 0.2)).collect();
    let options = ExportOptions::new().with_rigging(true);
    let mut ctx = ExportContext::new();
    match pack(&[mesh], None, Some(&tree), &options, &mut ctx) {
        Err(GmdcError::TooManyInfluences { mesh, vertex, count }) => {
            assert_eq!(mesh, "crowded");
            assert_eq!(vertex, 1);
            assert_eq!(count, 5);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

fn smiling_triangle() -> SourceMesh {
    let mut mesh = triangle("head");
    let mut positions: Vec<Vec3> = mesh.vertices.iter().map(|v| v.position).collect();
    positions[1] += Vec3::new(0.0, 0.0, 0.5);
    mesh.shape_keys.push(ShapeKey {
        name: "expression::smile".to_string(),
        positions,
        vertex_normals: vec![Vec3::Y; 3],
        face_normals: vec![Vec3::Y],
    });
    mesh
}

#[test]
fn shape_keys_become_morphs_and_back() {
    let options = ExportOptions::new().with_morphs(MorphExport::Positions);
    let (geometry, ctx) = pack_with(&[smiling_triangle()], &options);
    assert_eq!(ctx.morph_names().len(), 1);
    assert_eq!(geometry.morph_names[0].to_string(), "expression::smile");
    let group = &geometry.data_groups[0];
    assert_eq!(group.morph_width, 1);
    assert_eq!(group.morph_keys, vec![vec![], vec![0], vec![]]);
    assert_eq!(group.delta_vertices[0], vec![Vec3::ZERO]);
    assert!(!group.has_delta_normals());

    let mut import = ImportContext::new();
    let mesh = unpack_index_group(&geometry, 0, None, &mut import).unwrap();
    assert_eq!(mesh.shape_keys.len(), 1);
    assert_eq!(mesh.shape_keys[0].name, "expression::smile");
    assert_eq!(mesh.shape_keys[0].positions[1], Vec3::new(1.0, 0.0, 0.5));
    assert_eq!(mesh.shape_keys[0].positions[0], Vec3::ZERO);
    assert!(mesh.shape_keys[0].normals.is_none());
}

#[test]
fn reused_context_starts_with_no_morphs() {
    let options = ExportOptions::new().with_morphs(MorphExport::Positions);
    let mut ctx = ExportContext::new();
    let first = pack(&[smiling_triangle()], None, None, &options, &mut ctx).unwrap();
    assert_eq!(first.morph_names.len(), 1);

    let second = pack(&[triangle("plain")], None, None, &options, &mut ctx).unwrap();
    assert!(second.morph_names.is_empty());
    assert!(ctx.morph_names().is_empty());
    assert!(!second.data_groups[0].has_morphs());
}

#[test]
fn normal_deltas_are_exported_on_request() {
    let options = ExportOptions::new().with_morphs(MorphExport::PositionsAndNormals);
    let (geometry, _) = pack_with(&[smiling_triangle()], &options);
    let group = &geometry.data_groups[0];
    // Every normal changes, so every vertex is affected.
    assert_eq!(group.morph_keys, vec![vec![0]; 3]);
    assert_eq!(group.delta_normals[0], vec![Vec3::Y - Vec3::Z]);

    let mut import = ImportContext::new();
    let mesh = unpack_index_group(&geometry, 0, None, &mut import).unwrap();
    assert_eq!(mesh.shape_keys[0].normals, Some(vec![Vec3::Y; 3]));
}

#[test]
fn meshes_with_and_without_morphs_use_separate_groups() {
    let options = ExportOptions::new().with_morphs(MorphExport::Positions);
    let (geometry, _) = pack_with(&[smiling_triangle(), triangle("plain")], &options);
    assert_eq!(geometry.data_groups.len(), 2);
    assert_eq!(geometry.data_groups[1].morph_width, 0);
}

#[test]
fn properties_rename_and_filter() {
    let mut mesh = quad("object");
    mesh.faces.push(SourceFace::new(vec![0, 2, 3], vec![Vec2::ZERO; 3]));
    mesh.faces[0].selected = false;
    mesh.properties = MeshProperties {
        name: Some("body_cloth".to_string()),
        flags: Some(0x0000_0010),
        selected_only: true,
    };

    let (geometry, _) = pack_with(&[mesh.clone()], &ExportOptions::new());
    assert_eq!(geometry.index_groups[0].name, "object");
    assert_eq!(geometry.index_groups[0].indices.len(), 3);

    let (geometry, _) = pack_with(&[mesh.clone()], &ExportOptions::new().with_use_properties(true));
    assert_eq!(geometry.index_groups[0].name, "body_cloth");
    assert_eq!(geometry.index_groups[0].flags, 0x10);
    assert_eq!(geometry.index_groups[0].indices.len(), 1);

    mesh.faces[1].selected = false;
    let mut ctx = ExportContext::new();
    let options = ExportOptions::new().with_use_properties(true);
    assert!(matches!(
        pack(&[mesh], None, None, &options, &mut ctx),
        Err(GmdcError::InvalidGeometry(_))
    ));
}

#[test]
fn invalid_meshes_abort_the_export() {
    let options = ExportOptions::new();
    let mut ctx = ExportContext::new();
    assert!(matches!(
        pack(&[], None, None, &options, &mut ctx),
        Err(GmdcError::InvalidGeometry(_))
    ));

    let mut no_uv = triangle("no_uv");
    no_uv.faces[0].uv = None;
    assert!(matches!(
        pack(&[triangle("ok"), no_uv], None, None, &options, &mut ctx),
        Err(GmdcError::InvalidGeometry(_))
    ));

    let mut pentagon = triangle("pentagon");
    pentagon.faces[0].corners = vec![0, 1, 2, 0, 1];
    pentagon.faces[0].uv = Some(vec![Vec2::ZERO; 5]);
    assert!(matches!(
        pack(&[pentagon], None, None, &options, &mut ctx),
        Err(GmdcError::InvalidGeometry(_))
    ));

    let mut dangling = triangle("dangling");
    dangling.faces[0].corners[2] = 9;
    assert!(matches!(
        pack(&[dangling], None, None, &options, &mut ctx),
        Err(GmdcError::InvalidGeometry(_))
    ));
}

fn geometry_with_indices(indices: Vec<[u32; 3]>) -> GeometryData {
    let group = DataGroup {
        vertices: vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::ONE],
        normals: vec![Vec3::Z; 4],
        tex_coords: (0..4).map(|i| Vec2::new(i as f32, 0.0)).collect(),
        ..Default::default()
    };
    let mut index_group = IndexGroup::new("repaired", 0);
    index_group.indices = indices;
    GeometryData {
        data_groups: vec![group],
        index_groups: vec![index_group],
        ..Default::default()
    }
}

#[test]
fn trailing_zero_index_is_rotated_to_the_front() {
    let geometry = geometry_with_indices(vec![[1, 2, 0], [0, 1, 2]]);
    let mut ctx = ImportContext::new();
    let mesh = unpack_index_group(&geometry, 0, None, &mut ctx).unwrap();
    assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 1, 2]]);
    assert_eq!(
        mesh.uvs[0],
        [Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0), Vec2::new(2.0, 1.0)]
    );
    assert_eq!(ctx.diagnostics.len(), 1);
}

#[test]
fn degenerate_triangles_are_dropped() {
    let geometry = geometry_with_indices(vec![[0, 3, 3], [1, 2, 3]]);
    let mut ctx = ImportContext::new();
    let mesh = unpack_index_group(&geometry, 0, None, &mut ctx).unwrap();
    assert_eq!(mesh.triangles, vec![[1, 2, 3]]);
    assert_eq!(mesh.uvs.len(), 1);
    assert_eq!(ctx.diagnostics.warnings().count(), 1);
}

#[test]
fn only_referenced_vertices_are_unpacked() {
    let geometry = geometry_with_indices(vec![[3, 1, 2]]);
    let mut ctx = ImportContext::new();
    let mesh = unpack_index_group(&geometry, 0, None, &mut ctx).unwrap();
    assert_eq!(mesh.positions, vec![Vec3::X, Vec3::Y, Vec3::ONE]);
    assert_eq!(mesh.triangles, vec![[2, 0, 1]]);
}

#[test]
fn unknown_bone_slot_is_a_reference_error() {
    let mut geometry = geometry_with_indices(vec![[0, 1, 2]]);
    geometry.data_groups[0].bones = vec![vec![0], vec![1], vec![0], vec![]];
    geometry.data_groups[0].weights = vec![vec![1.0], vec![1.0], vec![1.0], vec![]];
    geometry.index_groups[0].bone_index_map = vec![0];
    let mut ctx = ImportContext::new();
    assert!(matches!(
        unpack_index_group(&geometry, 0, None, &mut ctx),
        Err(GmdcError::Reference(_))
    ));
    assert!(matches!(
        unpack_index_group(&geometry, 7, None, &mut ctx),
        Err(GmdcError::Reference(_))
    ));
}

#[test]
fn static_bounding_shape_round_trip() {
    let mut ctx = ExportContext::new();
    let shape = quad("shape");
    let geometry = pack(&[triangle("body")], Some(&shape), None, &ExportOptions::new(), &mut ctx).unwrap();
    let bounding = geometry.static_bounding_mesh.as_ref().unwrap();
    assert_eq!(bounding.triangles, vec![[0, 1, 2], [0, 2, 3]]);
    assert!(geometry.dynamic_bounding_mesh.is_none());

    let options = ImportOptions::new().with_import_bounding_mesh(true);
    let mut import = ImportContext::new();
    let unpacked = unpack(&geometry, None, &options, &mut import).unwrap();
    let mesh = unpacked.bounding_mesh.unwrap();
    assert_eq!(mesh.positions.len(), 4);
    assert!(mesh.groups.is_empty());

    let unpacked = unpack(&geometry, None, &ImportOptions::new(), &mut import).unwrap();
    assert!(unpacked.bounding_mesh.is_none());
}

#[test]
fn dynamic_bounding_shape_round_trip() {
    let tree = skeleton();
    let mut shape = SourceMesh::new("shape");
    shape.vertices = vec![
        SourceVertex::new(Vec3::new(0.0, 1.0, 0.0), Vec3::Z).with_group("spine0", 1.0),
        SourceVertex::new(Vec3::new(1.0, 1.0, 0.0), Vec3::Z).with_group("spine0", 1.0),
        SourceVertex::new(Vec3::new(1.0, 2.0, 0.0), Vec3::Z).with_group("spine0", 1.0),
        SourceVertex::new(Vec3::new(0.0, 2.0, 0.0), Vec3::Z).with_group("spine0", 1.0),
        SourceVertex::new(Vec3::new(0.0, 2.0, 1.0), Vec3::Z).with_group("spine1", 1.0),
        SourceVertex::new(Vec3::new(1.0, 2.0, 1.0), Vec3::Z).with_group("spine1", 1.0),
        SourceVertex::new(Vec3::new(1.0, 3.0, 1.0), Vec3::Z).with_group("spine1", 0.0),
    ];
    shape.faces = vec![
        SourceFace::new(vec![0, 1, 2, 3], vec![Vec2::ZERO; 4]),
        SourceFace::new(vec![4, 5, 6], vec![Vec2::ZERO; 3]),
    ];
    let options = ExportOptions::new().with_rigging(true);
    let mut ctx = ExportContext::new();
    let geometry = pack(&[triangle("body")], Some(&shape), Some(&tree), &options, &mut ctx).unwrap();
    assert!(geometry.static_bounding_mesh.is_none());
    let parts = geometry.dynamic_bounding_mesh.as_ref().unwrap();
    assert_eq!(parts.len(), 2);
    let spine0 = parts[0].as_ref().unwrap();
    assert_eq!(spine0.triangles, vec![[0, 1, 2], [0, 2, 3]]);
    // Stored in bone space: spine0 sits at y = 1.
    assert_eq!(spine0.vertices[0], Vec3::ZERO);
    // The spine1 face has a vertex with zero weight.
    assert!(parts[1].is_none());

    let import_options = ImportOptions::new().with_import_bounding_mesh(true);
    let mut import = ImportContext::new();
    let unpacked = unpack(&geometry, Some(&tree), &import_options, &mut import).unwrap();
    let merged = unpacked.dynamic_bounding_mesh.unwrap();
    assert_eq!(merged.positions, shape.vertices[..4].iter().map(|v| v.position).collect::<Vec<_>>());
    assert_eq!(merged.groups.len(), 1);
    assert_eq!(merged.groups[0].name, "spine0#0");
    assert_eq!(unpacked.inverse_transforms.map(|t| t.len()), Some(2));
}

#[test]
fn packed_geometry_survives_the_container() {
    let tree = skeleton();
    let mut mesh = smiling_triangle();
    mesh.vertices[0].groups = vec![("spine0".to_string(), 1.0)];
    let options = ExportOptions::new()
        .with_rigging(true)
        .with_tangents(true)
        .with_morphs(MorphExport::PositionsAndNormals);
    let mut ctx = ExportContext::new();
    let geometry = pack(&[mesh, quad("cloth")], None, Some(&tree), &options, &mut ctx).unwrap();

    let file = ResourceFile::from_geometry("body_tslocator_gmdc", geometry.clone());
    let bytes = file.encode().unwrap();
    let decoded = ResourceFile::decode(&bytes).unwrap();
    assert_eq!(decoded.geometry(), Some(&geometry));

    let mut import = ImportContext::new();
    let unpacked = unpack(&geometry, Some(&tree), &ImportOptions::new(), &mut import).unwrap();
    assert_eq!(unpacked.meshes.len(), 2);
    assert_eq!(unpacked.meshes[1].name, "cloth");
    assert_eq!(
        unpacked.inverse_transforms.unwrap()[0],
        Transform::new(Vec3::new(0.0, -1.0, 0.0), Quat::IDENTITY)
    );
}

#[test]
fn remove_doubles_on_import() {
    // Two corners of the same position with different normals.
    let mut mesh = quad("seam");
    mesh.faces[0] = mesh.faces[0].clone().flat(Vec3::Z);
    mesh.faces.push(SourceFace::new(vec![0, 2, 3], vec![Vec2::ZERO; 3]).flat(Vec3::X));
    let (geometry, _) = pack_with(&[mesh], &ExportOptions::new());
    assert_eq!(geometry.data_groups[0].count(), 7);

    let options = ImportOptions::new().with_remove_doubles(true);
    let mut ctx = ImportContext::new();
    let unpacked = unpack(&geometry, None, &options, &mut ctx).unwrap();
    assert_eq!(unpacked.meshes[0].positions.len(), 4);
    assert_eq!(unpacked.meshes[0].triangles.len(), 3);
}

#[test]
fn remove_doubles_keeps_corner_uvs_across_seams() {
    // Vertex 4 sits on vertex 0 with its own UV.
    let mut geometry = geometry_with_indices(vec![[0, 1, 2], [2, 3, 4]]);
    let group = &mut geometry.data_groups[0];
    group.vertices.push(Vec3::ZERO);
    group.normals.push(Vec3::Z);
    group.tex_coords.push(Vec2::new(4.0, 0.0));

    let options = ImportOptions::new().with_remove_doubles(true);
    let mut ctx = ImportContext::new();
    let unpacked = unpack(&geometry, None, &options, &mut ctx).unwrap();
    let mesh = &unpacked.meshes[0];
    assert_eq!(mesh.positions.len(), 4);
    assert_eq!(mesh.triangles, vec![[0, 1, 2], [0, 2, 3]]);
    assert_eq!(
        mesh.uvs[0],
        [Vec2::new(0.0, 1.0), Vec2::new(1.0, 1.0), Vec2::new(2.0, 1.0)]
    );
    assert_eq!(
        mesh.uvs[1],
        [Vec2::new(4.0, 1.0), Vec2::new(2.0, 1.0), Vec2::new(3.0, 1.0)]
    );
}

proptest! {
    #[test]
    fn dedup_never_grows_and_indices_stay_valid(
        faces in proptest::collection::vec(
            proptest::sample::subsequence((0u32..8).collect::<Vec<_>>(), 3),
            1..12,
        ),
    ) {
        let mut mesh = SourceMesh::new("random");
        mesh.vertices = (0..8)
            .map(|i| SourceVertex::new(Vec3::new(i as f32, 0.0, 0.0), Vec3::Z))
            .collect();
        mesh.faces = faces
            .iter()
            .map(|corners| SourceFace::new(corners.clone(), vec![Vec2::ZERO; 3]))
            .collect();
        let mut ctx = ExportContext::new();
        let geometry = pack(&[mesh.clone()], None, None, &ExportOptions::new(), &mut ctx).unwrap();
        let count = geometry.data_groups[0].count();
        prop_assert!(count <= mesh.faces.len() * 3);

        let mut used: Vec<u32> = faces.iter().flatten().copied().collect();
        used.sort_unstable();
        used.dedup();
        prop_assert_eq!(count, used.len());

        for tri in &geometry.index_groups[0].indices {
            prop_assert!(tri.iter().all(|&i| (i as usize) < count));
            prop_assert!(tri[0] != tri[1] && tri[1] != tri[2] && tri[0] != tri[2]);
        }
    }
}
