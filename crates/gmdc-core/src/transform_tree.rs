//! Bone/joint hierarchy built from the transform nodes of a resource file.

use std::collections::HashMap;
use std::fmt;

use glam::{Quat, Vec3};
use tracing::warn;

use crate::geometry_indices::TransformNodeId;
use crate::node::Node;
use crate::status::{GmdcError, Result};
use crate::transform::Transform;

#[derive(Debug, Clone, PartialEq)]
pub struct TransformTreeNode {
    pub id: TransformNodeId,
    /// Position of the source node in the file's node list.
    pub node_index: usize,
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    pub bone_index: Option<i32>,
    children: Vec<TransformNodeId>,
    parent: Option<TransformNodeId>,
    absolute: Transform,
}

impl TransformTreeNode {
    pub fn local(&self) -> Transform {
        Transform::new(self.translation, self.rotation)
    }

    /// Transform from this node's space to object space.
    pub fn absolute(&self) -> Transform {
        self.absolute
    }

    pub fn parent(&self) -> Option<TransformNodeId> {
        self.parent
    }

    pub fn children(&self) -> &[TransformNodeId] {
        &self.children
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeQuery<'a> {
    Name(&'a str),
    BoneIndex(i32),
}

impl fmt::Display for NodeQuery<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeQuery::Name(name) => write!(f, "name \"{}\"", name),
            NodeQuery::BoneIndex(i) => write!(f, "bone index {}", i),
        }
    }
}

/// Arena of transform nodes with parent/child links and precomputed
/// absolute transforms. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransformTree {
    nodes: Vec<TransformTreeNode>,
    roots: Vec<TransformNodeId>,
}

impl TransformTree {
    /// Builds the hierarchy from a node list.
    ///
    /// Every `cTransformNode` becomes a tree node; child references from one
    /// transform node to another create the edges. A node claimed by two
    /// parents stays with the first one. Nodes that cannot be reached from
    /// a root (reference cycles) are an error.
    pub fn build(nodes: &[Node]) -> Result<Self> {
        let mut tree_nodes = Vec::new();
        let mut ids: HashMap<usize, TransformNodeId> = HashMap::new();
        for (position, node) in nodes.iter().enumerate() {
            if let Some(block) = node.transform() {
                let id = TransformNodeId::from(tree_nodes.len());
                ids.insert(position, id);
                tree_nodes.push(TransformTreeNode {
                    id,
                    node_index: position,
                    name: block.name().to_string(),
                    translation: block.translation,
                    rotation: block.rotation,
                    bone_index: block.bone_index,
                    children: Vec::new(),
                    parent: None,
                    absolute: Transform::IDENTITY,
                });
            }
        }

        for (position, node) in nodes.iter().enumerate() {
            let Some(block) = node.transform() else {
                continue;
            };
            let parent = ids[&position];
            for child_ref in block.children() {
                let target = child_ref
                    .node_index()
                    .filter(|&i| i < nodes.len())
                    .ok_or_else(|| {
                        GmdcError::reference(format!(
                            "node #{} \"{}\" references missing node {}",
                            position,
                            block.name(),
                            child_ref.index
                        ))
                    })?;
                let Some(&child) = ids.get(&target) else {
                    continue;
                };
                if let Some(existing) = tree_nodes[usize::from(child)].parent {
                    warn!(
                        "Transform node \"{}\" has more than one parent; keeping node #{}",
                        tree_nodes[usize::from(child)].name,
                        tree_nodes[usize::from(existing)].node_index
                    );
                    continue;
                }
                tree_nodes[usize::from(child)].parent = Some(parent);
                tree_nodes[usize::from(parent)].children.push(child);
            }
        }

        let roots: Vec<TransformNodeId> = tree_nodes
            .iter()
            .filter(|n| n.parent.is_none())
            .map(|n| n.id)
            .collect();

        let mut visited = vec![false; tree_nodes.len()];
        let mut stack: Vec<TransformNodeId> = roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let i = usize::from(id);
            visited[i] = true;
            let absolute = match tree_nodes[i].parent {
                Some(p) => {
                    Transform::compose(&tree_nodes[usize::from(p)].absolute, &tree_nodes[i].local())
                }
                None => tree_nodes[i].local(),
            };
            tree_nodes[i].absolute = absolute;
            stack.extend(tree_nodes[i].children.iter().rev().copied());
        }

        if let Some(i) = visited.iter().position(|v| !v) {
            return Err(GmdcError::reference(format!(
                "transform node #{} \"{}\" is part of a reference cycle",
                tree_nodes[i].node_index, tree_nodes[i].name
            )));
        }

        Ok(Self {
            nodes: tree_nodes,
            roots,
        })
    }

    pub fn nodes(&self) -> &[TransformTreeNode] {
        &self.nodes
    }

    pub fn roots(&self) -> &[TransformNodeId] {
        &self.roots
    }

    pub fn node(&self, id: TransformNodeId) -> &TransformTreeNode {
        &self.nodes[usize::from(id)]
    }

    pub fn parent(&self, id: TransformNodeId) -> Option<&TransformTreeNode> {
        self.node(id).parent.map(|p| self.node(p))
    }

    pub fn children(&self, id: TransformNodeId) -> impl Iterator<Item = &TransformTreeNode> {
        self.node(id).children.iter().map(move |&c| self.node(c))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up the single node matching `query`.
    ///
    /// # Errors
    ///
    /// `GmdcError::NotFound` if nothing matches, `GmdcError::Reference` if
    /// several nodes match.
    pub fn get_node(&self, query: NodeQuery<'_>) -> Result<&TransformTreeNode> {
        let mut matches = self.nodes.iter().filter(|n| match query {
            NodeQuery::Name(name) => n.name == name,
            NodeQuery::BoneIndex(i) => n.bone_index == Some(i),
        });
        let first = matches
            .next()
            .ok_or_else(|| GmdcError::NotFound(format!("transform node with {}", query)))?;
        if matches.next().is_some() {
            return Err(GmdcError::reference(format!(
                "more than one transform node with {}",
                query
            )));
        }
        Ok(first)
    }

    /// Nodes that carry a bone index, in node order.
    pub fn bone_nodes(&self) -> impl Iterator<Item = &TransformTreeNode> {
        self.nodes.iter().filter(|n| matches!(n.bone_index, Some(i) if i >= 0))
    }

    pub fn bone_indices(&self) -> Vec<i32> {
        let mut indices: Vec<i32> = self.bone_nodes().filter_map(|n| n.bone_index).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    pub fn max_bone_index(&self) -> Option<i32> {
        self.bone_nodes().filter_map(|n| n.bone_index).max()
    }

    fn fmt_subtree(&self, f: &mut fmt::Formatter<'_>, id: TransformNodeId, depth: usize) -> fmt::Result {
        let node = self.node(id);
        let t = node.absolute.translation;
        write!(f, "{}{}", "  ".repeat(depth), node.name)?;
        if let Some(b) = node.bone_index {
            write!(f, " [bone {}]", b)?;
        }
        writeln!(f, " ({:.4}, {:.4}, {:.4})", t.x, t.y, t.z)?;
        for &c in &node.children {
            self.fmt_subtree(f, c, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for TransformTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &root in &self.roots {
            self.fmt_subtree(f, root, 0)?;
        }
        Ok(())
    }
}
