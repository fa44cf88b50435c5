//! Read-only commands: `info`, `verify` and `skeleton`.

use std::path::Path;

use anyhow::{bail, Context, Result};

use gmdc_core::{ResourceFile, TransformTree};

pub fn load(path: &Path) -> Result<ResourceFile> {
    ResourceFile::load(path).with_context(|| format!("Failed to load resource file: {:?}", path))
}

/// File summary with one line per node. `verbose` prints every node in full.
pub fn info_report(file: &ResourceFile, verbose: bool) -> String {
    let mut lines = vec![file.to_string()];
    for node in &file.nodes {
        if verbose {
            lines.push(node.to_string());
        } else {
            lines.push(format!(
                "#{} {} \"{}\"",
                node.index,
                node.kind(),
                node.name().or_else(|| node.resource_name()).unwrap_or("")
            ));
        }
    }
    if let Some(geometry) = file.geometry() {
        lines.push(geometry.to_string());
    }
    lines.join("\n")
}

/// Outcome of decoding a file and encoding it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub size: usize,
    pub encoded_size: usize,
    pub nodes: usize,
    /// Offset of the first byte that differs, if any.
    pub first_difference: Option<usize>,
}

impl VerifyReport {
    pub fn is_identical(&self) -> bool {
        self.first_difference.is_none()
    }
}

pub fn verify_bytes(data: &[u8]) -> Result<VerifyReport> {
    let file = ResourceFile::decode(data).context("Decoding failed")?;
    let encoded = file.encode().context("Re-encoding failed")?;
    let first_difference = data
        .iter()
        .zip(&encoded)
        .position(|(a, b)| a != b)
        .or_else(|| (data.len() != encoded.len()).then(|| data.len().min(encoded.len())));
    Ok(VerifyReport {
        size: data.len(),
        encoded_size: encoded.len(),
        nodes: file.nodes.len(),
        first_difference,
    })
}

/// Loads a skeleton (`.cres`) file and builds its transform hierarchy.
pub fn load_skeleton(path: &Path) -> Result<TransformTree> {
    let file = load(path)?;
    if !file.is_resource_node_file() {
        bail!("{:?} is not a skeleton: first node is not a cResourceNode", path);
    }
    TransformTree::build(&file.nodes)
        .with_context(|| format!("Failed to build transform tree from {:?}", path))
}
