use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{GenError, Result};

const NODE_PREFIX: &str = "node";

/// A `node<N>` directory written by the chain builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDir {
    pub name: String,
    pub index: usize,
    pub path: PathBuf,
}

impl NodeDir {
    pub fn new(path: PathBuf) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| GenError::parse(&path, "directory name is not valid UTF-8"))?;
        let index = parse_node_index(&name).ok_or_else(|| {
            GenError::parse(&path, format!("'{}' does not match node<N>", name))
        })?;
        Ok(Self { name, index, path })
    }

    pub fn config_ini(&self) -> PathBuf {
        self.path.join("config.ini")
    }

    pub fn config_genesis(&self) -> PathBuf {
        self.path.join("config.genesis")
    }

    pub fn nodes_json(&self) -> PathBuf {
        self.path.join("nodes.json")
    }

    pub fn conf_dir(&self) -> PathBuf {
        self.path.join("conf")
    }
}

/// Ordinal of a `node<N>` directory name.
pub fn parse_node_index(name: &str) -> Option<usize> {
    let digits = name.strip_prefix(NODE_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Find node directories under `root`, ordered by index.
///
/// Every subdirectory whose name starts with `node` is a node directory; one
/// whose suffix is not a number is an error rather than silently skipped.
pub fn discover_nodes(root: &Path) -> Result<Vec<NodeDir>> {
    let entries = fs::read_dir(root).map_err(|e| GenError::io(root, e))?;

    let mut nodes = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| GenError::io(root, e))?;
        let path = entry.path();
        // follows symlinks, so a linked node directory still counts
        let is_dir = path.is_dir();
        let is_candidate = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(NODE_PREFIX));

        if !is_dir || !is_candidate {
            debug!("Ignoring {}", path.display());
            continue;
        }
        nodes.push(NodeDir::new(path)?);
    }

    nodes.sort_by_key(|node| node.index);
    Ok(nodes)
}
