// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph assets and the stores that keep them.
//!
//! Assets are addressed by a path string and stored as RON text. The
//! translator and the editor only see the [`AssetStore`] trait.

use crate::graph::Graph;
use crate::node::NodeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current graph asset format version
pub const GRAPH_FORMAT_VERSION: u32 = 1;

/// Default extension of graph asset files
pub const GRAPH_FILE_EXTENSION: &str = "ordoscript";

/// A graph as written to storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphAsset {
    /// Format version
    pub version: u32,
    /// The graph
    pub graph: Graph,
}

impl GraphAsset {
    /// Wrap a graph at the current format version
    pub fn new(graph: Graph) -> Self {
        Self {
            version: GRAPH_FORMAT_VERSION,
            graph,
        }
    }

    /// Serialize to RON
    pub fn to_ron(&self) -> Result<String, AssetError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Parse from RON, rejecting newer formats
    pub fn from_ron(source: &str) -> Result<Self, AssetError> {
        let asset: GraphAsset = ron::from_str(source)?;
        if asset.version > GRAPH_FORMAT_VERSION {
            return Err(AssetError::UnsupportedVersion {
                found: asset.version,
                supported: GRAPH_FORMAT_VERSION,
            });
        }
        Ok(asset)
    }
}

/// Error when loading or saving assets
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    /// No asset at that path
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure
    #[error("Failed to serialize graph: {0}")]
    Serialize(#[from] ron::Error),

    /// Parse failure
    #[error("Failed to parse graph: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Asset written by a newer editor
    #[error("Graph version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the asset
        found: u32,
        /// Highest supported version
        supported: u32,
    },

    /// Directory walk failure
    #[error("Failed to list assets: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Persistence of graphs keyed by path
pub trait AssetStore {
    /// Load the graph at `path`
    fn load(&self, path: &str) -> Result<Graph, AssetError>;

    /// Save a graph at `path`, replacing what was there
    fn save(&mut self, path: &str, graph: &Graph) -> Result<(), AssetError>;

    /// Whether an asset exists at `path`
    fn exists(&self, path: &str) -> bool;

    /// Every graph asset path, sorted
    fn list(&self) -> Result<Vec<String>, AssetError>;
}

/// Asset store holding serialized graphs in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    assets: IndexMap<String, String>,
}

impl MemoryAssetStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop an asset, as when it is unloaded and deleted
    pub fn remove(&mut self, path: &str) -> bool {
        self.assets.shift_remove(path).is_some()
    }

    /// Store raw text under `path`
    pub fn insert_raw(&mut self, path: impl Into<String>, source: impl Into<String>) {
        self.assets.insert(path.into(), source.into());
    }
}

impl AssetStore for MemoryAssetStore {
    fn load(&self, path: &str) -> Result<Graph, AssetError> {
        let source = self
            .assets
            .get(path)
            .ok_or_else(|| AssetError::NotFound(path.to_string()))?;
        Ok(GraphAsset::from_ron(source)?.graph)
    }

    fn save(&mut self, path: &str, graph: &Graph) -> Result<(), AssetError> {
        let source = GraphAsset::new(graph.clone()).to_ron()?;
        self.assets.insert(path.to_string(), source);
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.assets.contains_key(path)
    }

    fn list(&self) -> Result<Vec<String>, AssetError> {
        let mut paths: Vec<String> = self.assets.keys().cloned().collect();
        paths.sort();
        Ok(paths)
    }
}

/// Asset store backed by a directory of RON files
#[derive(Debug, Clone)]
pub struct FileAssetStore {
    root: PathBuf,
    extension: String,
}

impl FileAssetStore {
    /// Store rooted at `root` using the default extension
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extension: GRAPH_FILE_EXTENSION.to_string(),
        }
    }

    /// Use another file extension for graph assets
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File system location of an asset path
    pub fn file_path(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl AssetStore for FileAssetStore {
    fn load(&self, path: &str) -> Result<Graph, AssetError> {
        let file = self.file_path(path);
        if !file.is_file() {
            return Err(AssetError::NotFound(path.to_string()));
        }
        let source = std::fs::read_to_string(file)?;
        Ok(GraphAsset::from_ron(&source)?.graph)
    }

    fn save(&mut self, path: &str, graph: &Graph) -> Result<(), AssetError> {
        let file = self.file_path(path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(file, GraphAsset::new(graph.clone()).to_ron()?)?;
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.file_path(path).is_file()
    }

    fn list(&self) -> Result<Vec<String>, AssetError> {
        let mut paths = Vec::new();
        for entry in walkdir::WalkDir::new(&self.root).follow_links(true) {
            let entry = entry?;
            let is_graph = entry.file_type().is_file()
                && entry.path().extension().is_some_and(|e| e == self.extension.as_str());
            if !is_graph {
                continue;
            }
            if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                let parts: Vec<_> = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect();
                paths.push(parts.join("/"));
            }
        }
        paths.sort();
        Ok(paths)
    }
}

/// Id-level structure of a graph, compared by integrity checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphSummary {
    /// Graph name
    pub name: String,
    /// Node ids with their type id and stack contents, in graph order
    pub nodes: Vec<(NodeId, String, Vec<NodeId>)>,
    /// Connections as (output node, output port, input node, input port), sorted
    pub connections: Vec<(NodeId, String, NodeId, String)>,
    /// Number of declared variables
    pub variable_count: usize,
}

impl GraphSummary {
    /// Summarize a graph
    pub fn of(graph: &Graph) -> Self {
        let port_name = |node: NodeId, port| {
            graph
                .node(node)
                .and_then(|n| n.port(&port))
                .map(|p| p.name.clone())
                .unwrap_or_default()
        };
        let mut connections: Vec<_> = graph
            .edges()
            .map(|e| {
                (
                    e.output.node,
                    port_name(e.output.node, e.output.port),
                    e.input.node,
                    port_name(e.input.node, e.input.port),
                )
            })
            .collect();
        connections.sort();

        Self {
            name: graph.name.clone(),
            nodes: graph
                .nodes()
                .map(|n| (n.id, n.kind.type_id().to_string(), n.children.clone()))
                .collect(),
            connections,
            variable_count: graph.variables().count(),
        }
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.connections.len()
    }
}

/// Save a graph, reload it, and compare structure
pub fn check_round_trip(store: &mut dyn AssetStore, path: &str, graph: &Graph) -> Result<bool, AssetError> {
    let before = GraphSummary::of(graph);
    store.save(path, graph)?;
    let after = GraphSummary::of(&store.load(path)?);
    if before != after {
        tracing::warn!(path, "Graph structure changed after reload");
    }
    Ok(before == after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_version_rejected() {
        let mut asset = GraphAsset::new(Graph::new("Future"));
        asset.version = GRAPH_FORMAT_VERSION + 1;
        let text = asset.to_ron().unwrap();
        assert!(matches!(
            GraphAsset::from_ron(&text),
            Err(AssetError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_memory_store_missing_asset() {
        let store = MemoryAssetStore::new();
        assert!(matches!(store.load("missing.ordoscript"), Err(AssetError::NotFound(_))));
    }

    #[test]
    fn test_file_store_lists_graphs() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileAssetStore::new(dir.path());
        store.save("player/movement.ordoscript", &Graph::new("Movement")).unwrap();
        store.save("enemy.ordoscript", &Graph::new("Enemy")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not a graph").unwrap();

        assert_eq!(
            store.list().unwrap(),
            vec!["enemy.ordoscript".to_string(), "player/movement.ordoscript".to_string()]
        );
        assert_eq!(store.load("enemy.ordoscript").unwrap().name, "Enemy");
    }
}
