// SPDX-License-Identifier: MIT OR Apache-2.0
//! Trace recorder: maps trace hook indices in generated code back to nodes.
//!
//! The recorder is owned by whoever drives compilation (an editor session)
//! and handed to the compiler explicitly. Indices are assigned per graph.

use indexmap::IndexMap;
use ordoplay_script_graph::NodeId;

/// Name of the runtime class receiving trace calls
pub const TRACE_HOOK_CLASS: &str = "ScriptTrace";

/// Name of the runtime method receiving trace calls
pub const TRACE_HOOK_METHOD: &str = "Record";

/// A recorded execution of a traced node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceHit {
    /// Executed node
    pub node: NodeId,
    /// Frame the hit was recorded in
    pub frame: u64,
}

/// Trace indices and hits, per graph
#[derive(Debug, Default)]
pub struct TraceRecorder {
    indices: IndexMap<String, Vec<NodeId>>,
    hits: IndexMap<String, Vec<TraceHit>>,
}

impl TraceRecorder {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the indices of a graph before it is recompiled
    pub fn begin_graph(&mut self, graph: &str) {
        self.indices.insert(graph.to_string(), Vec::new());
        self.hits.shift_remove(graph);
    }

    /// Trace index of a node, assigning the next one if needed
    pub fn register(&mut self, graph: &str, node: NodeId) -> usize {
        let nodes = self.indices.entry(graph.to_string()).or_default();
        match nodes.iter().position(|n| *n == node) {
            Some(index) => index,
            None => {
                nodes.push(node);
                nodes.len() - 1
            }
        }
    }

    /// Node behind a trace index
    pub fn node_for(&self, graph: &str, index: usize) -> Option<NodeId> {
        self.indices.get(graph)?.get(index).copied()
    }

    /// Record a hit reported by the runtime
    pub fn record_hit(&mut self, graph: &str, index: usize, frame: u64) -> Option<NodeId> {
        let Some(node) = self.node_for(graph, index) else {
            tracing::warn!(graph, index, "Trace hit for an unknown index");
            return None;
        };
        self.hits
            .entry(graph.to_string())
            .or_default()
            .push(TraceHit { node, frame });
        Some(node)
    }

    /// Hits recorded for a graph, oldest first
    pub fn hits_for(&self, graph: &str) -> &[TraceHit] {
        self.hits.get(graph).map(Vec::as_slice).unwrap_or_default()
    }

    /// Nodes hit in `frame`
    pub fn nodes_hit_in_frame(&self, graph: &str, frame: u64) -> Vec<NodeId> {
        self.hits_for(graph)
            .iter()
            .filter(|hit| hit.frame == frame)
            .map(|hit| hit.node)
            .collect()
    }

    /// Drop every recorded hit, keeping indices
    pub fn clear_hits(&mut self) {
        self.hits.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_are_stable_per_graph() {
        let mut recorder = TraceRecorder::new();
        let a = NodeId::new();
        let b = NodeId::new();
        assert_eq!(recorder.register("Player", a), 0);
        assert_eq!(recorder.register("Player", b), 1);
        assert_eq!(recorder.register("Player", a), 0);
        assert_eq!(recorder.register("Enemy", b), 0);
        assert_eq!(recorder.node_for("Player", 1), Some(b));
    }

    #[test]
    fn test_hits_resolve_to_nodes() {
        let mut recorder = TraceRecorder::new();
        let node = NodeId::new();
        recorder.register("Player", node);
        assert_eq!(recorder.record_hit("Player", 0, 7), Some(node));
        assert_eq!(recorder.record_hit("Player", 5, 7), None);
        assert_eq!(recorder.nodes_hit_in_frame("Player", 7), vec![node]);

        recorder.begin_graph("Player");
        assert!(recorder.hits_for("Player").is_empty());
        assert_eq!(recorder.node_for("Player", 0), None);
    }
}
