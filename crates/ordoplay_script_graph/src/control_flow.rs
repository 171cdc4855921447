// SPDX-License-Identifier: MIT OR Apache-2.0
//! Control-flow analysis over stacks.
//!
//! Stacks are linked by execution edges: a stack flows into the targets of
//! its terminal branch, or into the target of its `Out` port. The join point
//! of several branches is the nearest stack that every execution path out of
//! every branch is guaranteed to reach. Code emitted for a branching node
//! stops each branch at the join and emits the join once afterwards.

use crate::graph::Graph;
use crate::node::NodeId;
use indexmap::IndexSet;
use std::collections::{HashMap, HashSet, VecDeque};

/// Nearest stack that every path from `a` and every path from `b` reaches.
///
/// Symmetric in `a` and `b`. Returns `None` when the branches never rejoin.
pub fn find_common_descendant(graph: &Graph, a: NodeId, b: NodeId) -> Option<NodeId> {
    find_common_descendant_of_all(graph, &[a, b])
}

/// Nearest stack that every path from every origin reaches.
///
/// Used for multi-way branches. Candidates are ranked by the sum of their
/// forward distances from the origins, then by graph order.
pub fn find_common_descendant_of_all(graph: &Graph, origins: &[NodeId]) -> Option<NodeId> {
    let mut common: Option<IndexSet<NodeId>> = None;
    for origin in origins {
        // Cycles are cut at the origin
        let reached = MustReach::new(graph).of(*origin);
        common = Some(match common {
            None => reached,
            Some(acc) => acc.intersection(&reached).copied().collect(),
        });
    }

    let candidates = common?;
    let distances: Vec<HashMap<NodeId, usize>> = origins.iter().map(|o| forward_distances(graph, *o)).collect();

    candidates
        .into_iter()
        .filter_map(|candidate| {
            let total = distances
                .iter()
                .map(|d| d.get(&candidate).copied())
                .sum::<Option<usize>>()?;
            let order = graph.node_index(candidate).unwrap_or(usize::MAX);
            Some((total, order, candidate))
        })
        .min()
        .map(|(_, _, candidate)| candidate)
}

/// Memoized "must reach" sets: a stack plus everything all its branches reach
struct MustReach<'a> {
    graph: &'a Graph,
    memo: HashMap<NodeId, IndexSet<NodeId>>,
    in_progress: HashSet<NodeId>,
}

impl<'a> MustReach<'a> {
    fn new(graph: &'a Graph) -> Self {
        Self {
            graph,
            memo: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    fn of(&mut self, stack: NodeId) -> IndexSet<NodeId> {
        if let Some(known) = self.memo.get(&stack) {
            return known.clone();
        }
        // Back edge: the loop exits here
        if !self.in_progress.insert(stack) {
            return IndexSet::new();
        }

        let mut through: Option<IndexSet<NodeId>> = None;
        for successor in self.graph.successors_of_stack(stack) {
            // An unconnected branch exits, so nothing is reached through it
            let reached = match successor {
                Some(next) => self.of(next),
                None => IndexSet::new(),
            };
            through = Some(match through {
                None => reached,
                Some(acc) => acc.intersection(&reached).copied().collect(),
            });
        }

        let mut result = IndexSet::from([stack]);
        result.extend(through.unwrap_or_default());

        self.in_progress.remove(&stack);
        self.memo.insert(stack, result.clone());
        result
    }
}

/// Shortest execution distance from `origin` to every reachable stack
fn forward_distances(graph: &Graph, origin: NodeId) -> HashMap<NodeId, usize> {
    let mut distances = HashMap::from([(origin, 0)]);
    let mut queue = VecDeque::from([origin]);
    while let Some(current) = queue.pop_front() {
        let next_distance = distances.get(&current).copied().unwrap_or_default() + 1;
        for next in graph.successors_of_stack(current).into_iter().flatten() {
            if !distances.contains_key(&next) {
                distances.insert(next, next_distance);
                queue.push_back(next);
            }
        }
    }
    distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DefinitionEnv;
    use crate::node::NodeKind;
    use crate::oracle::TypeDatabase;

    #[test]
    fn test_if_else_join() {
        let db = TypeDatabase::standard();
        let env = DefinitionEnv::new(&db);
        let mut graph = Graph::new("Test");
        let [a, b, c, d] = [(); 4].map(|_| graph.spawn_node(NodeKind::Stack, [0.0, 0.0], &env).unwrap());
        let branch = graph.add_node_to_stack(a, None, NodeKind::If, &env).unwrap();
        graph.connect_by_name(branch, "Then", b, "In").unwrap();
        graph.connect_by_name(branch, "Else", c, "In").unwrap();
        graph.connect_by_name(b, "Out", d, "In").unwrap();
        graph.connect_by_name(c, "Out", d, "In").unwrap();

        assert_eq!(find_common_descendant(&graph, b, c), Some(d));
        assert_eq!(find_common_descendant(&graph, c, b), Some(d));
    }

    #[test]
    fn test_disjoint_branches() {
        let db = TypeDatabase::standard();
        let env = DefinitionEnv::new(&db);
        let mut graph = Graph::new("Test");
        let b = graph.spawn_node(NodeKind::Stack, [0.0, 0.0], &env).unwrap();
        let c = graph.spawn_node(NodeKind::Stack, [0.0, 0.0], &env).unwrap();
        assert_eq!(find_common_descendant(&graph, b, c), None);
    }

    #[test]
    fn test_execution_cycle_terminates() {
        let db = TypeDatabase::standard();
        let env = DefinitionEnv::new(&db);
        let mut graph = Graph::new("Test");
        let a = graph.spawn_node(NodeKind::Stack, [0.0, 0.0], &env).unwrap();
        let b = graph.spawn_node(NodeKind::Stack, [0.0, 0.0], &env).unwrap();
        graph.connect_by_name(a, "Out", b, "In").unwrap();
        graph.connect_by_name(b, "Out", a, "In").unwrap();

        assert_eq!(find_common_descendant(&graph, a, b), Some(a));
        assert_eq!(find_common_descendant(&graph, b, a), Some(a));
    }
}
