//! Dependency graph module.
//!
//! Provides the `DependencyGraph` type, which records what every cached
//! attribute value was computed from. Mutations of a fit start an
//! invalidation sweep at the node they change; every value reachable from
//! it is stale.

use crate::affector::{DomainKey, TargetKey};
use crate::ids::{AttrId, AttrNode, HolderId};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use std::collections::BTreeSet;

/// A node of the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DepNode {
    /// A cached attribute value.
    Attr(AttrNode),
    /// "Whatever is registered under this key for this attribute".
    ///
    /// A value depends on the reach nodes of every key its holder answers
    /// to; enabling or disabling an affector starts a sweep at the reach
    /// node it is registered under.
    Reach(TargetKey, AttrId),
}

impl From<AttrNode> for DepNode {
    fn from(node: AttrNode) -> Self {
        DepNode::Attr(node)
    }
}

/// A directed graph of attribute dependencies.
///
/// Edges point from a dependency to its dependent, so the values to drop
/// after a change are exactly the nodes reachable from the changed node.
/// An `Attr` node exists exactly as long as its value is cached.
///
/// # Examples
///
/// ```rust
/// use fitcalc::graph::{DependencyGraph, DepNode};
/// use fitcalc::{AttrId, AttrNode, HolderId};
///
/// let mut graph = DependencyGraph::new();
/// let grid = AttrNode::new(HolderId(1), AttrId(11));
/// let used = AttrNode::new(HolderId(2), AttrId(30));
///
/// // `used` was computed from `grid`
/// graph.record(grid, &[]);
/// graph.record(used, &[DepNode::Attr(grid)]);
///
/// let stale = graph.invalidate(DepNode::Attr(grid));
/// assert_eq!(stale, vec![grid, used]);
/// assert_eq!(graph.node_count(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraphMap<DepNode, ()>,
}

impl DependencyGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            graph: DiGraphMap::new(),
        }
    }

    /// Record a freshly cached value and what it was computed from.
    ///
    /// Dependencies are added as nodes when missing.
    pub fn record(&mut self, node: AttrNode, deps: &[DepNode]) {
        let target = self.graph.add_node(DepNode::Attr(node));
        for dep in deps {
            self.graph.add_edge(*dep, target, ());
        }
    }

    /// Remove `start` and everything that transitively depends on it.
    ///
    /// Uses depth-first search along dependent edges. Returns the removed
    /// attribute nodes in ascending order; the caller drops them from the
    /// holders' caches. Reach nodes left without dependents are pruned.
    pub fn invalidate(&mut self, start: DepNode) -> Vec<AttrNode> {
        if !self.graph.contains_node(start) {
            return Vec::new();
        }

        let mut visited = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            for dependent in self.graph.neighbors_directed(node, Direction::Outgoing) {
                if !visited.contains(&dependent) {
                    stack.push(dependent);
                }
            }
        }

        // reach nodes feeding the swept region may become orphans
        let mut candidates = BTreeSet::new();
        for node in &visited {
            for dep in self.graph.neighbors_directed(*node, Direction::Incoming) {
                if matches!(dep, DepNode::Reach(..)) && !visited.contains(&dep) {
                    candidates.insert(dep);
                }
            }
        }

        for node in &visited {
            self.graph.remove_node(*node);
        }
        for reach in candidates {
            if self
                .graph
                .neighbors_directed(reach, Direction::Outgoing)
                .next()
                .is_none()
            {
                self.graph.remove_node(reach);
            }
        }

        let stale: Vec<AttrNode> = visited
            .into_iter()
            .filter_map(|node| match node {
                DepNode::Attr(attr) => Some(attr),
                DepNode::Reach(..) => None,
            })
            .collect();
        tracing::trace!(?start, stale = stale.len(), "invalidation sweep");
        stale
    }

    /// Check if a node exists in the graph.
    pub fn contains(&self, node: DepNode) -> bool {
        self.graph.contains_node(node)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Nodes computed directly from `node`.
    pub fn dependents(&self, node: DepNode) -> Vec<DepNode> {
        self.neighbors(node, Direction::Outgoing)
    }

    /// Nodes `node` was computed directly from.
    pub fn dependencies(&self, node: DepNode) -> Vec<DepNode> {
        self.neighbors(node, Direction::Incoming)
    }

    /// Whether any node still refers to `holder`.
    pub fn references_holder(&self, holder: HolderId) -> bool {
        self.graph.nodes().any(|node| match node {
            DepNode::Attr(attr) => attr.holder == holder,
            DepNode::Reach(key, _) => key.domain == DomainKey::Holder(holder),
        })
    }

    fn neighbors(&self, node: DepNode, direction: Direction) -> Vec<DepNode> {
        if !self.graph.contains_node(node) {
            return Vec::new();
        }
        let mut nodes: Vec<DepNode> = self.graph.neighbors_directed(node, direction).collect();
        nodes.sort();
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affector::FilterKey;

    fn attr(holder: u64, attr: u32) -> AttrNode {
        AttrNode::new(HolderId(holder), AttrId(attr))
    }

    fn reach(attr: u32) -> DepNode {
        DepNode::Reach(TargetKey::new(DomainKey::All, FilterKey::Any), AttrId(attr))
    }

    #[test]
    fn test_record_adds_nodes_and_edges() {
        let mut graph = DependencyGraph::new();
        let a = attr(1, 10);
        let b = attr(2, 20);

        // B depends on A and on its reach node
        graph.record(a, &[]);
        graph.record(b, &[DepNode::Attr(a), reach(20)]);

        assert!(graph.contains(DepNode::Attr(a)));
        assert!(graph.contains(reach(20)));
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.dependents(DepNode::Attr(a)), vec![DepNode::Attr(b)]);
        assert_eq!(
            graph.dependencies(DepNode::Attr(b)),
            vec![DepNode::Attr(a), reach(20)]
        );
    }

    #[test]
    fn test_invalidate_chain() {
        let mut graph = DependencyGraph::new();
        let a = attr(1, 1);
        let b = attr(1, 2);
        let c = attr(1, 3);

        // A -> B -> C
        graph.record(a, &[]);
        graph.record(b, &[DepNode::Attr(a)]);
        graph.record(c, &[DepNode::Attr(b)]);

        let stale = graph.invalidate(DepNode::Attr(b));
        assert_eq!(stale, vec![b, c]);
        assert!(graph.contains(DepNode::Attr(a)));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_invalidate_leaves_unrelated_values() {
        let mut graph = DependencyGraph::new();
        let a = attr(1, 1);
        let b = attr(2, 1);
        let unrelated = attr(3, 1);

        graph.record(a, &[]);
        graph.record(b, &[DepNode::Attr(a)]);
        graph.record(unrelated, &[reach(1)]);

        let stale = graph.invalidate(DepNode::Attr(a));
        assert_eq!(stale, vec![a, b]);
        assert!(graph.contains(DepNode::Attr(unrelated)));
        assert!(graph.contains(reach(1)));
    }

    #[test]
    fn test_invalidate_diamond() {
        let mut graph = DependencyGraph::new();
        let base = attr(1, 1);
        let left = attr(2, 1);
        let right = attr(3, 1);
        let top = attr(4, 1);

        // Both LEFT and RIGHT depend on BASE, TOP depends on both
        graph.record(base, &[]);
        graph.record(left, &[DepNode::Attr(base)]);
        graph.record(right, &[DepNode::Attr(base)]);
        graph.record(top, &[DepNode::Attr(left), DepNode::Attr(right)]);

        let stale = graph.invalidate(DepNode::Attr(base));
        assert_eq!(stale, vec![base, left, right, top]);
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_invalidate_from_reach() {
        let mut graph = DependencyGraph::new();
        let a = attr(1, 7);
        let b = attr(2, 7);
        graph.record(a, &[reach(7)]);
        graph.record(b, &[DepNode::Attr(a)]);

        let stale = graph.invalidate(reach(7));
        assert_eq!(stale, vec![a, b]);
        assert!(!graph.contains(reach(7)));
    }

    #[test]
    fn test_orphaned_reach_nodes_are_pruned() {
        let mut graph = DependencyGraph::new();
        let a = attr(1, 7);
        let b = attr(2, 7);
        graph.record(a, &[reach(7)]);
        graph.record(b, &[reach(7), reach(8)]);

        graph.invalidate(DepNode::Attr(b));
        // reach(7) still feeds A, reach(8) fed only B
        assert!(graph.contains(reach(7)));
        assert!(!graph.contains(reach(8)));

        graph.invalidate(DepNode::Attr(a));
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_invalidate_missing_node() {
        let mut graph = DependencyGraph::new();
        assert!(graph.invalidate(DepNode::Attr(attr(9, 9))).is_empty());
        assert!(graph.invalidate(reach(9)).is_empty());
    }

    #[test]
    fn test_record_twice_is_idempotent() {
        let mut graph = DependencyGraph::new();
        let a = attr(1, 1);
        graph.record(a, &[reach(1)]);
        graph.record(a, &[reach(1)]);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn test_references_holder() {
        let mut graph = DependencyGraph::new();
        let own = DepNode::Reach(
            TargetKey::new(DomainKey::Holder(HolderId(5)), FilterKey::Any),
            AttrId(1),
        );
        graph.record(attr(2, 1), &[own]);

        assert!(graph.references_holder(HolderId(2)));
        assert!(graph.references_holder(HolderId(5)));
        assert!(!graph.references_holder(HolderId(3)));
    }
}
