//! Trait definitions for graph abstractions.
//!
//! Graph algorithms in [`algorithms`](super::algorithms) are written against
//! these traits rather than a concrete type, so the same topological sort and
//! cycle search serve the dependency graph in both of its orientations and
//! the small ad-hoc graphs used in tests.
//!
//! - [`GraphBase`] - node count and node iteration
//! - [`Successors`] - outgoing adjacency
//! - [`Predecessors`] - incoming adjacency

use crate::utils::graph::NodeId;

/// Base trait providing core graph properties.
pub trait GraphBase {
    /// Returns the number of nodes in the graph.
    fn node_count(&self) -> usize;

    /// Returns an iterator over all node identifiers, in ascending order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Trait for graphs that support forward edge traversal.
pub trait Successors: GraphBase {
    /// Returns an iterator over the targets of edges leaving `node`.
    ///
    /// # Panics
    ///
    /// May panic if `node` is not a valid node in the graph.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Trait for graphs that support backward edge traversal.
pub trait Predecessors: GraphBase {
    /// Returns an iterator over the sources of edges entering `node`.
    ///
    /// # Panics
    ///
    /// May panic if `node` is not a valid node in the graph.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A minimal edge-list graph for exercising the algorithms.
    pub(crate) struct EdgeListGraph {
        node_count: usize,
        edges: Vec<(NodeId, NodeId)>,
    }

    impl EdgeListGraph {
        pub(crate) fn new(node_count: usize, edges: &[(usize, usize)]) -> Self {
            EdgeListGraph {
                node_count,
                edges: edges
                    .iter()
                    .map(|&(a, b)| (NodeId::new(a), NodeId::new(b)))
                    .collect(),
            }
        }
    }

    impl GraphBase for EdgeListGraph {
        fn node_count(&self) -> usize {
            self.node_count
        }

        fn node_ids(&self) -> impl Iterator<Item = NodeId> {
            (0..self.node_count).map(NodeId::new)
        }
    }

    impl Successors for EdgeListGraph {
        fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
            self.edges
                .iter()
                .filter(move |(src, _)| *src == node)
                .map(|(_, dst)| *dst)
        }
    }

    impl Predecessors for EdgeListGraph {
        fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
            self.edges
                .iter()
                .filter(move |(_, dst)| *dst == node)
                .map(|(src, _)| *src)
        }
    }

    #[test]
    fn test_edge_list_adjacency() {
        let graph = EdgeListGraph::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);

        assert_eq!(graph.node_count(), 4);
        let succ: Vec<NodeId> = graph.successors(NodeId::new(0)).collect();
        assert_eq!(succ, vec![NodeId::new(1), NodeId::new(2)]);
        let pred: Vec<NodeId> = graph.predecessors(NodeId::new(3)).collect();
        assert_eq!(pred, vec![NodeId::new(1), NodeId::new(2)]);
        assert!(graph.predecessors(NodeId::new(0)).next().is_none());
    }
}
