//! Node identifier for dependency graphs.
//!
//! Schedule nodes live in a dense arena owned by the dependency graph of one
//! basic block. [`NodeId`] is the strongly-typed index into that arena, which
//! keeps node indices from being confused with instruction positions,
//! register numbers or cycle counts.

use std::fmt;

/// A strongly-typed index of a node within a dependency graph.
///
/// The builder creates exactly one node per instruction, in program order,
/// so for graphs produced by [`DependencyGraphBuilder`](crate::schedule::DependencyGraphBuilder)
/// `NodeId::new(i)` is the node of the `i`-th instruction of the block.
///
/// # Examples
///
/// ```rust
/// use gensched::utils::graph::NodeId;
///
/// let node = NodeId::new(3);
/// assert_eq!(node.index(), 3);
/// assert_eq!(format!("{node}"), "n3");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Creates a new `NodeId` from a raw arena index.
    #[must_use]
    #[inline]
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    /// Returns the raw arena index, suitable for indexing per-node vectors.
    #[must_use]
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl From<usize> for NodeId {
    #[inline]
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl From<NodeId> for usize {
    #[inline]
    fn from(node: NodeId) -> Self {
        node.0
    }
}
