//! Dependency graph of one basic block.
//!
//! Nodes live in a dense arena indexed by [`NodeId`]; node `i` wraps the
//! `i`-th instruction of the block. Every edge is stored twice, once in the
//! source's child list and once in the target's parent list, so the
//! scheduler can walk the graph in either direction without rebuilding it.
//! An edge `from → to` always means "`from` must issue before `to`".
//!
//! An index from node pair to list positions keeps edge lookup and merging
//! constant-time regardless of node degree.

use std::{collections::HashMap, fmt::Write as _};

use crate::{
    ir::Instruction,
    schedule::{Direction, Latency},
    utils::{
        escape_dot,
        graph::{
            algorithms::{find_any_cycle, topological_sort},
            GraphBase, NodeId, Predecessors, Successors,
        },
    },
    Error, Result,
};

/// A weighted scheduling constraint between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyEdge {
    /// Node that must issue first
    pub from: NodeId,
    /// Node that depends on `from`
    pub to: NodeId,
    /// Minimum logical distance in cycles
    pub latency: u32,
    /// Minimum physical distance in cycles
    pub physical_latency: u32,
}

impl DependencyEdge {
    /// Returns the latency for the selected clock.
    #[must_use]
    pub const fn latency_for(&self, physical: bool) -> u32 {
        if physical {
            self.physical_latency
        } else {
            self.latency
        }
    }
}

/// One instruction in the dependency graph.
#[derive(Debug, Clone)]
pub struct ScheduleNode<'a> {
    inst: &'a Instruction,
    children: Vec<DependencyEdge>,
    parents: Vec<DependencyEdge>,
    issue_cycles: u32,
    latency: Latency,
    delay: u32,
}

impl<'a> ScheduleNode<'a> {
    /// The wrapped instruction.
    #[must_use]
    pub fn instruction(&self) -> &'a Instruction {
        self.inst
    }

    /// Edges to nodes that must issue after this one.
    #[must_use]
    pub fn children(&self) -> &[DependencyEdge] {
        &self.children
    }

    /// Edges from nodes that must issue before this one.
    #[must_use]
    pub fn parents(&self) -> &[DependencyEdge] {
        &self.parents
    }

    /// Edges leading away from this node when scheduling in `direction`.
    #[must_use]
    pub fn outgoing(&self, direction: Direction) -> &[DependencyEdge] {
        match direction {
            Direction::TopDown => &self.children,
            Direction::BottomUp => &self.parents,
        }
    }

    /// Number of edges blocking this node when scheduling in `direction`.
    #[must_use]
    pub fn blocking_count(&self, direction: Direction) -> usize {
        match direction {
            Direction::TopDown => self.parents.len(),
            Direction::BottomUp => self.children.len(),
        }
    }

    /// Cycles needed to dispatch the instruction.
    #[must_use]
    pub fn issue_cycles(&self) -> u32 {
        self.issue_cycles
    }

    /// Logical and physical result latency.
    #[must_use]
    pub fn latency(&self) -> Latency {
        self.latency
    }

    /// Critical-path length from this node to the end of the schedule.
    #[must_use]
    pub fn delay(&self) -> u32 {
        self.delay
    }
}

/// Positions of one edge in its source's child list and its target's
/// parent list.
#[derive(Debug, Clone, Copy)]
struct EdgeSlot {
    child: usize,
    parent: usize,
}

/// Arena of schedule nodes with bidirectional weighted edges.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph<'a> {
    nodes: Vec<ScheduleNode<'a>>,
    index: HashMap<(NodeId, NodeId), EdgeSlot>,
}

impl<'a> DependencyGraph<'a> {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        DependencyGraph {
            nodes: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Creates a graph with capacity for `nodes` nodes.
    #[must_use]
    pub fn with_capacity(nodes: usize) -> Self {
        DependencyGraph {
            nodes: Vec::with_capacity(nodes),
            index: HashMap::with_capacity(nodes * 2),
        }
    }

    /// Adds a node for `inst` and returns its id.
    pub fn add_node(&mut self, inst: &'a Instruction, issue_cycles: u32, latency: Latency) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(ScheduleNode {
            inst,
            children: Vec::new(),
            parents: Vec::new(),
            issue_cycles,
            latency,
            delay: 0,
        });
        id
    }

    /// Returns the number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the number of distinct edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.index.len()
    }

    /// Returns the node `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a node of this graph.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &ScheduleNode<'a> {
        &self.nodes[id.index()]
    }

    /// Returns all nodes in program order.
    #[must_use]
    pub fn nodes(&self) -> &[ScheduleNode<'a>] {
        &self.nodes
    }

    /// Returns an iterator over all edges, grouped by source node.
    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> {
        self.nodes.iter().flat_map(|n| n.children.iter())
    }

    /// Returns the edge `from → to`, if present.
    #[must_use]
    pub fn edge(&self, from: NodeId, to: NodeId) -> Option<&DependencyEdge> {
        let slot = self.index.get(&(from, to))?;
        self.nodes.get(from.index())?.children.get(slot.child)
    }

    /// Returns `true` if the edge `from → to` exists.
    #[must_use]
    pub fn has_edge(&self, from: NodeId, to: NodeId) -> bool {
        self.edge(from, to).is_some()
    }

    /// Adds the constraint "`from` issues at least `latency` cycles before
    /// `to`".
    ///
    /// A repeated edge is merged, keeping the larger latency of each clock.
    /// Edges may point in any direction; critical paths are not updated,
    /// call [`compute_delays`](Self::compute_delays) after editing a graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if either node does not exist.
    pub fn add_dependency(&mut self, from: NodeId, to: NodeId, latency: Latency) -> Result<()> {
        let len = self.nodes.len();
        if from.index() >= len || to.index() >= len {
            return Err(Error::GraphError(format!(
                "edge {from} -> {to} references a node outside the graph of {len}"
            )));
        }
        self.insert_edge(from, to, latency);
        Ok(())
    }

    /// Inserts or merges an edge between existing nodes.
    pub(crate) fn insert_edge(&mut self, from: NodeId, to: NodeId, latency: Latency) {
        if let Some(slot) = self.index.get(&(from, to)).copied() {
            Self::merge(&mut self.nodes[from.index()].children[slot.child], latency);
            Self::merge(&mut self.nodes[to.index()].parents[slot.parent], latency);
            return;
        }

        let edge = DependencyEdge {
            from,
            to,
            latency: latency.logical,
            physical_latency: latency.physical,
        };
        let slot = EdgeSlot {
            child: self.nodes[from.index()].children.len(),
            parent: self.nodes[to.index()].parents.len(),
        };
        self.nodes[from.index()].children.push(edge);
        self.nodes[to.index()].parents.push(edge);
        self.index.insert((from, to), slot);
    }

    fn merge(edge: &mut DependencyEdge, latency: Latency) {
        edge.latency = edge.latency.max(latency.logical);
        edge.physical_latency = edge.physical_latency.max(latency.physical);
    }

    /// Computes every node's critical-path delay for scheduling in
    /// `direction`.
    ///
    /// A node with no outgoing edges (in the scheduling direction) has a
    /// delay of its issue cycles; any other node takes the maximum of edge
    /// latency plus delay over its outgoing edges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] naming a cycle if the graph is not a
    /// DAG.
    pub fn compute_delays(&mut self, direction: Direction, physical: bool) -> Result<()> {
        let order = self.checked_topological_order()?;

        // Visit nodes so that every outgoing neighbour is finished first.
        let visit: Box<dyn Iterator<Item = &NodeId>> = match direction {
            Direction::TopDown => Box::new(order.iter().rev()),
            Direction::BottomUp => Box::new(order.iter()),
        };

        for &id in visit {
            let node = &self.nodes[id.index()];
            let outgoing = node.outgoing(direction);
            let delay = if outgoing.is_empty() {
                node.issue_cycles
            } else {
                outgoing
                    .iter()
                    .map(|edge| {
                        let next = match direction {
                            Direction::TopDown => edge.to,
                            Direction::BottomUp => edge.from,
                        };
                        edge.latency_for(physical) + self.nodes[next.index()].delay
                    })
                    .max()
                    .unwrap_or(0)
            };
            self.nodes[id.index()].delay = delay;
        }
        Ok(())
    }

    fn checked_topological_order(&self) -> Result<Vec<NodeId>> {
        topological_sort(self).ok_or_else(|| {
            let cycle = find_any_cycle(self)
                .map(|path| {
                    path.iter()
                        .map(NodeId::to_string)
                        .collect::<Vec<_>>()
                        .join(" -> ")
                })
                .unwrap_or_default();
            Error::GraphError(format!("dependency cycle: {cycle}"))
        })
    }

    /// Checks the structural invariants of the graph.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`] if child and parent lists disagree or
    /// the graph contains a cycle.
    pub fn verify(&self) -> Result<()> {
        let mut parent_edges = 0;
        for (index, node) in self.nodes.iter().enumerate() {
            let id = NodeId::new(index);
            for edge in &node.children {
                if edge.from != id {
                    return Err(Error::GraphError(format!(
                        "child edge {} -> {} stored on {id}",
                        edge.from, edge.to
                    )));
                }
                let mirrored = self
                    .index
                    .get(&(edge.from, edge.to))
                    .and_then(|slot| self.nodes.get(edge.to.index())?.parents.get(slot.parent))
                    == Some(edge);
                if !mirrored {
                    return Err(Error::GraphError(format!(
                        "edge {} -> {} missing from parent list",
                        edge.from, edge.to
                    )));
                }
            }
            parent_edges += node.parents.len();
        }
        if parent_edges != self.index.len() {
            return Err(Error::GraphError(format!(
                "{parent_edges} parent entries for {} edges",
                self.index.len()
            )));
        }
        self.checked_topological_order().map(|_| ())
    }

    /// Returns `true` if `order` lists every node exactly once and respects
    /// every edge.
    #[must_use]
    pub fn is_order_valid(&self, order: &[NodeId]) -> bool {
        if order.len() != self.nodes.len() {
            return false;
        }
        let mut position = vec![usize::MAX; self.nodes.len()];
        for (pos, id) in order.iter().enumerate() {
            match position.get_mut(id.index()) {
                Some(slot) if *slot == usize::MAX => *slot = pos,
                _ => return false,
            }
        }
        self.edges()
            .all(|e| position[e.from.index()] < position[e.to.index()])
    }

    /// Renders the graph in Graphviz DOT format.
    ///
    /// Edges are labelled `logical/physical` latency.
    #[must_use]
    pub fn dot(&self) -> String {
        let mut out = String::from("digraph dependencies {\n    node [shape=box];\n");
        for (index, node) in self.nodes.iter().enumerate() {
            let _ = writeln!(
                out,
                "    n{index} [label=\"{index}: {} (delay {})\"];",
                escape_dot(&node.inst.to_string()),
                node.delay
            );
        }
        for edge in self.edges() {
            let _ = writeln!(
                out,
                "    {} -> {} [label=\"{}/{}\"];",
                edge.from, edge.to, edge.latency, edge.physical_latency
            );
        }
        out.push_str("}\n");
        out
    }
}

impl GraphBase for DependencyGraph<'_> {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId::new)
    }
}

impl Successors for DependencyGraph<'_> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.nodes[node.index()].children.iter().map(|e| e.to)
    }
}

impl Predecessors for DependencyGraph<'_> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.nodes[node.index()].parents.iter().map(|e| e.from)
    }
}
