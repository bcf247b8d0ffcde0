//! Topological ordering of dependency graphs.
//!
//! Kahn's algorithm, used by the dependency graph to order the critical-path
//! (delay) computation and to reject cyclic graphs before scheduling starts.

use std::collections::VecDeque;

use crate::utils::graph::{GraphBase, NodeId, Predecessors, Successors};

/// Computes a topological ordering of all nodes of `graph`.
///
/// Nodes with no incoming edges are processed in ascending [`NodeId`] order,
/// so for a dependency graph built in program order the result is stable
/// across runs.
///
/// # Arguments
///
/// * `graph` - The graph to sort topologically
///
/// # Returns
///
/// `Some(order)` if the graph is acyclic, `None` if it contains a cycle.
///
/// # Complexity
///
/// - Time: O(V + E)
/// - Space: O(V) for the in-degree counts and queue
///
/// # Examples
///
/// ```rust,ignore
/// use gensched::utils::graph::algorithms::topological_sort;
///
/// // graph: n0 -> n1 -> n2
/// let order = topological_sort(&graph).unwrap();
/// assert_eq!(order, vec![NodeId::new(0), NodeId::new(1), NodeId::new(2)]);
/// ```
pub fn topological_sort<G>(graph: &G) -> Option<Vec<NodeId>>
where
    G: GraphBase + Successors + Predecessors,
{
    let node_count = graph.node_count();
    if node_count == 0 {
        return Some(Vec::new());
    }

    let mut in_degree: Vec<usize> = vec![0; node_count];
    for node in graph.node_ids() {
        in_degree[node.index()] = graph.predecessors(node).count();
    }

    let mut queue: VecDeque<NodeId> = graph
        .node_ids()
        .filter(|node| in_degree[node.index()] == 0)
        .collect();

    let mut result = Vec::with_capacity(node_count);
    while let Some(node) = queue.pop_front() {
        result.push(node);

        for successor in graph.successors(node) {
            let degree = &mut in_degree[successor.index()];
            *degree -= 1;
            if *degree == 0 {
                queue.push_back(successor);
            }
        }
    }

    if result.len() == node_count {
        Some(result)
    } else {
        None
    }
}
