//! Cycle detection for directed graphs.
//!
//! A dependency graph handed to the scheduler must be acyclic. These helpers
//! locate an offending cycle so it can be reported in the error that aborts
//! the block.

use crate::utils::graph::{NodeId, Successors};

/// Checks whether a cycle is reachable from `start`.
///
/// # Arguments
///
/// * `graph` - The graph to check for cycles
/// * `start` - The starting node for the search
///
/// # Returns
///
/// `true` if a cycle is found, `false` otherwise (including when `start` is
/// not a node of the graph).
#[must_use]
pub fn has_cycle<G: Successors>(graph: &G, start: NodeId) -> bool {
    find_cycle(graph, start).is_some()
}

/// Finds a cycle reachable from `start`, if one exists.
///
/// The search is an explicit-stack depth-first walk, so arbitrarily long
/// dependency chains cannot overflow the call stack.
///
/// # Arguments
///
/// * `graph` - The graph to search for cycles
/// * `start` - The starting node for the search
///
/// # Returns
///
/// `Some(path)` where the path starts and ends with the same node, or `None`
/// if no cycle is reachable from `start`.
///
/// # Complexity
///
/// - Time: O(V + E)
/// - Space: O(V)
#[must_use]
pub fn find_cycle<G: Successors>(graph: &G, start: NodeId) -> Option<Vec<NodeId>> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return None;
    }

    let mut visited = vec![false; node_count];
    let mut in_stack = vec![false; node_count];
    search_from(graph, start, &mut visited, &mut in_stack)
}

/// Finds a cycle anywhere in the graph, trying every node as a start.
///
/// Nodes already explored from an earlier start are skipped, keeping the
/// whole search linear.
#[must_use]
pub fn find_any_cycle<G: Successors>(graph: &G) -> Option<Vec<NodeId>> {
    let node_count = graph.node_count();
    let mut visited = vec![false; node_count];
    let mut in_stack = vec![false; node_count];

    for node in graph.node_ids() {
        if visited[node.index()] {
            continue;
        }
        if let Some(cycle) = search_from(graph, node, &mut visited, &mut in_stack) {
            return Some(cycle);
        }
    }
    None
}

fn search_from<G: Successors>(
    graph: &G,
    start: NodeId,
    visited: &mut [bool],
    in_stack: &mut [bool],
) -> Option<Vec<NodeId>> {
    // Each frame holds the node and its not-yet-visited successors.
    let mut stack: Vec<(NodeId, Vec<NodeId>)> = Vec::new();
    let mut path: Vec<NodeId> = Vec::new();

    visited[start.index()] = true;
    in_stack[start.index()] = true;
    path.push(start);
    stack.push((start, graph.successors(start).collect()));

    while let Some((node, pending)) = stack.last_mut() {
        let Some(next) = pending.pop() else {
            in_stack[node.index()] = false;
            stack.pop();
            path.pop();
            continue;
        };

        if in_stack[next.index()] {
            let cycle_start = path.iter().position(|&n| n == next)?;
            let mut cycle = path[cycle_start..].to_vec();
            cycle.push(next);
            return Some(cycle);
        }
        if visited[next.index()] {
            continue;
        }

        visited[next.index()] = true;
        in_stack[next.index()] = true;
        path.push(next);
        stack.push((next, graph.successors(next).collect()));
    }

    None
}

#[cfg(test)]
mod tests {
    use crate::utils::graph::{
        algorithms::cycles::{find_any_cycle, find_cycle, has_cycle},
        traits::tests::EdgeListGraph,
        NodeId,
    };

    #[test]
    fn test_linear_graph_has_no_cycle() {
        let graph = EdgeListGraph::new(3, &[(0, 1), (1, 2)]);
        assert!(!has_cycle(&graph, NodeId::new(0)));
        assert!(find_any_cycle(&graph).is_none());
    }

    #[test]
    fn test_diamond_has_no_cycle() {
        let graph = EdgeListGraph::new(4, &[(0, 1), (0, 2), (1, 3), (2, 3)]);
        assert!(find_cycle(&graph, NodeId::new(0)).is_none());
    }

    #[test]
    fn test_find_cycle_returns_closed_path() {
        let graph = EdgeListGraph::new(3, &[(0, 1), (1, 2), (2, 0)]);
        let cycle = find_cycle(&graph, NodeId::new(0)).expect("cycle expected");

        assert_eq!(cycle.len(), 4);
        assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn test_self_loop() {
        let graph = EdgeListGraph::new(2, &[(1, 1)]);
        assert!(!has_cycle(&graph, NodeId::new(0)));
        let cycle = find_any_cycle(&graph).expect("self loop");
        assert_eq!(cycle, vec![NodeId::new(1), NodeId::new(1)]);
    }

    #[test]
    fn test_cycle_not_reachable_from_start() {
        let graph = EdgeListGraph::new(4, &[(0, 1), (2, 3), (3, 2)]);
        assert!(!has_cycle(&graph, NodeId::new(0)));
        assert!(find_any_cycle(&graph).is_some());
    }

    #[test]
    fn test_out_of_range_start() {
        let graph = EdgeListGraph::new(1, &[]);
        assert!(find_cycle(&graph, NodeId::new(5)).is_none());
    }
}
