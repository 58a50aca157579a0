use std::collections::BinaryHeap;

use hashbrown::HashMap;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use super::state::State;
use crate::Meters;
use crate::model::RoadGraph;

/// Node sequence and traversed edges of one shortest path
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TracedPath {
    pub(crate) cost: Meters,
    pub(crate) nodes: Vec<NodeIndex>,
    pub(crate) edges: Vec<EdgeIndex>,
}

/// Distances and predecessor edges from one start node
#[derive(Debug, Clone)]
pub(crate) struct ShortestPathTree {
    start: NodeIndex,
    distances: HashMap<NodeIndex, Meters>,
    predecessors: HashMap<NodeIndex, (NodeIndex, EdgeIndex)>,
}

impl ShortestPathTree {
    pub(crate) fn distance(&self, node: NodeIndex) -> Option<Meters> {
        self.distances.get(&node).copied()
    }

    /// Walks predecessors back from `target`; `None` if it was never reached
    pub(crate) fn path_to(&self, target: NodeIndex) -> Option<TracedPath> {
        let cost = self.distance(target)?;

        let mut nodes = vec![target];
        let mut edges = Vec::new();
        let mut current = target;
        while current != self.start {
            let &(prev, edge) = self.predecessors.get(&current)?;
            nodes.push(prev);
            edges.push(edge);
            current = prev;
        }
        nodes.reverse();
        edges.reverse();

        Some(TracedPath { cost, nodes, edges })
    }
}

/// Dijkstra's algorithm over the undirected road graph
///
/// Every edge is traversable in both directions. With a `target` the search
/// stops as soon as that node is settled. Equal tentative costs are settled in
/// node id order and a predecessor only changes on a strictly shorter path,
/// so repeated searches on the same graph return the same tree.
pub(crate) fn shortest_path_tree(
    graph: &RoadGraph,
    start: NodeIndex,
    target: Option<NodeIndex>,
) -> ShortestPathTree {
    let estimated_nodes = graph.node_count().min(1000);
    let mut distances: HashMap<NodeIndex, Meters> = HashMap::with_capacity(estimated_nodes);
    let mut predecessors: HashMap<NodeIndex, (NodeIndex, EdgeIndex)> =
        HashMap::with_capacity(estimated_nodes);
    let mut heap = BinaryHeap::with_capacity(estimated_nodes / 4);

    heap.push(State {
        cost: 0.0,
        id: graph.node(start).id,
        node: start,
    });
    distances.insert(start, 0.0);

    while let Some(State { cost, node, .. }) = heap.pop() {
        if target == Some(node) {
            break;
        }

        // Stale heap entry
        if let Some(&best) = distances.get(&node) {
            if cost > best {
                continue;
            }
        }

        for edge in graph.graph.edges(node) {
            let next = if edge.source() == node {
                edge.target()
            } else {
                edge.source()
            };
            let next_cost = cost + edge.weight().weight;

            match distances.entry(next) {
                hashbrown::hash_map::Entry::Vacant(entry) => {
                    entry.insert(next_cost);
                }
                hashbrown::hash_map::Entry::Occupied(mut entry) => {
                    if next_cost < *entry.get() {
                        *entry.get_mut() = next_cost;
                    } else {
                        continue;
                    }
                }
            }
            predecessors.insert(next, (node, edge.id()));
            heap.push(State {
                cost: next_cost,
                id: graph.node(next).id,
                node: next,
            });
        }
    }

    ShortestPathTree {
        start,
        distances,
        predecessors,
    }
}

/// Shortest path between two nodes, `None` if they are not connected
pub(crate) fn shortest_path(
    graph: &RoadGraph,
    start: NodeIndex,
    target: NodeIndex,
) -> Option<TracedPath> {
    shortest_path_tree(graph, start, Some(target)).path_to(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, GraphData, Node};
    use geo::coord;

    fn line(source_id: u64, target_id: u64, weight: f64) -> Edge {
        Edge {
            source_id,
            target_id,
            weight,
            geometry: vec![[0.0, 0.0], [0.0, 0.0]],
        }
    }

    /// 1 - 2 - 4 and 1 - 3 - 4 with equal total cost, plus an island 5 - 6
    fn diamond() -> RoadGraph {
        let nodes = (1..=6)
            .map(|id| Node::new(id, None, coord! { x: id as f64 * 0.01, y: 0.0 }))
            .collect();
        let edges = vec![
            line(1, 3, 5.0),
            line(3, 4, 5.0),
            line(1, 2, 5.0),
            line(4, 2, 5.0),
            line(5, 6, 1.0),
        ];
        RoadGraph::from_data(&GraphData { nodes, edges }).unwrap()
    }

    fn idx(graph: &RoadGraph, id: u64) -> NodeIndex {
        graph.index_of(id).unwrap()
    }

    #[test]
    fn finds_path_against_stored_direction() {
        let graph = diamond();
        let path = shortest_path(&graph, idx(&graph, 4), idx(&graph, 1)).unwrap();
        assert_eq!(path.cost, 10.0);
        assert_eq!(path.edges.len(), 2);
    }

    #[test]
    fn equal_cost_paths_resolve_deterministically() {
        let graph = diamond();
        let first = shortest_path(&graph, idx(&graph, 1), idx(&graph, 4)).unwrap();
        for _ in 0..10 {
            assert_eq!(
                shortest_path(&graph, idx(&graph, 1), idx(&graph, 4)).unwrap(),
                first
            );
        }
        // node 2 is settled before node 3, so it claims node 4 first
        let ids: Vec<u64> = first.nodes.iter().map(|&n| graph.node(n).id).collect();
        assert_eq!(ids, vec![1, 2, 4]);
    }

    #[test]
    fn disconnected_nodes_have_no_path() {
        let graph = diamond();
        assert!(shortest_path(&graph, idx(&graph, 1), idx(&graph, 6)).is_none());
    }

    #[test]
    fn path_to_start_is_empty() {
        let graph = diamond();
        let path = shortest_path(&graph, idx(&graph, 3), idx(&graph, 3)).unwrap();
        assert_eq!(path.cost, 0.0);
        assert!(path.edges.is_empty());
        assert_eq!(path.nodes, vec![idx(&graph, 3)]);
    }

    #[test]
    fn tree_reaches_whole_component() {
        let graph = diamond();
        let tree = shortest_path_tree(&graph, idx(&graph, 1), None);
        assert_eq!(tree.distance(idx(&graph, 4)), Some(10.0));
        assert_eq!(tree.distance(idx(&graph, 5)), None);
    }
}
