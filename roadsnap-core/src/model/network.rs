//! In-memory road network used at query time

use geo::{Coord, LineString, Point};
use hashbrown::HashMap;
use log::warn;
use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use rstar::{RTree, primitives::GeomWithData};

use super::{Edge, GraphData, Node};
use crate::geodesy::{haversine, pick_nearest, search_envelope};
use crate::{Error, Meters, NodeId};

/// Road graph node
#[derive(Debug, Clone)]
pub struct RoadNode {
    pub id: NodeId,
    pub label: Option<String>,
    pub geometry: Point<f64>,
}

/// Road graph edge (one original line)
#[derive(Debug, Clone)]
pub struct RoadEdge {
    /// Node the stored geometry starts at
    pub source: NodeId,
    pub target: NodeId,
    pub weight: Meters,
    pub geometry: LineString<f64>,
}

/// Node position in the R-tree, `[lon, lat]`
pub type IndexedPoint = GeomWithData<[f64; 2], NodeIndex>;

/// Immutable adjacency structure with a spatial index over its nodes
#[derive(Debug, Clone)]
pub struct RoadGraph {
    pub graph: UnGraph<RoadNode, RoadEdge>,
    node_index: HashMap<NodeId, NodeIndex>,
    rtree: RTree<IndexedPoint>,
}

impl RoadGraph {
    /// Builds the adjacency structure from persisted records
    ///
    /// Nodes are inserted in id order and edges in stored order, so the same
    /// `GraphData` always yields the same graph and the same search order.
    ///
    /// # Errors
    ///
    /// Returns an error if an edge references a node that does not exist or
    /// carries an invalid weight.
    pub fn from_data(data: &GraphData) -> Result<Self, Error> {
        let mut nodes: Vec<&Node> = data.nodes.iter().collect();
        nodes.sort_unstable_by_key(|node| node.id);

        let mut graph = UnGraph::with_capacity(nodes.len(), data.edges.len());
        let mut node_index = HashMap::with_capacity(nodes.len());

        for node in nodes {
            let idx = graph.add_node(RoadNode {
                id: node.id,
                label: node.label.clone(),
                geometry: Point::from(node.coord()),
            });
            if node_index.insert(node.id, idx).is_some() {
                return Err(Error::InvalidData(format!("Duplicate node id {}", node.id)));
            }
        }

        for (position, edge) in data.edges.iter().enumerate() {
            let source = *node_index
                .get(&edge.source_id)
                .ok_or(Error::UnknownNode(edge.source_id))?;
            let target = *node_index
                .get(&edge.target_id)
                .ok_or(Error::UnknownNode(edge.target_id))?;

            if !edge.weight.is_finite() || edge.weight < 0.0 {
                return Err(Error::InvalidData(format!(
                    "Edge {position} has invalid weight {}",
                    edge.weight
                )));
            }
            if source == target {
                warn!("Ignoring stored self-loop edge {position} at node {}", edge.source_id);
                continue;
            }

            graph.add_edge(
                source,
                target,
                RoadEdge {
                    source: edge.source_id,
                    target: edge.target_id,
                    weight: edge.weight,
                    geometry: LineString::new(edge.coords()),
                },
            );
        }

        let points = graph
            .node_indices()
            .map(|idx| {
                let point = graph[idx].geometry;
                IndexedPoint::new([point.x(), point.y()], idx)
            })
            .collect();

        Ok(Self {
            graph,
            node_index,
            rtree: RTree::bulk_load(points),
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn node(&self, idx: NodeIndex) -> &RoadNode {
        &self.graph[idx]
    }

    pub fn edge(&self, idx: EdgeIndex) -> &RoadEdge {
        &self.graph[idx]
    }

    pub fn index_of(&self, id: NodeId) -> Option<NodeIndex> {
        self.node_index.get(&id).copied()
    }

    /// Nearest node by great-circle distance, with no distance limit
    ///
    /// The R-tree works in planar degrees, so its nearest neighbour is only a
    /// seed: every node inside the envelope of that seed's geodesic distance
    /// is then compared exactly, and equal distances go to the lowest id.
    pub fn nearest_node(&self, coord: Coord<f64>) -> Option<(NodeIndex, Meters)> {
        let seed = self.rtree.nearest_neighbor(&[coord.x, coord.y])?;
        let seed_distance = haversine(coord, self.graph[seed.data].geometry.into());

        let envelope = search_envelope(coord, seed_distance);
        let (id, distance) = pick_nearest(self.rtree.locate_in_envelope(&envelope).map(|point| {
            let node = &self.graph[point.data];
            (node.id, haversine(coord, node.geometry.into()))
        }))?;

        self.index_of(id).map(|idx| (idx, distance))
    }

    /// Persisted records for the nodes of this graph, in id order
    pub fn nodes(&self) -> impl Iterator<Item = Node> + '_ {
        self.graph.node_weights().map(|node| {
            Node::new(node.id, node.label.clone(), node.geometry.into())
        })
    }

    /// Persisted records for the edges of this graph, in stored order
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.graph.edge_weights().map(|edge| {
            Edge::new(edge.source, edge.target, edge.weight, &edge.geometry.0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    fn node(id: NodeId, lat: f64, lon: f64) -> Node {
        Node::new(id, None, coord! { x: lon, y: lat })
    }

    fn sample() -> GraphData {
        GraphData {
            nodes: vec![
                node(3, 0.1485, 117.4635),
                node(1, 0.1347, 117.498),
                node(2, 0.1277, 117.480),
            ],
            edges: vec![Edge {
                source_id: 1,
                target_id: 2,
                weight: 2_100.0,
                geometry: vec![[117.498, 0.1347], [117.480, 0.1277]],
            }],
        }
    }

    #[test]
    fn nodes_are_indexed_in_id_order() {
        let graph = RoadGraph::from_data(&sample()).unwrap();
        let ids: Vec<NodeId> = graph.nodes().map(|n| n.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn edges_round_trip_to_records() {
        let data = sample();
        let graph = RoadGraph::from_data(&data).unwrap();
        let edges: Vec<Edge> = graph.edges().collect();
        assert_eq!(edges, data.edges);
    }

    #[test]
    fn nearest_node_uses_geodesic_distance() {
        let graph = RoadGraph::from_data(&sample()).unwrap();
        let (idx, distance) = graph
            .nearest_node(coord! { x: 117.4801, y: 0.1278 })
            .unwrap();
        assert_eq!(graph.node(idx).id, 2);
        assert!(distance < 20.0);
    }

    #[test]
    fn nearest_node_breaks_ties_by_lowest_id() {
        let data = GraphData {
            nodes: vec![node(9, 0.0, 0.001), node(4, 0.0, -0.001)],
            edges: vec![],
        };
        let graph = RoadGraph::from_data(&data).unwrap();
        let (idx, _) = graph.nearest_node(coord! { x: 0.0, y: 0.0 }).unwrap();
        assert_eq!(graph.node(idx).id, 4);
    }

    #[test]
    fn empty_graph_has_no_nearest_node() {
        let graph = RoadGraph::from_data(&GraphData::default()).unwrap();
        assert!(graph.is_empty());
        assert!(graph.nearest_node(coord! { x: 0.0, y: 0.0 }).is_none());
    }

    #[test]
    fn rejects_edges_to_unknown_nodes() {
        let mut data = sample();
        data.edges[0].target_id = 42;
        assert!(matches!(
            RoadGraph::from_data(&data),
            Err(Error::UnknownNode(42))
        ));
    }
}
