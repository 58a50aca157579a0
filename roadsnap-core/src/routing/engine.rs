//! Point-to-point routing over an immutable road graph

use geo::{Coord, coord};
use log::{debug, trace};
use petgraph::graph::NodeIndex;
use rayon::prelude::*;

use super::assembler::{RouteAssembler, RouteResult};
use super::dijkstra::{ShortestPathTree, TracedPath, shortest_path, shortest_path_tree};
use crate::geodesy::validate_coordinate;
use crate::model::{GraphData, RoadGraph};
use crate::{Error, Meters, NodeId};

/// One traversed edge, oriented in the direction of travel
#[derive(Debug, Clone, PartialEq)]
pub struct RouteLeg {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: Meters,
    /// Edge geometry running from `from` to `to`
    pub geometry: Vec<Coord<f64>>,
}

/// Raw routing outcome before it is shaped for clients
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePath {
    pub origin: Coord<f64>,
    pub destination: Coord<f64>,
    pub origin_node: NodeId,
    pub destination_node: NodeId,
    /// Position of the origin node, used when no edge is traversed
    pub origin_node_coord: Coord<f64>,
    /// Distance from the query origin to its snapped node
    pub snap_in: Meters,
    /// Distance from the snapped destination node to the query destination
    pub snap_out: Meters,
    pub nodes: Vec<NodeId>,
    pub legs: Vec<RouteLeg>,
}

impl RoutePath {
    pub fn network_distance(&self) -> Meters {
        self.legs.iter().map(|leg| leg.weight).sum()
    }

    pub fn total_distance(&self) -> Meters {
        self.snap_in + self.network_distance() + self.snap_out
    }
}

/// Query-time view of one graph snapshot
#[derive(Debug, Clone)]
pub struct RoutingEngine {
    graph: RoadGraph,
    assembler: RouteAssembler,
}

/// Origin or destination after snapping to the graph
#[derive(Debug, Clone, Copy)]
struct Snapped {
    query: Coord<f64>,
    node: NodeIndex,
    distance: Meters,
}

impl RoutingEngine {
    pub fn new(graph: RoadGraph, assembler: RouteAssembler) -> Self {
        Self { graph, assembler }
    }

    /// Builds the adjacency structure for a loaded node/edge set
    ///
    /// # Errors
    ///
    /// Returns an error if the records are inconsistent.
    pub fn from_data(data: &GraphData, assembler: RouteAssembler) -> Result<Self, Error> {
        Ok(Self::new(RoadGraph::from_data(data)?, assembler))
    }

    pub fn graph(&self) -> &RoadGraph {
        &self.graph
    }

    pub fn assembler(&self) -> &RouteAssembler {
        &self.assembler
    }

    /// Nearest graph node to a coordinate and the distance to it
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoGraph`] for an empty graph and
    /// [`Error::InvalidCoordinate`] for coordinates outside WGS84 bounds.
    pub fn nearest_node(&self, lat: f64, lon: f64) -> Result<(NodeId, Meters), Error> {
        let snapped = self.snap(lat, lon)?;
        Ok((self.graph.node(snapped.node).id, snapped.distance))
    }

    /// Shortest route between two arbitrary coordinates
    ///
    /// # Errors
    ///
    /// - [`Error::NoGraph`] if the graph has no nodes
    /// - [`Error::NoRoute`] if the snapped nodes lie in different components
    /// - [`Error::InvalidCoordinate`] for out-of-range input
    pub fn find_route(
        &self,
        origin_lat: f64,
        origin_lon: f64,
        dest_lat: f64,
        dest_lon: f64,
    ) -> Result<RouteResult, Error> {
        let path = self.find_path(origin_lat, origin_lon, dest_lat, dest_lon)?;
        Ok(self.assembler.assemble(&path))
    }

    /// Same as [`find_route`](Self::find_route), without shaping the result
    pub fn find_path(
        &self,
        origin_lat: f64,
        origin_lon: f64,
        dest_lat: f64,
        dest_lon: f64,
    ) -> Result<RoutePath, Error> {
        let origin = self.snap(origin_lat, origin_lon)?;
        let destination = self.snap(dest_lat, dest_lon)?;

        let traced = shortest_path(&self.graph, origin.node, destination.node)
            .ok_or_else(|| self.no_route(&origin, &destination))?;
        trace!(
            "Shortest path covers {} edges, {:.1}m",
            traced.edges.len(),
            traced.cost
        );

        Ok(self.route_path(&origin, &destination, traced))
    }

    /// Routes from one origin to many destinations
    ///
    /// A single search tree from the origin serves every destination; paths
    /// are assembled in parallel. Each destination gets its own result.
    ///
    /// # Errors
    ///
    /// Fails as a whole only if the origin cannot be snapped.
    pub fn find_routes_one_to_many(
        &self,
        origin_lat: f64,
        origin_lon: f64,
        destinations: &[(f64, f64)],
    ) -> Result<Vec<Result<RouteResult, Error>>, Error> {
        let origin = self.snap(origin_lat, origin_lon)?;
        let tree: ShortestPathTree = shortest_path_tree(&self.graph, origin.node, None);

        Ok(destinations
            .par_iter()
            .map(|&(lat, lon)| {
                let destination = self.snap(lat, lon)?;
                let traced = tree
                    .path_to(destination.node)
                    .ok_or_else(|| self.no_route(&origin, &destination))?;
                let path = self.route_path(&origin, &destination, traced);
                Ok(self.assembler.assemble(&path))
            })
            .collect())
    }

    fn snap(&self, lat: f64, lon: f64) -> Result<Snapped, Error> {
        validate_coordinate(lat, lon)?;
        if self.graph.is_empty() {
            return Err(Error::NoGraph);
        }

        let query = coord! { x: lon, y: lat };
        let (node, distance) = self.graph.nearest_node(query).ok_or(Error::NoGraph)?;
        trace!(
            "Snapped ({lat}, {lon}) to node {} at {distance:.1}m",
            self.graph.node(node).id
        );

        Ok(Snapped {
            query,
            node,
            distance,
        })
    }

    fn no_route(&self, origin: &Snapped, destination: &Snapped) -> Error {
        let from = self.graph.node(origin.node).id;
        let to = self.graph.node(destination.node).id;
        debug!("No route between node {from} and node {to}");
        Error::NoRoute { from, to }
    }

    fn route_path(&self, origin: &Snapped, destination: &Snapped, traced: TracedPath) -> RoutePath {
        let nodes: Vec<NodeId> = traced
            .nodes
            .iter()
            .map(|&idx| self.graph.node(idx).id)
            .collect();

        let legs = nodes
            .windows(2)
            .zip(&traced.edges)
            .map(|(pair, &edge_idx)| {
                let edge = self.graph.edge(edge_idx);
                let mut geometry = edge.geometry.0.clone();
                if edge.source != pair[0] {
                    geometry.reverse();
                }
                RouteLeg {
                    from: pair[0],
                    to: pair[1],
                    weight: edge.weight,
                    geometry,
                }
            })
            .collect();

        let origin_node = self.graph.node(origin.node);
        RoutePath {
            origin: origin.query,
            destination: destination.query,
            origin_node: origin_node.id,
            destination_node: self.graph.node(destination.node).id,
            origin_node_coord: origin_node.geometry.into(),
            snap_in: origin.distance,
            snap_out: destination.distance,
            nodes,
            legs,
        }
    }
}
