use geo::Coord;
use hashbrown::HashMap;
use log::{debug, error, info, warn};
use serde::ser::{Serialize, SerializeStruct, Serializer};

use super::snap_index::CoordinateSnapIndex;
use super::source::{GeometrySource, LineFeature, PointFeature};
use super::store::GraphStore;
use crate::geodesy::line_length;
use crate::model::{Edge, Node};
use crate::{AUTO_NODE_ID_START, Error, Meters, NodeId, SOFT_SNAP_RADIUS_METERS};

/// How a road endpoint maps onto the node set, decided without side effects
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    /// A node is already registered at the quantized coordinate
    Existing(NodeId),
    /// No exact match, but a primary node lies within the snap radius
    SoftSnapped { id: NodeId, distance: Meters },
    /// A new auto node is needed
    New,
}

/// Counters reported by a build pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub primary_nodes: usize,
    pub auto_nodes: usize,
    pub edges: usize,
    pub exact_matches: usize,
    pub soft_snaps: usize,
    /// Lines with fewer than two coordinates
    pub short_lines: usize,
    /// Lines whose endpoints resolved to the same node
    pub self_loops: usize,
    /// Input features rejected as malformed or conflicting
    pub skipped_features: usize,
    /// Invalid parts dropped from otherwise usable multi-line features
    pub skipped_lines: usize,
}

impl BuildStats {
    pub fn nodes(&self) -> usize {
        self.primary_nodes + self.auto_nodes
    }

    pub fn degenerate_lines(&self) -> usize {
        self.short_lines + self.self_loops
    }
}

// Also writes the `nodes` total, which is derived rather than stored
impl Serialize for BuildStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BuildStats", 10)?;
        state.serialize_field("nodes", &self.nodes())?;
        state.serialize_field("primary_nodes", &self.primary_nodes)?;
        state.serialize_field("auto_nodes", &self.auto_nodes)?;
        state.serialize_field("edges", &self.edges)?;
        state.serialize_field("exact_matches", &self.exact_matches)?;
        state.serialize_field("soft_snaps", &self.soft_snaps)?;
        state.serialize_field("short_lines", &self.short_lines)?;
        state.serialize_field("self_loops", &self.self_loops)?;
        state.serialize_field("skipped_features", &self.skipped_features)?;
        state.serialize_field("skipped_lines", &self.skipped_lines)?;
        state.end()
    }
}

/// Turns primary points and road lines into a deduplicated node/edge set
///
/// The builder owns its [`CoordinateSnapIndex`]; each build starts from a
/// fresh one. Nodes and edges are written to a [`GraphStore`] as they are
/// produced.
#[derive(Debug)]
pub struct GraphBuilder {
    index: CoordinateSnapIndex,
    /// Position of every node created so far
    node_coords: HashMap<NodeId, Coord<f64>>,
    next_auto_id: NodeId,
    snap_radius: Meters,
    stats: BuildStats,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            index: CoordinateSnapIndex::new(),
            node_coords: HashMap::new(),
            next_auto_id: AUTO_NODE_ID_START,
            snap_radius: SOFT_SNAP_RADIUS_METERS,
            stats: BuildStats::default(),
        }
    }

    /// Runs a full pass: every primary node first, then every road line
    ///
    /// # Errors
    ///
    /// Returns the first error reported by the store. Malformed features are
    /// skipped and counted instead.
    pub fn build<S: GraphStore + ?Sized>(
        source: &GeometrySource,
        store: &mut S,
    ) -> Result<BuildStats, Error> {
        let mut builder = Self::new();
        builder.stats.skipped_features = source.skipped;
        builder.stats.skipped_lines = source.skipped_lines;

        info!("Importing {} primary nodes", source.points.len());
        for point in &source.points {
            builder.add_primary(point, store)?;
        }

        info!(
            "Processing {} road features with soft snap ({}m)",
            source.lines.len(),
            builder.snap_radius
        );
        for feature in &source.lines {
            builder.add_road(feature, store)?;
        }

        let stats = builder.into_stats();
        info!(
            "Generated {} auto nodes, created {} edges ({} soft snaps, {} degenerate lines)",
            stats.auto_nodes,
            stats.edges,
            stats.soft_snaps,
            stats.degenerate_lines()
        );
        Ok(stats)
    }

    /// Registers a labeled node as an exact key and a soft-snap target
    ///
    /// Returns `false` if the node was skipped because its id or its
    /// quantized coordinate is already taken.
    pub fn add_primary<S: GraphStore + ?Sized>(
        &mut self,
        point: &PointFeature,
        store: &mut S,
    ) -> Result<bool, Error> {
        let Coord { x: lon, y: lat } = point.coord;

        if self.node_coords.contains_key(&point.id) {
            warn!(
                "Skipping node feature #{}: id {} already used",
                point.index, point.id
            );
            self.stats.skipped_features += 1;
            return Ok(false);
        }
        if let Some(existing) = self.index.lookup_exact(lat, lon) {
            warn!(
                "Skipping node feature #{} (id {}): ({lat}, {lon}) already belongs to node {existing}",
                point.index, point.id
            );
            self.stats.skipped_features += 1;
            return Ok(false);
        }

        store.create_node(&Node::new(point.id, point.label.clone(), point.coord))?;
        self.index.register_primary(lat, lon, point.id);
        self.node_coords.insert(point.id, point.coord);
        self.next_auto_id = self.next_auto_id.max(point.id.saturating_add(1));
        self.stats.primary_nodes += 1;
        Ok(true)
    }

    /// Decides which node a coordinate belongs to, without changing anything
    pub fn resolve(&self, lat: f64, lon: f64) -> Resolution {
        if let Some(id) = self.index.lookup_exact(lat, lon) {
            return Resolution::Existing(id);
        }
        match self.index.lookup_near(lat, lon, self.snap_radius) {
            Some((id, distance)) => Resolution::SoftSnapped { id, distance },
            None => Resolution::New,
        }
    }

    /// Resolves a coordinate and applies the outcome
    ///
    /// A soft snap registers the coordinate's own key as an alias of the
    /// matched node; a miss creates an unlabeled auto node.
    pub fn resolve_node<S: GraphStore + ?Sized>(
        &mut self,
        lat: f64,
        lon: f64,
        store: &mut S,
    ) -> Result<NodeId, Error> {
        match self.resolve(lat, lon) {
            Resolution::Existing(id) => {
                self.stats.exact_matches += 1;
                Ok(id)
            }
            Resolution::SoftSnapped { id, distance } => {
                debug!("Soft-snapped ({lat}, {lon}) to node {id} at {distance:.2}m");
                self.index.register(lat, lon, id);
                self.stats.soft_snaps += 1;
                Ok(id)
            }
            Resolution::New => {
                let id = self.allocate_auto_id()?;
                store.create_node(&Node::new(id, None, Coord { x: lon, y: lat }))?;
                self.index.register(lat, lon, id);
                self.node_coords.insert(id, Coord { x: lon, y: lat });
                self.stats.auto_nodes += 1;
                Ok(id)
            }
        }
    }

    pub fn add_road<S: GraphStore + ?Sized>(
        &mut self,
        feature: &LineFeature,
        store: &mut S,
    ) -> Result<(), Error> {
        for line in &feature.lines {
            self.add_line(feature.index, line, store)?;
        }
        Ok(())
    }

    /// Turns one line into at most one edge between its endpoint nodes
    ///
    /// Interior vertices only contribute to the weight and geometry. The
    /// first and last vertex are replaced by the positions of the nodes they
    /// resolved to, so the stored geometry always ends exactly on its nodes
    /// and the weight is measured along that geometry.
    pub fn add_line<S: GraphStore + ?Sized>(
        &mut self,
        feature: usize,
        coords: &[Coord<f64>],
        store: &mut S,
    ) -> Result<Option<Edge>, Error> {
        let (Some(first), Some(last)) = (coords.first(), coords.last()) else {
            self.stats.short_lines += 1;
            return Ok(None);
        };
        if coords.len() < 2 {
            self.stats.short_lines += 1;
            return Ok(None);
        }

        let source = self.resolve_node(first.y, first.x, store)?;
        let target = self.resolve_node(last.y, last.x, store)?;
        if source == target {
            self.stats.self_loops += 1;
            return Ok(None);
        }

        let mut geometry = coords.to_vec();
        if let Some(start) = geometry.first_mut() {
            *start = self.node_coord(source)?;
        }
        if let Some(end) = geometry.last_mut() {
            *end = self.node_coord(target)?;
        }

        let edge = Edge::new(source, target, line_length(&geometry), &geometry);
        store.create_edge(&edge).inspect_err(|e| {
            error!(
                "Road feature #{feature}: failed to create edge {source} -> {target} \
                 starting at ({}, {}): {e}",
                first.y, first.x
            );
        })?;

        self.stats.edges += 1;
        if self.stats.edges % 1000 == 0 {
            debug!("{} edges created", self.stats.edges);
        }
        Ok(Some(edge))
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    pub fn into_stats(self) -> BuildStats {
        self.stats
    }

    fn node_coord(&self, id: NodeId) -> Result<Coord<f64>, Error> {
        self.node_coords
            .get(&id)
            .copied()
            .ok_or(Error::UnknownNode(id))
    }

    fn allocate_auto_id(&mut self) -> Result<NodeId, Error> {
        while self.node_coords.contains_key(&self.next_auto_id) {
            self.next_auto_id += 1;
        }
        let id = self.next_auto_id;
        self.next_auto_id = id
            .checked_add(1)
            .ok_or_else(|| Error::InvalidData("auto node ids exhausted".to_string()))?;
        Ok(id)
    }
}
