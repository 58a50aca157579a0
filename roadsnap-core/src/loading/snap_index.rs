//! Coordinate deduplication for graph building
//!
//! Exact lookups go through a hash of quantized coordinates; tolerant
//! lookups go through an R-tree holding primary nodes only, so auto-generated
//! nodes can never become snap targets.

use geo::coord;
use hashbrown::HashMap;
use rstar::{RTree, primitives::GeomWithData};

use crate::geodesy::{CoordKey, haversine, pick_nearest, quantize, search_envelope};
use crate::{Meters, NodeId};

type PrimaryPoint = GeomWithData<[f64; 2], NodeId>;

#[derive(Debug, Default)]
pub struct CoordinateSnapIndex {
    exact: HashMap<CoordKey, NodeId>,
    primaries: RTree<PrimaryPoint>,
}

impl CoordinateSnapIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Node registered at the quantized key of this coordinate
    pub fn lookup_exact(&self, lat: f64, lon: f64) -> Option<NodeId> {
        self.exact.get(&quantize(lat, lon)).copied()
    }

    /// Nearest primary node within `radius` meters, with its distance
    pub fn lookup_near(&self, lat: f64, lon: f64, radius: Meters) -> Option<(NodeId, Meters)> {
        let query = coord! { x: lon, y: lat };
        let envelope = search_envelope(query, radius);

        pick_nearest(
            self.primaries
                .locate_in_envelope(&envelope)
                .map(|point| {
                    let [x, y] = *point.geom();
                    (point.data, haversine(query, coord! { x: x, y: y }))
                })
                .filter(|&(_, distance)| distance <= radius),
        )
    }

    /// Maps the quantized key of this coordinate to `id`
    ///
    /// Returns the id previously registered at that key, if any.
    pub fn register(&mut self, lat: f64, lon: f64, id: NodeId) -> Option<NodeId> {
        self.exact.insert(quantize(lat, lon), id)
    }

    /// Registers a primary node: exact key plus soft-snap eligibility
    pub fn register_primary(&mut self, lat: f64, lon: f64, id: NodeId) -> Option<NodeId> {
        self.primaries.insert(PrimaryPoint::new([lon, lat], id));
        self.register(lat, lon, id)
    }

    pub fn primary_count(&self) -> usize {
        self.primaries.size()
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}
