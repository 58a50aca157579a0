//! Persisted graph records - nodes and edges

use geo::{Coord, coord};
use serde::{Deserialize, Serialize};

use crate::{Meters, NodeId};

/// Graph node as stored by the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Human-readable name, `None` for auto-generated nodes
    pub label: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Node {
    pub fn new(id: NodeId, label: Option<String>, coord: Coord<f64>) -> Self {
        Self {
            id,
            label,
            latitude: coord.y,
            longitude: coord.x,
        }
    }

    pub fn coord(&self) -> Coord<f64> {
        coord! { x: self.longitude, y: self.latitude }
    }
}

/// Road segment between two nodes
///
/// Stored with a single source/target pair but traversable both ways.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source_id: NodeId,
    pub target_id: NodeId,
    /// Geodesic length along the original line
    pub weight: Meters,
    /// Original line vertices as `[lon, lat]`, source end first
    pub geometry: Vec<[f64; 2]>,
}

impl Edge {
    pub fn new(source_id: NodeId, target_id: NodeId, weight: Meters, coords: &[Coord<f64>]) -> Self {
        Self {
            source_id,
            target_id,
            weight,
            geometry: coords.iter().map(|c| [c.x, c.y]).collect(),
        }
    }

    pub fn coords(&self) -> Vec<Coord<f64>> {
        self.geometry
            .iter()
            .map(|&[x, y]| coord! { x: x, y: y })
            .collect()
    }
}
