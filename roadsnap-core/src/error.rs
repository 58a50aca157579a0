use thiserror::Error;

use crate::NodeId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("No graph available: build the road graph before routing")]
    NoGraph,
    #[error("No route between node {from} and node {to}")]
    NoRoute { from: NodeId, to: NodeId },
    #[error("Invalid coordinate: lat={lat}, lon={lon}")]
    InvalidCoordinate { lat: f64, lon: f64 },
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Store error: {0}")]
    Store(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(#[from] geojson::Error),
}
