//! Data model for the road graph
//!
//! Persisted records ([`Node`], [`Edge`], [`GraphData`]) and the in-memory
//! [`RoadGraph`] loaded from them for routing.

pub mod components;
pub mod data;
pub mod network;

pub use components::{Edge, Node};
pub use data::GraphData;
pub use network::{IndexedPoint, RoadEdge, RoadGraph, RoadNode};
