//! Road graph construction with soft snapping and shortest-path routing.
//!
//! The crate has two halves. At build time raw point and line geometry is
//! deduplicated into a node/edge set ([`loading`]); at query time the
//! persisted set is loaded into an immutable [`RoutingEngine`] which answers
//! point-to-point route requests ([`routing`]).

pub mod error;
pub mod geodesy;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;

pub use error::Error;
pub use loading::{
    BuildStats, GraphBuilder, GraphSourceConfig, GraphStore, JsonFileStore, MemoryStore,
    rebuild,
};
pub use model::{Edge, GraphData, Node, RoadGraph};
pub use routing::{RouteAssembler, RouteResult, RoutingEngine, SharedGraph};

/// Identifier of a graph node, primary or auto-generated
pub type NodeId = u64;

/// Distance along the Earth's surface, in meters
pub type Meters = f64;

/// Tolerance for matching a road endpoint to a primary node, in meters
pub const SOFT_SNAP_RADIUS_METERS: Meters = 30.0;

/// Number of decimal degrees kept when keying coordinates (~1.1 m)
pub const COORD_PRECISION: i32 = 5;

/// Lowest id handed out to auto-generated nodes
pub const AUTO_NODE_ID_START: NodeId = 1000;

/// Assumed average travel speed used for duration estimates
pub const DEFAULT_SPEED_KMH: f64 = 30.0;
