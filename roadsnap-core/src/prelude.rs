pub use crate::{AUTO_NODE_ID_START, COORD_PRECISION, DEFAULT_SPEED_KMH, SOFT_SNAP_RADIUS_METERS};

// Build pipeline
pub use crate::loading::{
    BuildStats, CoordinateSnapIndex, GeometrySource, GraphBuilder, GraphSourceConfig, GraphStore,
    JsonFileStore, MemoryStore, Resolution, rebuild,
};

// Graph model
pub use crate::model::{Edge, GraphData, Node, RoadGraph};

// Query side
pub use crate::routing::{RouteAssembler, RoutePath, RouteResult, RoutingEngine, SharedGraph};

pub use crate::Error;
pub use crate::Meters;
pub use crate::NodeId;
