//! Shortest-path routing between arbitrary coordinates
//!
//! [`RoutingEngine`] snaps query points to the graph and runs Dijkstra;
//! [`RouteAssembler`] turns the traversed edges into a client-facing
//! [`RouteResult`]; [`SharedGraph`] publishes engines to concurrent readers.

mod assembler;
pub(crate) mod dijkstra;
mod engine;
mod snapshot;

pub use assembler::{RouteAssembler, RouteResult};
pub use engine::{RouteLeg, RoutePath, RoutingEngine};
pub use snapshot::SharedGraph;
