//! This module is responsible for reading the geometry source and turning it
//! into a persisted, deduplicated road graph.

mod builder;
mod config;
mod snap_index;
pub mod source;
mod store;

use log::info;

pub use builder::{BuildStats, GraphBuilder, Resolution};
pub use config::GraphSourceConfig;
pub use snap_index::CoordinateSnapIndex;
pub use source::{GeometrySource, LineFeature, PointFeature};
pub use store::{GraphStore, JsonFileStore, MemoryStore};

use crate::Error;

/// Full rebuild: clears the store, writes a fresh node/edge set, commits
///
/// The store only publishes the new graph once every feature has been
/// processed; on error the previously committed graph stays current.
///
/// # Errors
///
/// Returns an error if the store rejects a record or fails to commit.
pub fn rebuild<S: GraphStore + ?Sized>(
    source: &GeometrySource,
    store: &mut S,
) -> Result<BuildStats, Error> {
    store.clear()?;
    let stats = GraphBuilder::build(source, store)?;
    store.commit()?;

    info!(
        "Road graph rebuilt: {} nodes, {} edges",
        stats.nodes(),
        stats.edges
    );
    Ok(stats)
}
