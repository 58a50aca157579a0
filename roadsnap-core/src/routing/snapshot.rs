//! Atomically replaceable routing snapshot shared by concurrent queries

use std::sync::{Arc, PoisonError, RwLock};

use log::info;

use super::engine::RoutingEngine;
use crate::Error;

/// Current [`RoutingEngine`], swapped as a whole on rebuild
///
/// Readers clone the `Arc` and keep routing against the graph they got even
/// if a rebuild replaces it meanwhile; they never observe a mix of old and
/// new data.
#[derive(Debug, Default)]
pub struct SharedGraph {
    current: RwLock<Option<Arc<RoutingEngine>>>,
}

impl SharedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(engine: RoutingEngine) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(engine))),
        }
    }

    /// Snapshot to run queries against
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoGraph`] until a graph has been loaded.
    pub fn current(&self) -> Result<Arc<RoutingEngine>, Error> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::NoGraph)
    }

    /// Publishes a new snapshot, returning the one it replaced
    pub fn replace(&self, engine: RoutingEngine) -> Option<Arc<RoutingEngine>> {
        let next = Arc::new(engine);
        info!(
            "Publishing road graph snapshot: {} nodes, {} edges",
            next.graph().node_count(),
            next.graph().edge_count()
        );
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(next)
    }

    pub fn is_loaded(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GraphData, Node};
    use crate::routing::RouteAssembler;
    use geo::coord;

    fn engine(nodes: u64) -> RoutingEngine {
        let data = GraphData {
            nodes: (1..=nodes)
                .map(|id| Node::new(id, None, coord! { x: id as f64, y: 0.0 }))
                .collect(),
            edges: Vec::new(),
        };
        RoutingEngine::from_data(&data, RouteAssembler::default()).unwrap()
    }

    #[test]
    fn empty_snapshot_reports_no_graph() {
        let shared = SharedGraph::new();
        assert!(!shared.is_loaded());
        assert!(matches!(shared.current(), Err(Error::NoGraph)));
    }

    #[test]
    fn readers_keep_their_snapshot_across_replace() {
        let shared = SharedGraph::with_engine(engine(1));
        let before = shared.current().unwrap();

        let replaced = shared.replace(engine(3)).unwrap();
        assert!(Arc::ptr_eq(&before, &replaced));

        assert_eq!(before.graph().node_count(), 1);
        assert_eq!(shared.current().unwrap().graph().node_count(), 3);
    }
}
