use std::sync::{Arc, Mutex, PoisonError};

use roadsnap_core::loading::GeometrySource;
use roadsnap_core::{
    BuildStats, Error, GraphSourceConfig, GraphStore, JsonFileStore, RouteAssembler,
    RoutingEngine, SharedGraph, rebuild,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::Config;

type DynStore = Box<dyn GraphStore + Send>;

/// Node and edge counts of a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
}

/// Shared by every request handler
///
/// The store sits behind a mutex that is held for a whole rebuild, so
/// rebuilds never interleave. Queries only touch the [`SharedGraph`] snapshot
/// and are never blocked by a running build.
#[derive(Clone)]
pub struct AppState {
    graph: Arc<SharedGraph>,
    store: Arc<Mutex<DynStore>>,
    source: GraphSourceConfig,
    assembler: RouteAssembler,
}

impl AppState {
    pub fn new(
        store: impl GraphStore + Send + 'static,
        source: GraphSourceConfig,
        assembler: RouteAssembler,
    ) -> Self {
        Self {
            graph: Arc::new(SharedGraph::new()),
            store: Arc::new(Mutex::new(Box::new(store))),
            source,
            assembler,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Ok(Self::new(
            JsonFileStore::new(&config.data.store_path),
            config.data.source(),
            RouteAssembler::new(config.routing.speed_kmh)?,
        ))
    }

    pub fn graph(&self) -> &SharedGraph {
        &self.graph
    }

    /// Loads the last committed graph into the snapshot
    ///
    /// Returns `false` if nothing has been built yet.
    pub fn load_persisted(&self) -> Result<bool, Error> {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        match store.load() {
            Ok(data) => {
                let engine = RoutingEngine::from_data(&data, self.assembler)?;
                info!(
                    nodes = engine.graph().node_count(),
                    edges = engine.graph().edge_count(),
                    "Loaded persisted road graph"
                );
                self.graph.replace(engine);
                Ok(true)
            }
            Err(Error::NoGraph) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Reads the geometry source, rebuilds the persisted graph and swaps the
    /// new snapshot in
    ///
    /// Blocks for the whole build. On error the store and the served snapshot
    /// both keep the previous graph.
    pub fn rebuild(&self) -> Result<BuildStats, Error> {
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);

        let source = GeometrySource::from_files(&self.source)?;
        let stats = rebuild(&source, &mut **store)?;
        let engine = RoutingEngine::from_data(&store.load()?, self.assembler)?;
        self.graph.replace(engine);

        Ok(stats)
    }

    /// Counts of the committed graph, read from the store
    pub fn stored_stats(&self) -> Result<GraphStats, Error> {
        let store = self.store.lock().unwrap_or_else(PoisonError::into_inner);
        let data = store.load()?;
        Ok(GraphStats {
            nodes: data.node_count(),
            edges: data.edge_count(),
        })
    }

    /// Counts of the snapshot currently served
    pub fn served_stats(&self) -> Result<GraphStats, Error> {
        let engine = self.graph.current()?;
        Ok(GraphStats {
            nodes: engine.graph().node_count(),
            edges: engine.graph().edge_count(),
        })
    }
}
