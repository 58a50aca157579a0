//! Persistence contract for built graphs
//!
//! A build writes into a staging generation opened by [`GraphStore::clear`];
//! nothing becomes visible to [`GraphStore::load`] until
//! [`GraphStore::commit`] succeeds, so an aborted build leaves the previously
//! committed graph in place.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use hashbrown::HashSet;
use log::{debug, info};

use crate::model::{Edge, GraphData, Node};
use crate::{Error, NodeId};

pub trait GraphStore {
    /// Starts a new, empty generation
    fn clear(&mut self) -> Result<(), Error>;

    fn create_node(&mut self, node: &Node) -> Result<(), Error>;

    /// Fails if either endpoint has not been created in this generation
    fn create_edge(&mut self, edge: &Edge) -> Result<(), Error>;

    /// Publishes the staged generation
    fn commit(&mut self) -> Result<(), Error>;

    /// Full node and edge set of the last committed generation
    ///
    /// Returns [`Error::NoGraph`] if nothing has been committed yet.
    fn load(&self) -> Result<GraphData, Error>;
}

/// Records of the generation being built, with referential checks
#[derive(Debug, Default)]
struct Staging {
    data: GraphData,
    ids: HashSet<NodeId>,
}

impl Staging {
    fn push_node(&mut self, node: &Node) -> Result<(), Error> {
        if !self.ids.insert(node.id) {
            return Err(Error::Store(format!("node {} already exists", node.id)));
        }
        self.data.nodes.push(node.clone());
        Ok(())
    }

    fn push_edge(&mut self, edge: &Edge) -> Result<(), Error> {
        for id in [edge.source_id, edge.target_id] {
            if !self.ids.contains(&id) {
                return Err(Error::Store(format!(
                    "edge {} -> {} references missing node {id}",
                    edge.source_id, edge.target_id
                )));
            }
        }
        self.data.edges.push(edge.clone());
        Ok(())
    }

    fn take(&mut self) -> GraphData {
        self.ids.clear();
        std::mem::take(&mut self.data)
    }
}

/// Keeps committed graphs in memory; handy for tests and one-shot tools
#[derive(Debug, Default)]
pub struct MemoryStore {
    staging: Staging,
    committed: Option<GraphData>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GraphStore for MemoryStore {
    fn clear(&mut self) -> Result<(), Error> {
        self.staging = Staging::default();
        Ok(())
    }

    fn create_node(&mut self, node: &Node) -> Result<(), Error> {
        self.staging.push_node(node)
    }

    fn create_edge(&mut self, edge: &Edge) -> Result<(), Error> {
        self.staging.push_edge(edge)
    }

    fn commit(&mut self) -> Result<(), Error> {
        self.committed = Some(self.staging.take());
        Ok(())
    }

    fn load(&self) -> Result<GraphData, Error> {
        self.committed.clone().ok_or(Error::NoGraph)
    }
}

/// Persists each committed generation as one JSON document
///
/// Commits write a sibling temporary file and rename it over the target, so a
/// reader never observes a partially written graph.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    staging: Staging,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            staging: Staging::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "graph.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl GraphStore for JsonFileStore {
    fn clear(&mut self) -> Result<(), Error> {
        self.staging = Staging::default();
        Ok(())
    }

    fn create_node(&mut self, node: &Node) -> Result<(), Error> {
        self.staging.push_node(node)
    }

    fn create_edge(&mut self, edge: &Edge) -> Result<(), Error> {
        self.staging.push_edge(edge)
    }

    fn commit(&mut self) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let data = self.staging.take();
        let temp = self.temp_path();
        {
            let mut file = fs::File::create(&temp)?;
            serde_json::to_writer(&mut file, &data)?;
            file.flush()?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;

        info!(
            "Committed {} nodes and {} edges to {}",
            data.node_count(),
            data.edge_count(),
            self.path.display()
        );
        Ok(())
    }

    fn load(&self) -> Result<GraphData, Error> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let data: GraphData = serde_json::from_slice(&bytes)?;
                debug!("Loaded graph from {}", self.path.display());
                Ok(data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NoGraph),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    fn node(id: NodeId) -> Node {
        Node::new(id, None, coord! { x: 117.0 + id as f64 * 0.01, y: 0.1 })
    }

    fn edge(source_id: NodeId, target_id: NodeId) -> Edge {
        Edge {
            source_id,
            target_id,
            weight: 10.0,
            geometry: vec![[117.0, 0.1], [117.01, 0.1]],
        }
    }

    fn populate(store: &mut impl GraphStore) {
        store.clear().unwrap();
        store.create_node(&node(1)).unwrap();
        store.create_node(&node(2)).unwrap();
        store.create_edge(&edge(1, 2)).unwrap();
    }

    #[test]
    fn load_before_commit_reports_no_graph() {
        let mut store = MemoryStore::new();
        assert!(matches!(store.load(), Err(Error::NoGraph)));

        populate(&mut store);
        assert!(matches!(store.load(), Err(Error::NoGraph)));

        store.commit().unwrap();
        assert_eq!(store.load().unwrap().edge_count(), 1);
    }

    #[test]
    fn aborted_generation_keeps_previous_graph() {
        let mut store = MemoryStore::new();
        populate(&mut store);
        store.commit().unwrap();

        store.clear().unwrap();
        store.create_node(&node(5)).unwrap();
        // no commit

        let data = store.load().unwrap();
        assert_eq!(data.node_count(), 2);
        assert_eq!(data.nodes[0].id, 1);
    }

    #[test]
    fn rejects_duplicate_nodes_and_dangling_edges() {
        let mut store = MemoryStore::new();
        store.clear().unwrap();
        store.create_node(&node(1)).unwrap();

        assert!(matches!(store.create_node(&node(1)), Err(Error::Store(_))));
        assert!(matches!(store.create_edge(&edge(1, 9)), Err(Error::Store(_))));
    }

    #[test]
    fn json_store_round_trips_committed_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("graph.json");
        let mut store = JsonFileStore::new(&path);

        assert!(matches!(store.load(), Err(Error::NoGraph)));

        populate(&mut store);
        store.commit().unwrap();

        let reopened = JsonFileStore::new(&path);
        let data = reopened.load().unwrap();
        assert_eq!(data.nodes, vec![node(1), node(2)]);
        assert_eq!(data.edges, vec![edge(1, 2)]);
        assert!(!store.temp_path().exists());
    }
}
