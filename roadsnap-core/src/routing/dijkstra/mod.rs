mod state;
mod traced_dijkstra;

pub(crate) use traced_dijkstra::{ShortestPathTree, TracedPath, shortest_path, shortest_path_tree};
