use std::path::PathBuf;

/// Location of the geometry source read by a build pass
#[derive(Debug, Clone)]
pub struct GraphSourceConfig {
    /// GeoJSON `FeatureCollection` of labeled primary nodes
    pub nodes_path: PathBuf,
    /// GeoJSON `FeatureCollection` of road lines
    pub roads_path: PathBuf,
}
