use std::fs;

use roadsnap_core::prelude::*;

const NODES: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        { "type": "Feature", "properties": { "id": "1", "label": "SMAN 1 Bontang" },
          "geometry": { "type": "Point", "coordinates": [117.498, 0.1347] } },
        { "type": "Feature", "properties": { "id": 2, "label": "SMAN 2 Bontang" },
          "geometry": { "type": "Point", "coordinates": [117.480, 0.1277] } },
        { "type": "Feature", "properties": { "label": "no id" },
          "geometry": { "type": "Point", "coordinates": [117.470, 0.1300] } }
    ]
}"#;

const ROADS: &str = r#"{
    "type": "FeatureCollection",
    "features": [
        { "type": "Feature", "properties": {},
          "geometry": { "type": "LineString",
                        "coordinates": [[117.49805, 0.13472], [117.49, 0.133], [117.480, 0.1277]] } },
        { "type": "Feature", "properties": {},
          "geometry": { "type": "LineString",
                        "coordinates": [[117.480, 0.1277], [117.475, 0.120]] } },
        { "type": "Feature", "properties": {},
          "geometry": { "type": "Point", "coordinates": [117.475, 0.120] } }
    ]
}"#;

fn write_source(dir: &std::path::Path) -> GraphSourceConfig {
    let config = GraphSourceConfig {
        nodes_path: dir.join("nodes.geojson"),
        roads_path: dir.join("roads.geojson"),
    };
    fs::write(&config.nodes_path, NODES).unwrap();
    fs::write(&config.roads_path, ROADS).unwrap();
    config
}

#[test]
fn build_persists_and_reloads_graph() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_source(dir.path());
    let store_path = dir.path().join("out").join("graph.json");

    let source = GeometrySource::from_files(&config).unwrap();
    let mut store = JsonFileStore::new(&store_path);
    let stats = rebuild(&source, &mut store).unwrap();

    assert_eq!(stats.primary_nodes, 2);
    assert_eq!(stats.auto_nodes, 1);
    assert_eq!(stats.edges, 2);
    assert_eq!(stats.soft_snaps, 1);
    assert_eq!(stats.skipped_features, 2);
    assert!(store_path.exists());

    // a fresh handle sees the committed generation
    let reopened = JsonFileStore::new(&store_path);
    let data = reopened.load().unwrap();
    assert_eq!(data, store.load().unwrap());
    assert_eq!(data.node_count(), 3);

    let engine = RoutingEngine::from_data(&data, RouteAssembler::default()).unwrap();
    let route = engine.find_route(0.1347, 117.498, 0.120, 117.475).unwrap();
    assert_eq!(route.nodes, vec![1, 2, AUTO_NODE_ID_START]);
}

#[test]
fn missing_source_files_build_an_empty_graph() {
    let dir = tempfile::tempdir().unwrap();
    let config = GraphSourceConfig {
        nodes_path: dir.path().join("absent-nodes.geojson"),
        roads_path: dir.path().join("absent-roads.geojson"),
    };

    let source = GeometrySource::from_files(&config).unwrap();
    let mut store = JsonFileStore::new(dir.path().join("graph.json"));
    let stats = rebuild(&source, &mut store).unwrap();
    assert_eq!(stats, BuildStats::default());

    let engine =
        RoutingEngine::from_data(&store.load().unwrap(), RouteAssembler::default()).unwrap();
    assert!(matches!(
        engine.find_route(0.1347, 117.498, 0.1277, 117.480),
        Err(Error::NoGraph)
    ));
}

#[test]
fn invalid_geojson_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_source(dir.path());
    fs::write(&config.roads_path, "{ \"type\": \"Nope\" }").unwrap();

    assert!(matches!(
        GeometrySource::from_files(&config),
        Err(Error::GeoJsonError(_))
    ));
}

#[test]
fn unbuilt_store_reports_no_graph() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("graph.json"));
    assert!(matches!(store.load(), Err(Error::NoGraph)));
}
