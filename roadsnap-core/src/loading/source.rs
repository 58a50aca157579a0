//! Geometry source: primary node points and road lines read from GeoJSON

use std::path::Path;

use geo::{Coord, Geometry};
use geojson::{Feature, FeatureCollection, GeoJson};
use log::{info, warn};
use serde_json::Value as JsonValue;

use super::config::GraphSourceConfig;
use crate::geodesy::validate_coordinate;
use crate::{Error, NodeId};

/// Labeled node supplied by the geometry source
#[derive(Debug, Clone, PartialEq)]
pub struct PointFeature {
    /// Position of the feature in its collection, for diagnostics
    pub index: usize,
    pub id: NodeId,
    pub label: Option<String>,
    pub coord: Coord<f64>,
}

/// Road feature; a `MultiLineString` yields several lines
#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature {
    pub index: usize,
    pub lines: Vec<Vec<Coord<f64>>>,
}

/// Everything one build pass consumes
#[derive(Debug, Clone, Default)]
pub struct GeometrySource {
    pub points: Vec<PointFeature>,
    pub lines: Vec<LineFeature>,
    /// Features rejected as malformed while reading
    pub skipped: usize,
    /// Invalid parts dropped from multi-line features that were kept
    pub skipped_lines: usize,
}

impl GeometrySource {
    /// Reads both collections named in the configuration
    ///
    /// A missing file is reported and treated as an empty collection.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be read or is not a
    /// GeoJSON `FeatureCollection`.
    pub fn from_files(config: &GraphSourceConfig) -> Result<Self, Error> {
        let points = read_collection(&config.nodes_path)?;
        let roads = read_collection(&config.roads_path)?;
        Ok(Self::from_collections(
            points.as_ref().map_or(&[][..], |c| c.features.as_slice()),
            roads.as_ref().map_or(&[][..], |c| c.features.as_slice()),
        ))
    }

    /// Parses GeoJSON text for both collections
    ///
    /// # Errors
    ///
    /// Returns an error if either text is not a GeoJSON `FeatureCollection`.
    pub fn from_geojson_str(points: &str, roads: &str) -> Result<Self, Error> {
        let points = parse_collection(points)?;
        let roads = parse_collection(roads)?;
        Ok(Self::from_collections(&points.features, &roads.features))
    }

    pub fn from_collections(points: &[Feature], roads: &[Feature]) -> Self {
        let mut source = Self::default();

        for (index, feature) in points.iter().enumerate() {
            match point_feature(index, feature) {
                Ok(point) => source.points.push(point),
                Err(reason) => {
                    warn!("Skipping node feature #{index}: {reason}");
                    source.skipped += 1;
                }
            }
        }

        for (index, feature) in roads.iter().enumerate() {
            match line_feature(index, feature) {
                Ok((line, dropped)) => {
                    source.skipped_lines += dropped;
                    source.lines.push(line);
                }
                Err(reason) => {
                    warn!("Skipping road feature #{index}: {reason}");
                    source.skipped += 1;
                }
            }
        }

        source
    }
}

fn read_collection(path: &Path) -> Result<Option<FeatureCollection>, Error> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let collection = parse_collection(&text)?;
            info!(
                "Read {} features from {}",
                collection.features.len(),
                path.display()
            );
            Ok(Some(collection))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("Geometry file {} not found, skipping", path.display());
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn parse_collection(text: &str) -> Result<FeatureCollection, Error> {
    let geojson: GeoJson = text.parse()?;
    Ok(FeatureCollection::try_from(geojson)?)
}

fn point_feature(index: usize, feature: &Feature) -> Result<PointFeature, String> {
    let properties = feature.properties.as_ref();

    let id = properties
        .and_then(|props| props.get("id"))
        .and_then(node_id_from_json)
        .ok_or_else(|| "missing or invalid `id` property".to_string())?;

    let label = properties
        .and_then(|props| props.get("label"))
        .and_then(JsonValue::as_str)
        .map(str::to_owned);

    let coord = match feature_geometry(feature)? {
        Geometry::Point(point) => point.0,
        other => return Err(format!("expected Point geometry, got {}", kind(&other))),
    };
    check_coord(coord)?;

    Ok(PointFeature {
        index,
        id,
        label,
        coord,
    })
}

/// Road lines of a feature, with the number of invalid parts dropped
///
/// Fails if no line survives validation.
fn line_feature(index: usize, feature: &Feature) -> Result<(LineFeature, usize), String> {
    let lines: Vec<Vec<Coord<f64>>> = match feature_geometry(feature)? {
        Geometry::LineString(line) => vec![line.0],
        Geometry::MultiLineString(multi) => multi.0.into_iter().map(|line| line.0).collect(),
        other => {
            return Err(format!(
                "expected LineString or MultiLineString, got {}",
                kind(&other)
            ));
        }
    };

    let total = lines.len();
    let mut valid = Vec::with_capacity(total);
    let mut last_error = None;
    for (part, line) in lines.into_iter().enumerate() {
        match line.iter().try_for_each(|c| check_coord(*c)) {
            Ok(()) => valid.push(line),
            Err(reason) => {
                warn!("Skipping line {part} of road feature #{index}: {reason}");
                last_error = Some(reason);
            }
        }
    }

    if valid.is_empty() {
        return Err(last_error.unwrap_or_else(|| "feature has no lines".to_string()));
    }
    let dropped = total - valid.len();
    Ok((
        LineFeature {
            index,
            lines: valid,
        },
        dropped,
    ))
}

fn feature_geometry(feature: &Feature) -> Result<Geometry<f64>, String> {
    let geometry = feature
        .geometry
        .clone()
        .ok_or_else(|| "feature has no geometry".to_string())?;
    Geometry::<f64>::try_from(geometry).map_err(|e| e.to_string())
}

fn node_id_from_json(value: &JsonValue) -> Option<NodeId> {
    match value {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn check_coord(coord: Coord<f64>) -> Result<(), String> {
    validate_coordinate(coord.y, coord.x).map_err(|e| e.to_string())
}

fn kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        _ => "unsupported geometry",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODES: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {"id": 1, "label": "SMAN 1 Bontang"},
             "geometry": {"type": "Point", "coordinates": [117.498, 0.1347]}},
            {"type": "Feature", "properties": {"label": "no id"},
             "geometry": {"type": "Point", "coordinates": [117.4, 0.1]}},
            {"type": "Feature", "properties": {"id": "7"},
             "geometry": {"type": "Point", "coordinates": [117.48, 0.1277]}},
            {"type": "Feature", "properties": {"id": 8},
             "geometry": {"type": "LineString", "coordinates": [[117.4, 0.1], [117.5, 0.2]]}}
        ]
    }"#;

    const ROADS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "LineString", "coordinates": [[117.498, 0.1347], [117.480, 0.1277]]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "MultiLineString", "coordinates": [
                [[117.480, 0.1277], [117.47, 0.14]],
                [[117.47, 0.14], [200.0, 0.14]]
             ]}},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}},
            {"type": "Feature", "properties": {}, "geometry": null},
            {"type": "Feature", "properties": {},
             "geometry": {"type": "LineString", "coordinates": [[117.4, 0.1], [117.5, 95.0]]}}
        ]
    }"#;

    #[test]
    fn reads_points_with_ids_and_labels() {
        let source = GeometrySource::from_geojson_str(NODES, ROADS).unwrap();

        assert_eq!(source.points.len(), 2);
        assert_eq!(source.points[0].id, 1);
        assert_eq!(source.points[0].label.as_deref(), Some("SMAN 1 Bontang"));
        assert_eq!(source.points[0].coord.x, 117.498);
        assert_eq!(source.points[1].id, 7);
        assert_eq!(source.points[1].index, 2);
        assert_eq!(source.points[1].label, None);
    }

    #[test]
    fn skips_malformed_features_and_invalid_lines() {
        let source = GeometrySource::from_geojson_str(NODES, ROADS).unwrap();

        assert_eq!(source.lines.len(), 2);
        assert_eq!(source.lines[1].index, 1);
        // the out-of-range part of the MultiLineString is dropped and counted
        assert_eq!(source.lines[1].lines.len(), 1);
        assert_eq!(source.skipped_lines, 1);
        // missing id, wrong point geometry, polygon road, null geometry,
        // line with no valid coordinates
        assert_eq!(source.skipped, 5);
    }

    #[test]
    fn missing_files_read_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = GraphSourceConfig {
            nodes_path: dir.path().join("nodes.geojson"),
            roads_path: dir.path().join("roads.geojson"),
        };
        let source = GeometrySource::from_files(&config).unwrap();
        assert!(source.points.is_empty());
        assert!(source.lines.is_empty());
    }

    #[test]
    fn invalid_geojson_is_an_error() {
        assert!(GeometrySource::from_geojson_str("{not json", ROADS).is_err());
    }
}
