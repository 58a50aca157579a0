use geo::Coord;
use geojson::Feature;
use serde_json::json;

use super::engine::RoutePath;
use crate::{DEFAULT_SPEED_KMH, Error, Meters, NodeId};

/// Consecutive legs whose junction points are closer than this (in degrees)
/// share a single path vertex.
const JUNCTION_EPSILON: f64 = 1e-9;

/// Client-facing route
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    /// Path vertices from origin to destination (`x` = lon, `y` = lat)
    pub path: Vec<Coord<f64>>,
    pub distance_meters: Meters,
    pub duration_minutes: f64,
    pub origin_node: NodeId,
    pub destination_node: NodeId,
    /// Graph nodes visited, in order
    pub nodes: Vec<NodeId>,
}

impl RouteResult {
    /// Path as `[lat, lon]` pairs, the order map clients draw polylines in
    pub fn lat_lon_path(&self) -> Vec<[f64; 2]> {
        self.path.iter().map(|c| [c.y, c.x]).collect()
    }

    /// Route as a `GeoJSON` Feature with distance and duration properties
    pub fn to_geojson(&self) -> Result<Feature, Error> {
        let positions: Vec<[f64; 2]> = self.path.iter().map(|c| [c.x, c.y]).collect();
        let geometry = match positions.as_slice() {
            [point] => json!({ "type": "Point", "coordinates": point }),
            _ => json!({ "type": "LineString", "coordinates": positions }),
        };

        let value = json!({
            "type": "Feature",
            "geometry": geometry,
            "properties": {
                "distance_meters": self.distance_meters,
                "duration_minutes": self.duration_minutes,
                "origin_node": self.origin_node,
                "destination_node": self.destination_node,
            }
        });

        Ok(serde_json::from_value(value)?)
    }
}

/// Shapes routing output into [`RouteResult`]s
///
/// The assumed travel speed is the only tunable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteAssembler {
    speed_kmh: f64,
}

impl Default for RouteAssembler {
    fn default() -> Self {
        Self {
            speed_kmh: DEFAULT_SPEED_KMH,
        }
    }
}

impl RouteAssembler {
    /// # Errors
    ///
    /// Returns an error unless the speed is a positive, finite number.
    pub fn new(speed_kmh: f64) -> Result<Self, Error> {
        if speed_kmh.is_finite() && speed_kmh > 0.0 {
            Ok(Self { speed_kmh })
        } else {
            Err(Error::InvalidData(format!(
                "travel speed must be positive, got {speed_kmh} km/h"
            )))
        }
    }

    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }

    pub fn duration_minutes(&self, distance: Meters) -> f64 {
        let meters_per_minute = self.speed_kmh * 1000.0 / 60.0;
        distance / meters_per_minute
    }

    pub fn assemble(&self, route: &RoutePath) -> RouteResult {
        let distance = route.total_distance();

        RouteResult {
            path: join_legs(route),
            distance_meters: distance,
            duration_minutes: self.duration_minutes(distance),
            origin_node: route.origin_node,
            destination_node: route.destination_node,
            nodes: route.nodes.clone(),
        }
    }
}

/// Concatenates leg geometries, dropping the repeated junction vertex
fn join_legs(route: &RoutePath) -> Vec<Coord<f64>> {
    if route.legs.is_empty() {
        return vec![route.origin_node_coord];
    }

    let capacity = route.legs.iter().map(|leg| leg.geometry.len()).sum();
    let mut path: Vec<Coord<f64>> = Vec::with_capacity(capacity);

    for leg in &route.legs {
        let mut coords = leg.geometry.iter().copied();
        if let (Some(last), Some(first)) = (path.last(), leg.geometry.first()) {
            if same_point(*last, *first) {
                coords.next();
            }
        }
        path.extend(coords);
    }
    path
}

fn same_point(a: Coord<f64>, b: Coord<f64>) -> bool {
    (a.x - b.x).abs() <= JUNCTION_EPSILON && (a.y - b.y).abs() <= JUNCTION_EPSILON
}
