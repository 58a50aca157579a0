//! Great-circle helpers shared by the builder and the router.
//!
//! Coordinates follow the `geo` convention: `x` is longitude, `y` is latitude.

use geo::{Coord, Distance, Haversine, Point};
use itertools::Itertools;
use rstar::AABB;

use crate::{COORD_PRECISION, Error, Meters, NodeId};

/// Mean Earth radius used by [`Haversine`]
const MEAN_EARTH_RADIUS: Meters = 6_371_008.8;

/// Distances closer than this are treated as equal
pub const DISTANCE_EPSILON: Meters = 1e-9;

/// Quantized coordinate key, `(lat, lon)` scaled by 10^[`COORD_PRECISION`]
pub type CoordKey = (i64, i64);

/// Great-circle distance between two coordinates in meters
pub fn haversine(a: Coord<f64>, b: Coord<f64>) -> Meters {
    Haversine.distance(Point::from(a), Point::from(b))
}

/// Length of a polyline as the sum of its consecutive segment lengths
pub fn line_length(coords: &[Coord<f64>]) -> Meters {
    coords
        .iter()
        .tuple_windows()
        .map(|(a, b)| haversine(*a, *b))
        .sum()
}

/// Closest candidate; distances within [`DISTANCE_EPSILON`] go to the lowest id
pub fn pick_nearest<I>(candidates: I) -> Option<(NodeId, Meters)>
where
    I: IntoIterator<Item = (NodeId, Meters)>,
{
    candidates
        .into_iter()
        .fold(None, |best, (id, distance)| match best {
            Some((best_id, best_distance))
                if best_distance < distance - DISTANCE_EPSILON
                    || ((best_distance - distance).abs() <= DISTANCE_EPSILON
                        && best_id <= id) =>
            {
                best
            }
            _ => Some((id, distance)),
        })
}

#[allow(clippy::cast_possible_truncation)]
pub fn quantize(lat: f64, lon: f64) -> CoordKey {
    let scale = 10f64.powi(COORD_PRECISION);
    ((lat * scale).round() as i64, (lon * scale).round() as i64)
}

/// Rejects NaN, infinities and points outside WGS84 bounds
pub fn validate_coordinate(lat: f64, lon: f64) -> Result<(), Error> {
    if lat.is_finite() && lon.is_finite() && lat.abs() <= 90.0 && lon.abs() <= 180.0 {
        Ok(())
    } else {
        Err(Error::InvalidCoordinate { lat, lon })
    }
}

/// `[lon, lat]` envelope guaranteed to contain every point within
/// `radius` meters of `center`.
///
/// Latitude bounds come straight from the angular radius; the longitude
/// half-width is the tangent-point formula `asin(sin(d) / cos(lat))`. Near the
/// poles, or when the box would cross the antimeridian, the longitude range
/// widens to the whole globe.
pub fn search_envelope(center: Coord<f64>, radius: Meters) -> AABB<[f64; 2]> {
    // Small relative margin so floating point noise never excludes a boundary point
    let angular = radius.max(0.0) * 1.000_1 / MEAN_EARTH_RADIUS + 1e-12;
    let lat = center.y.to_radians();

    let min_lat = (lat - angular).to_degrees().max(-90.0);
    let max_lat = (lat + angular).to_degrees().min(90.0);

    let ratio = angular.sin() / lat.cos();
    let (min_lon, max_lon) = if angular >= std::f64::consts::FRAC_PI_2
        || !(0.0..1.0).contains(&ratio)
    {
        (-180.0, 180.0)
    } else {
        let half_width = ratio.asin().to_degrees();
        let (lo, hi) = (center.x - half_width, center.x + half_width);
        if lo < -180.0 || hi > 180.0 {
            (-180.0, 180.0)
        } else {
            (lo, hi)
        }
    };

    AABB::from_corners([min_lon, min_lat], [max_lon, max_lat])
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;
    use rstar::Envelope;

    #[test]
    fn line_length_follows_vertices() {
        let a = coord! { x: 117.480, y: 0.1277 };
        let b = coord! { x: 117.490, y: 0.1400 };
        let c = coord! { x: 117.498, y: 0.1347 };

        let length = line_length(&[a, b, c]);
        let expected = haversine(a, b) + haversine(b, c);

        assert!((length - expected).abs() < 1e-9);
        assert!(length > haversine(a, c));
    }

    #[test]
    fn degenerate_lines_have_zero_length() {
        let a = coord! { x: 117.48, y: 0.12 };
        assert_eq!(line_length(&[]), 0.0);
        assert_eq!(line_length(&[a]), 0.0);
    }

    #[test]
    fn quantize_rounds_to_five_decimals() {
        assert_eq!(quantize(0.134_701, 117.498_004), (13_470, 11_749_800));
        assert_eq!(quantize(0.134_704, 117.497_996), quantize(0.1347, 117.498));
        assert_ne!(quantize(0.134_71, 117.498), quantize(0.1347, 117.498));
    }

    #[test]
    fn envelope_contains_points_at_radius() {
        let center = coord! { x: 117.48, y: 0.1277 };
        let envelope = search_envelope(center, 30.0);

        // ~30 m north and ~30 m east of the center
        let north = coord! { x: 117.48, y: 0.1277 + 30.0 / 111_195.0 };
        let east = coord! { x: 117.48 + 30.0 / 111_195.0, y: 0.1277 };
        assert!(haversine(center, north) <= 30.01);
        assert!(envelope.contains_point(&[north.x, north.y]));
        assert!(envelope.contains_point(&[east.x, east.y]));
        assert!(!envelope.contains_point(&[117.48, 0.1287]));
    }

    #[test]
    fn envelope_widens_near_poles() {
        let envelope = search_envelope(coord! { x: 10.0, y: 89.9999 }, 1_000.0);
        assert_eq!(envelope.lower()[0], -180.0);
        assert_eq!(envelope.upper()[0], 180.0);
    }

    #[test]
    fn pick_nearest_prefers_distance_then_id() {
        assert_eq!(pick_nearest(vec![(5, 3.0), (2, 4.0)]), Some((5, 3.0)));
        assert_eq!(pick_nearest(vec![(5, 3.0), (2, 3.0)]), Some((2, 3.0)));
        assert_eq!(pick_nearest(vec![(2, 3.0), (5, 3.0)]), Some((2, 3.0)));
        assert_eq!(pick_nearest(Vec::new()), None);
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(validate_coordinate(0.1347, 117.498).is_ok());
        assert!(validate_coordinate(91.0, 0.0).is_err());
        assert!(validate_coordinate(0.0, f64::NAN).is_err());
    }
}
