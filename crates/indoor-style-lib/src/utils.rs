//! Utility functions for distances and coordinate conversions

use crate::coordinate::Coordinate;
use crate::element::Point;
use geo::Point as GeoPoint;

/// Web Mercator bounds in meters (EPSG:3857)
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6371000.0;

/// Precomputed constant: EARTH_MERCATOR_MAX / 180.0
const LON_TO_X_FACTOR: f64 = EARTH_MERCATOR_MAX / 180.0;

/// Precomputed constant: EARTH_MERCATOR_MAX / PI
const Y_FACTOR: f64 = EARTH_MERCATOR_MAX / std::f64::consts::PI;

/// Convert WGS84 (lat, lon) to Web Mercator (x, y) in meters
///
/// Latitude is clamped to the representable range.
#[inline(always)]
pub fn wgs84_to_mercator(lat: f64, lon: f64) -> GeoPoint<f64> {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = lon * LON_TO_X_FACTOR;
    let lat_rad = lat.to_radians();
    let y = (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() * Y_FACTOR;
    GeoPoint::new(x, y)
}

/// Convert Web Mercator (x, y) in meters back to WGS84 (lat, lon) in degrees
#[inline(always)]
pub fn mercator_to_wgs84(x: f64, y: f64) -> (f64, f64) {
    let lon = x / LON_TO_X_FACTOR;
    let lat = (std::f64::consts::PI / 2.0 - 2.0 * (-y / Y_FACTOR).exp().atan()).to_degrees();
    (lat, lon)
}

/// Project a fixed-point coordinate to Web Mercator, `None` if invalid
#[inline]
pub fn coordinate_to_mercator(coord: Coordinate) -> Option<GeoPoint<f64>> {
    coord
        .is_valid()
        .then(|| wgs84_to_mercator(coord.lat_f(), coord.lon_f()))
}

/// Haversine distance between two positions given in degrees, in meters
fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Great-circle distance between two coordinates in meters
#[inline]
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    haversine(a.lat_f(), a.lon_f(), b.lat_f(), b.lon_f())
}

/// Distance from `coord` to the closest segment of an outer path, in meters
///
/// `path` is the output of outer path assembly and may contain several rings
/// back to back; the connecting step from one closed ring to the start of the
/// next is not a real edge and is skipped. An empty path is infinitely far away.
pub fn distance_to_path(path: &[&Point], coord: Coordinate) -> f64 {
    match path {
        [] => f64::INFINITY,
        [single] => distance(single.coordinate, coord),
        _ => {
            let mut dist = f64::INFINITY;
            let mut ring_start = path[0].id;
            let mut skip_next = false;
            for pair in path.windows(2) {
                let (from, to) = (pair[0], pair[1]);
                if skip_next {
                    skip_next = false;
                    ring_start = to.id;
                    continue;
                }
                dist = dist.min(distance_to_segment(from.coordinate, to.coordinate, coord));
                if to.id == ring_start {
                    skip_next = true;
                }
            }
            dist
        }
    }
}

/// Distance to a segment, projecting in degree space
fn distance_to_segment(a: Coordinate, b: Coordinate, p: Coordinate) -> f64 {
    let (ax, ay) = (a.lat_f(), a.lon_f());
    let (bx, by) = (b.lat_f(), b.lon_f());
    let (px, py) = (p.lat_f(), p.lon_f());

    let (dx, dy) = (bx - ax, by - ay);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return distance(a, p);
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
    haversine(ax + t * dx, ay + t * dy, px, py)
}
