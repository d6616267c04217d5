//! Distances and angles on the Earth's surface.

use serde::Serialize;

/// Earth's radius for WGS84 in meters
pub const EARTH_RADIUS_IN_METERS: f64 = 6_372_797.560_856;

/// Number of fixed-point units per degree in which node locations are stored.
pub const COORDINATE_PRECISION: i32 = 10_000_000;

/// A location given by latitude and longitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Creates a point from fixed-point coordinates (1e-7 degrees).
    pub fn from_fixed(lat: i32, lon: i32) -> Self {
        Self {
            lat: f64::from(lat) / f64::from(COORDINATE_PRECISION),
            lon: f64::from(lon) / f64::from(COORDINATE_PRECISION),
        }
    }
}

/// Great-circle distance in meters between two points (haversine formula).
pub fn distance(p1: GeoPoint, p2: GeoPoint) -> f64 {
    let mut lonh = ((p1.lon - p2.lon).to_radians() * 0.5).sin();
    lonh *= lonh;
    let mut lath = ((p1.lat - p2.lat).to_radians() * 0.5).sin();
    lath *= lath;
    let tmp = p1.lat.to_radians().cos() * p2.lat.to_radians().cos();
    2.0 * EARTH_RADIUS_IN_METERS * (lath + tmp * lonh).sqrt().asin()
}

/// Returns the interior angle in radians at `c` of the triangle `a`, `c`, `b`.
///
/// The angle is computed with the law of cosines from the three pairwise
/// haversine distances. The cosine is clamped to `[-1, 1]` before taking the
/// arccosine, so that rounding never leaves the domain of `acos`.
///
/// If `c` coincides with `a` or `b` the angle is undefined and `NaN` is
/// returned.
pub fn subtended_angle(a: GeoPoint, c: GeoPoint, b: GeoPoint) -> f64 {
    let dist_a = distance(c, b);
    let dist_b = distance(a, c);
    let dist_c = distance(a, b);

    let cos = (dist_a * dist_a + dist_b * dist_b - dist_c * dist_c) / (2.0 * dist_a * dist_b);
    cos.clamp(-1.0, 1.0).acos()
}
