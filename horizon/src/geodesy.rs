//! Spherical-earth helpers.
//!
//! Everything here treats the earth as a sphere of radius
//! [`EARTH_RADIUS_M`], which is plenty accurate over the tens of
//! kilometers a panorama spans.

use geo::{geometry::Coord, HaversineBearing, HaversineDistance, Point};
use num_traits::Float;
use std::f64::consts::TAU;

/// Mean earth radius (meters), the same one `geo`'s haversine
/// functions use.
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Returns `coord` moved `meters_north` and `meters_east`.
///
/// The longitude offset is scaled by the cosine of the starting
/// latitude, so the result is only locally valid. Longitude wraps
/// into `[-180, 180)`.
pub fn move_by(coord: Coord<f64>, meters_north: f64, meters_east: f64) -> Coord<f64> {
    let d_lat = (meters_north / EARTH_RADIUS_M).to_degrees();
    let d_lon = (meters_east / (EARTH_RADIUS_M * coord.y.to_radians().cos())).to_degrees();
    Coord {
        x: wrap_longitude(coord.x + d_lon),
        y: coord.y + d_lat,
    }
}

fn wrap_longitude(lon: f64) -> f64 {
    if (-180.0..180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Returns the great-circle distance (meters) between `a` and `b`.
pub fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Point::from(a).haversine_distance(&Point::from(b))
}

/// Returns the initial great-circle bearing from `a` to `b` in
/// radians, clockwise from north, in `[0, 2π)`.
pub fn bearing(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let theta = Point::from(a)
        .haversine_bearing(Point::from(b))
        .to_radians()
        .rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative angles.
    if theta >= TAU {
        0.0
    } else {
        theta
    }
}

/// Returns how much lower (meters) a point `distance_m` away appears
/// due to earth curvature.
///
/// Equal to `R(1 - cos(d/R))`, evaluated as `2R·sin²(d/2R)` to avoid
/// cancellation at short distances.
pub fn curvature_drop<T>(distance_m: T, earth_radius: T) -> T
where
    T: Float,
{
    let two = T::one() + T::one();
    let half_angle = distance_m / (two * earth_radius);
    two * earth_radius * half_angle.sin().powi(2)
}
