//! Distance-indexed route model and query engine.
//!
//! A route is an immutable, distance-sorted sequence of GPS points. Queries
//! scan forward from the start; route sizes are bounded so the linear scan
//! is fine.

pub mod climbs;
pub mod gpx;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use climbs::Climb;
pub use gpx::load_gpx;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A point along a route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePoint {
    /// GPS latitude in degrees
    pub latitude: f64,
    /// GPS longitude in degrees
    pub longitude: f64,
    /// Elevation in meters
    pub elevation: f64,
    /// Cumulative distance from the route start in meters
    pub distance: f64,
}

/// Errors from route loading.
#[derive(Debug, Error)]
pub enum RouteError {
    /// File could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// GPX content could not be parsed
    #[error("GPX parse error: {0}")]
    Parse(String),

    /// File parsed but contained no usable points
    #[error("no GPS points found in route")]
    Empty,
}

/// An immutable route: ordered points plus aggregate stats.
///
/// Point distances are non-decreasing; consecutive points may share a
/// distance (zero-length segment) and every query degrades to a defined
/// fallback instead of dividing by zero.
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    points: Vec<RoutePoint>,
    total_distance: f64,
    total_ascent: f64,
    total_descent: f64,
}

impl Route {
    /// Build a route from pre-computed points.
    pub fn new(name: impl Into<String>, points: Vec<RoutePoint>) -> Self {
        let total_distance = points.last().map(|p| p.distance).unwrap_or(0.0);
        let mut total_ascent = 0.0;
        let mut total_descent = 0.0;
        for pair in points.windows(2) {
            let delta = pair[1].elevation - pair[0].elevation;
            if delta > 0.0 {
                total_ascent += delta;
            } else {
                total_descent -= delta;
            }
        }

        Self {
            name: name.into(),
            points,
            total_distance,
            total_ascent,
            total_descent,
        }
    }

    /// Route display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered route points.
    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    /// Total route length in meters.
    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    /// Total climbing in meters.
    pub fn total_ascent(&self) -> f64 {
        self.total_ascent
    }

    /// Total descending in meters.
    pub fn total_descent(&self) -> f64 {
        self.total_descent
    }

    /// Gradient in percent at a distance along the route.
    ///
    /// Uses the segment bracketing the query distance; zero-length segments
    /// and routes with fewer than two points report 0. Past the end, the
    /// gradient of the final non-degenerate segment applies.
    pub fn gradient_at(&self, distance: f64) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }

        for (i, point) in self.points.iter().enumerate() {
            if point.distance >= distance {
                let (a, b) = if i == 0 {
                    (&self.points[0], &self.points[1])
                } else {
                    (&self.points[i - 1], &self.points[i])
                };
                return segment_gradient(a, b);
            }
        }

        // Past the end: gradient of the last non-degenerate segment
        for pair in self.points.windows(2).rev() {
            if pair[1].distance > pair[0].distance {
                return segment_gradient(&pair[0], &pair[1]);
            }
        }
        0.0
    }

    /// Interpolated elevation in meters at a distance along the route.
    pub fn elevation_at(&self, distance: f64) -> f64 {
        self.interpolate(distance, |p| p.elevation)
    }

    /// Interpolated (latitude, longitude) at a distance along the route.
    pub fn position_at(&self, distance: f64) -> (f64, f64) {
        (
            self.interpolate(distance, |p| p.latitude),
            self.interpolate(distance, |p| p.longitude),
        )
    }

    /// Linear interpolation of a point field within the bracketing segment.
    ///
    /// Distances at or before the start return the first point's value,
    /// distances past the end return the last point's value.
    fn interpolate(&self, distance: f64, field: impl Fn(&RoutePoint) -> f64) -> f64 {
        let Some(first) = self.points.first() else {
            return 0.0;
        };
        if distance <= first.distance {
            return field(first);
        }

        for (i, point) in self.points.iter().enumerate() {
            if point.distance >= distance {
                let prev = &self.points[i - 1];
                let span = point.distance - prev.distance;
                if span <= 0.0 {
                    return field(point);
                }
                let t = (distance - prev.distance) / span;
                return field(prev) + (field(point) - field(prev)) * t;
            }
        }

        // Past the end
        self.points.last().map(&field).unwrap_or(0.0)
    }
}

fn segment_gradient(a: &RoutePoint, b: &RoutePoint) -> f64 {
    let span = b.distance - a.distance;
    if span <= 0.0 {
        return 0.0;
    }
    (b.elevation - a.elevation) / span * 100.0
}

/// Great-circle distance between two GPS points in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(distance: f64, elevation: f64) -> RoutePoint {
        RoutePoint {
            latitude: 45.5,
            longitude: -122.5,
            elevation,
            distance,
        }
    }

    fn test_route() -> Route {
        Route::new(
            "Test Route",
            vec![
                point(0.0, 100.0),
                point(500.0, 110.0),
                point(1000.0, 100.0),
            ],
        )
    }

    #[test]
    fn test_totals() {
        let route = test_route();
        assert_eq!(route.total_distance(), 1000.0);
        assert!((route.total_ascent() - 10.0).abs() < 1e-9);
        assert!((route.total_descent() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_gradient_at_midpoints() {
        let route = test_route();
        // 10 m over 500 m = 2%
        assert!((route.gradient_at(250.0) - 2.0).abs() < 1e-9);
        assert!((route.gradient_at(750.0) + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_gradient_past_end_uses_last_segment() {
        let route = test_route();
        assert!((route.gradient_at(5000.0) + 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_gradient_degenerate_routes() {
        let empty = Route::new("empty", vec![]);
        assert_eq!(empty.gradient_at(100.0), 0.0);

        let single = Route::new("single", vec![point(0.0, 100.0)]);
        assert_eq!(single.gradient_at(0.0), 0.0);

        // Zero-length segment must not divide by zero
        let dup = Route::new("dup", vec![point(0.0, 100.0), point(0.0, 120.0)]);
        assert_eq!(dup.gradient_at(0.0), 0.0);
    }

    #[test]
    fn test_elevation_round_trips_endpoints() {
        let route = test_route();
        assert_eq!(route.elevation_at(0.0), 100.0);
        assert_eq!(route.elevation_at(route.total_distance()), 100.0);
        assert_eq!(route.elevation_at(-50.0), 100.0);
        assert_eq!(route.elevation_at(99_999.0), 100.0);
    }

    #[test]
    fn test_elevation_interpolates() {
        let route = test_route();
        assert!((route.elevation_at(250.0) - 105.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_interpolates() {
        let route = Route::new(
            "line",
            vec![
                RoutePoint {
                    latitude: 45.0,
                    longitude: -122.0,
                    elevation: 0.0,
                    distance: 0.0,
                },
                RoutePoint {
                    latitude: 46.0,
                    longitude: -121.0,
                    elevation: 0.0,
                    distance: 1000.0,
                },
            ],
        );
        let (lat, lon) = route.position_at(500.0);
        assert!((lat - 45.5).abs() < 1e-9);
        assert!((lon + 121.5).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_known_distance() {
        // One degree of latitude is about 111.2 km
        let d = haversine_distance(45.0, -122.0, 46.0, -122.0);
        assert!((d - 111_200.0).abs() < 1000.0, "distance was {d}");
    }
}
