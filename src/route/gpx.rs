//! GPX file loading into the route model.

use crate::route::{haversine_distance, Route, RouteError, RoutePoint};
use std::path::Path;

/// Load a route from a GPX file.
pub fn load_gpx(path: &Path) -> Result<Route, RouteError> {
    let content = std::fs::read(path)?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("route")
        .to_string();
    parse_gpx(&content, name)
}

/// Parse GPX content into a route.
///
/// Track points are preferred; routes and bare waypoints are fallbacks.
/// The route name comes from the first track, first route or the file
/// metadata, in that order.
pub fn parse_gpx(content: &[u8], fallback_name: String) -> Result<Route, RouteError> {
    let gpx_data: gpx::Gpx =
        gpx::read(content).map_err(|e| RouteError::Parse(e.to_string()))?;

    let name = gpx_data
        .tracks
        .first()
        .and_then(|t| t.name.clone())
        .or_else(|| gpx_data.routes.first().and_then(|r| r.name.clone()))
        .or_else(|| gpx_data.metadata.as_ref().and_then(|m| m.name.clone()))
        .unwrap_or(fallback_name);

    let mut waypoints = Vec::new();
    for track in &gpx_data.tracks {
        for segment in &track.segments {
            waypoints.extend(segment.points.iter().cloned());
        }
    }
    if waypoints.is_empty() {
        for route in &gpx_data.routes {
            waypoints.extend(route.points.iter().cloned());
        }
    }
    if waypoints.is_empty() {
        waypoints.extend(gpx_data.waypoints.iter().cloned());
    }
    if waypoints.is_empty() {
        return Err(RouteError::Empty);
    }

    let mut points: Vec<RoutePoint> = Vec::with_capacity(waypoints.len());
    let mut distance = 0.0;
    let mut last_elevation = 0.0;

    for wp in &waypoints {
        let latitude = wp.point().y();
        let longitude = wp.point().x();
        let elevation = wp.elevation.unwrap_or(last_elevation);
        last_elevation = elevation;

        if let Some(prev) = points.last() {
            distance += haversine_distance(prev.latitude, prev.longitude, latitude, longitude);
        }

        points.push(RoutePoint {
            latitude,
            longitude,
            elevation,
            distance,
        });
    }

    let route = Route::new(name, points);
    tracing::info!(
        name = %route.name(),
        points = route.points().len(),
        distance_m = route.total_distance(),
        ascent_m = route.total_ascent(),
        "route loaded"
    );
    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_GPX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1" creator="test">
  <trk>
    <name>Col du Test</name>
    <trkseg>
      <trkpt lat="45.5" lon="-122.5">
        <ele>100</ele>
      </trkpt>
      <trkpt lat="45.51" lon="-122.5">
        <ele>110</ele>
      </trkpt>
    </trkseg>
  </trk>
</gpx>"#;

    #[test]
    fn test_parse_gpx_basic() {
        let route = parse_gpx(SAMPLE_GPX.as_bytes(), "fallback".to_string()).unwrap();
        assert_eq!(route.name(), "Col du Test");
        assert_eq!(route.points().len(), 2);

        // 0.01 degrees of latitude is roughly 1.1 km
        let expected = haversine_distance(45.5, -122.5, 45.51, -122.5);
        assert!((route.total_distance() - expected).abs() < 1e-6);
        assert!((route.total_ascent() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_gpx_missing_elevation_carries_forward() {
        let gpx = r#"<?xml version="1.0"?>
<gpx version="1.1" creator="test">
  <trk><trkseg>
    <trkpt lat="45.5" lon="-122.5"><ele>100</ele></trkpt>
    <trkpt lat="45.51" lon="-122.5"></trkpt>
  </trkseg></trk>
</gpx>"#;
        let route = parse_gpx(gpx.as_bytes(), "x".to_string()).unwrap();
        assert_eq!(route.points()[1].elevation, 100.0);
    }

    #[test]
    fn test_parse_gpx_empty_is_error() {
        let gpx = r#"<?xml version="1.0"?><gpx version="1.1" creator="test"></gpx>"#;
        assert!(matches!(
            parse_gpx(gpx.as_bytes(), "x".to_string()),
            Err(RouteError::Empty)
        ));
    }
}
