//! Ride recording types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single recorded point during a ride.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidePoint {
    /// Wall-clock timestamp of the sample
    pub timestamp: DateTime<Utc>,
    /// Power in watts
    pub power_w: f64,
    /// Cadence in RPM
    pub cadence_rpm: f64,
    /// Simulated speed in km/h
    pub speed_kmh: f64,
    /// GPS latitude, when riding a route
    pub latitude: Option<f64>,
    /// GPS longitude, when riding a route
    pub longitude: Option<f64>,
    /// Elevation in meters, when riding a route
    pub elevation: Option<f64>,
    /// Cumulative distance in meters
    pub distance_m: f64,
    /// Gradient in percent
    pub gradient_percent: f64,
    /// Gear label, e.g. "50x17"
    pub gear: String,
}

/// Averages over the active (unpaused) portion of a ride.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RideSummary {
    /// Average power in watts
    pub avg_power_w: f64,
    /// Average cadence in RPM
    pub avg_cadence_rpm: f64,
    /// Average speed in km/h
    pub avg_speed_kmh: f64,
    /// Total distance in meters
    pub distance_m: f64,
    /// Active riding time in seconds
    pub duration_s: f64,
}

/// A completed ride ready for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    /// Unique identifier
    pub id: Uuid,
    /// Ride start timestamp
    pub started_at: DateTime<Utc>,
    /// Ride end timestamp
    pub ended_at: DateTime<Utc>,
    /// Name of the route ridden, if any
    pub route_name: Option<String>,
    /// Summary averages
    pub summary: RideSummary,
    /// Ordered recorded points
    pub points: Vec<RidePoint>,
}
