//! In-memory ride log.
//!
//! Owned by the session loop. The log carries its own pause flag, mirrored
//! from the loop's, so that recording and the loop's gating never disagree.

use crate::recording::types::{Ride, RidePoint, RideSummary};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Accumulates ride points for the active session.
#[derive(Debug)]
pub struct RideLog {
    id: Uuid,
    started_at: DateTime<Utc>,
    route_name: Option<String>,
    points: Vec<RidePoint>,
    paused: bool,
}

impl RideLog {
    /// Start a new log at the current time.
    pub fn new(route_name: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            route_name,
            points: Vec::new(),
            paused: false,
        }
    }

    /// Append a point. Silently dropped while paused, so paused periods are
    /// excluded from the recorded ride.
    pub fn record(&mut self, point: RidePoint) {
        if self.paused {
            return;
        }
        self.points.push(point);
    }

    /// Stop recording points until resumed.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resume recording points.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Whether recording is currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Number of points recorded so far.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether any points have been recorded.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Close the log into a persistable ride with the given summary.
    pub fn finish(self, summary: RideSummary) -> Ride {
        Ride {
            id: self.id,
            started_at: self.started_at,
            ended_at: Utc::now(),
            route_name: self.route_name,
            summary,
            points: self.points,
        }
    }
}
