//! Climb detection over a route's gradient profile.

use crate::route::Route;

/// A contiguous route span whose gradient and elevation gain exceed the
/// configured thresholds. Derived data, recomputed on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Climb {
    /// Distance where the climb starts, meters from route start
    pub start_distance: f64,
    /// Distance where the climb ends
    pub end_distance: f64,
    /// Elevation at the start, meters
    pub start_elevation: f64,
    /// Elevation at the end, meters
    pub end_elevation: f64,
    /// Average gradient over the climb, percent
    pub average_gradient: f64,
    /// Steepest segment gradient seen, percent
    pub max_gradient: f64,
}

impl Climb {
    /// Climb length in meters.
    pub fn length(&self) -> f64 {
        self.end_distance - self.start_distance
    }

    /// Elevation gained over the climb in meters.
    pub fn elevation_gain(&self) -> f64 {
        self.end_elevation - self.start_elevation
    }
}

impl Route {
    /// Scan the route for climbs.
    ///
    /// A climb opens when a segment's gradient reaches `gradient_threshold`
    /// (percent) and extends while consecutive segments stay at or above
    /// it. Climbs gaining less than `elevation_threshold` meters are
    /// discarded.
    pub fn detect_climbs(&self, gradient_threshold: f64, elevation_threshold: f64) -> Vec<Climb> {
        let mut climbs = Vec::new();
        let mut open: Option<Climb> = None;

        for pair in self.points().windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let span = b.distance - a.distance;
            let gradient = if span > 0.0 {
                (b.elevation - a.elevation) / span * 100.0
            } else {
                0.0
            };

            if gradient >= gradient_threshold {
                let climb = open.get_or_insert(Climb {
                    start_distance: a.distance,
                    end_distance: a.distance,
                    start_elevation: a.elevation,
                    end_elevation: a.elevation,
                    average_gradient: 0.0,
                    max_gradient: gradient,
                });
                climb.end_distance = b.distance;
                climb.end_elevation = b.elevation;
                climb.max_gradient = climb.max_gradient.max(gradient);
            } else if let Some(climb) = open.take() {
                push_if_significant(&mut climbs, climb, elevation_threshold);
            }
        }

        if let Some(climb) = open.take() {
            push_if_significant(&mut climbs, climb, elevation_threshold);
        }

        climbs
    }

    /// Whether any climb starts within `(current, current + lookahead]`.
    pub fn climb_approaching(
        &self,
        current_distance: f64,
        lookahead_m: f64,
        gradient_threshold: f64,
        elevation_threshold: f64,
    ) -> bool {
        self.detect_climbs(gradient_threshold, elevation_threshold)
            .iter()
            .any(|c| {
                c.start_distance > current_distance
                    && c.start_distance <= current_distance + lookahead_m
            })
    }
}

fn push_if_significant(climbs: &mut Vec<Climb>, mut climb: Climb, elevation_threshold: f64) {
    let gain = climb.elevation_gain();
    if gain < elevation_threshold {
        return;
    }
    let length = climb.length();
    climb.average_gradient = if length > 0.0 {
        gain / length * 100.0
    } else {
        0.0
    };
    climbs.push(climb);
}
