//! Ride simulation: virtual drivetrain, physics model and the mode-aware
//! simulation engine that turns trainer samples into resistance commands.

pub mod engine;
pub mod gears;
pub mod physics;

use serde::{Deserialize, Serialize};

/// Simulation mode for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Resistance follows the route gradient through the physics model.
    #[default]
    Sim,
    /// Trainer holds a fixed power target regardless of cadence or gear.
    Erg,
    /// Manually adjusted base resistance scaled by the current gear.
    Free,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Sim => write!(f, "SIM"),
            Mode::Erg => write!(f, "ERG"),
            Mode::Free => write!(f, "FREE"),
        }
    }
}

/// Immutable snapshot of the engine after an update.
///
/// Produced fresh on every `update` call; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct EngineState {
    /// Cadence in RPM (clamped input)
    pub cadence_rpm: f64,
    /// Power in watts (clamped input)
    pub power_w: f64,
    /// Simulated speed in km/h
    pub speed_kmh: f64,
    /// Resistance level 0-100 (unused in ERG mode)
    pub resistance: f64,
    /// ERG target power in watts
    pub target_power: u16,
    /// Effective gradient in percent (smoothed in SIM mode)
    pub gradient_percent: f64,
    /// Current gear ratio
    pub gear_ratio: f64,
    /// Current gear rendered as `"{chainring}x{cog}"`
    pub gear_label: String,
    /// Active simulation mode
    pub mode: Mode,
    /// Cumulative ride distance in meters
    pub distance_m: f64,
    /// Elapsed riding time in seconds
    pub elapsed_s: f64,
}
