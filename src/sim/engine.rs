//! Mode-aware simulation engine.
//!
//! Composes the virtual drivetrain and the physics model into a state
//! machine over the three ride modes. Owned by the session loop; never
//! shared across tasks.

use crate::sim::gears::GearSet;
use crate::sim::physics;
use crate::sim::{EngineState, Mode};

/// FREE-mode resistance is scaled relative to this gear ratio.
const REFERENCE_RATIO: f64 = 2.5;

/// Starting base resistance for FREE mode.
const DEFAULT_MANUAL_RESISTANCE: f64 = 20.0;

/// Gradient inputs outside this range are sensor noise.
const MAX_GRADIENT: f64 = 50.0;

/// Rider and bike parameters the engine simulates with.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Wheel circumference in meters
    pub wheel_circumference_m: f64,
    /// Rider weight in kilograms
    pub rider_weight_kg: f64,
    /// Force-to-resistance scaling factor (0.1-0.5)
    pub resistance_scaling: f64,
    /// Gradient EMA factor (0-0.95)
    pub gradient_smoothing: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            wheel_circumference_m: 2.1,
            rider_weight_kg: 75.0,
            resistance_scaling: physics::DEFAULT_RESISTANCE_SCALING,
            gradient_smoothing: physics::DEFAULT_GRADIENT_SMOOTHING,
        }
    }
}

/// The ride simulation state machine.
///
/// `update` computes a fresh [`EngineState`] from the latest trainer sample;
/// `tick` advances distance and elapsed time. All inputs are defensively
/// clamped; no operation here can fail.
pub struct SimulationEngine {
    gears: GearSet,
    settings: EngineSettings,
    mode: Mode,
    target_power: u16,
    manual_resistance: f64,
    smoothed_gradient: Option<f64>,
    distance_m: f64,
    elapsed_s: f64,
}

impl SimulationEngine {
    /// Create an engine with the given drivetrain and settings.
    pub fn new(gears: GearSet, settings: EngineSettings) -> Self {
        Self {
            gears,
            settings,
            mode: Mode::Sim,
            target_power: 150,
            manual_resistance: DEFAULT_MANUAL_RESISTANCE,
            smoothed_gradient: None,
            distance_m: 0.0,
            elapsed_s: 0.0,
        }
    }

    /// Compute a fresh state snapshot from the latest trainer sample.
    ///
    /// Recomputes the smoothed gradient as a side effect when in SIM mode.
    pub fn update(&mut self, cadence_rpm: f64, power_w: f64, gradient_percent: f64) -> EngineState {
        let cadence = cadence_rpm.max(0.0);
        let power = power_w.max(0.0);
        let raw_gradient = gradient_percent.clamp(-MAX_GRADIENT, MAX_GRADIENT);

        let ratio = self.gears.ratio();
        let speed = physics::speed_kmh(cadence, ratio, self.settings.wheel_circumference_m);

        let gradient = if self.mode == Mode::Sim {
            let previous = self.smoothed_gradient.unwrap_or(raw_gradient);
            let smoothed =
                physics::smooth_gradient(previous, raw_gradient, self.settings.gradient_smoothing);
            self.smoothed_gradient = Some(smoothed);
            smoothed
        } else {
            raw_gradient
        };

        let resistance = match self.mode {
            Mode::Sim => {
                let wheel = physics::wheel_force(speed, gradient, self.settings.rider_weight_kg);
                let pedal = physics::pedal_force(wheel, ratio);
                physics::map_force_to_resistance(pedal, self.settings.resistance_scaling)
            }
            Mode::Erg => 0.0,
            Mode::Free => (self.manual_resistance * ratio / REFERENCE_RATIO).clamp(0.0, 100.0),
        };

        EngineState {
            cadence_rpm: cadence,
            power_w: power,
            speed_kmh: speed,
            resistance,
            target_power: self.target_power,
            gradient_percent: gradient,
            gear_ratio: ratio,
            gear_label: self.gears.label(),
            mode: self.mode,
            distance_m: self.distance_m,
            elapsed_s: self.elapsed_s,
        }
    }

    /// Advance cumulative distance and elapsed time by one sample interval.
    pub fn tick(&mut self, delta_seconds: f64, speed_kmh: f64) {
        let dt = delta_seconds.max(0.0);
        self.distance_m += speed_kmh.max(0.0) / 3.6 * dt;
        self.elapsed_s += dt;
    }

    /// Shift to a harder gear.
    pub fn shift_up(&mut self) {
        self.gears.shift_up();
        tracing::debug!(gear = %self.gears.label(), "shifted up");
    }

    /// Shift to an easier gear.
    pub fn shift_down(&mut self) {
        self.gears.shift_down();
        tracing::debug!(gear = %self.gears.label(), "shifted down");
    }

    /// Switch simulation mode.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        tracing::info!(%mode, "simulation mode changed");
    }

    /// Current simulation mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Set the ERG target power in watts.
    pub fn set_target_power(&mut self, watts: u16) {
        self.target_power = watts;
    }

    /// Set the FREE-mode base resistance, clamped to 0-100.
    pub fn set_manual_resistance(&mut self, level: f64) {
        self.manual_resistance = level.clamp(0.0, 100.0);
    }

    /// Nudge the FREE-mode base resistance by a delta, clamped to 0-100.
    pub fn adjust_manual_resistance(&mut self, delta: f64) {
        self.set_manual_resistance(self.manual_resistance + delta);
    }

    /// Cumulative ride distance in meters.
    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    /// Elapsed riding time in seconds.
    pub fn elapsed_s(&self) -> f64 {
        self.elapsed_s
    }
}
