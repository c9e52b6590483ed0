//! Resistance and speed physics for the ride simulation.
//!
//! A simplified road model: rolling resistance, quadratic aerodynamic drag
//! and a gravitational grade term, mapped onto the trainer's dimensionless
//! 0-100 resistance scale through a single user-facing scaling factor.

/// Physics constants
const AIR_DENSITY: f64 = 1.225; // kg/m³ at sea level
const GRAVITY: f64 = 9.81; // m/s²
const DEFAULT_CDA: f64 = 0.32; // m² (hoods position)
const DEFAULT_CRR: f64 = 0.005; // Rolling resistance for road tires
const BIKE_MASS: f64 = 8.0; // kg

/// Default force-to-resistance scaling factor. Documented range 0.1-0.5.
pub const DEFAULT_RESISTANCE_SCALING: f64 = 0.2;

/// Default gradient smoothing factor. Valid range 0-0.95.
pub const DEFAULT_GRADIENT_SMOOTHING: f64 = 0.85;

/// Speed from cadence through the drivetrain.
///
/// Returns km/h; zero or negative cadence coasts to zero.
pub fn speed_kmh(cadence_rpm: f64, gear_ratio: f64, wheel_circumference_m: f64) -> f64 {
    if cadence_rpm <= 0.0 {
        return 0.0;
    }
    cadence_rpm * gear_ratio * wheel_circumference_m * 60.0 / 1000.0
}

/// Force at the wheel for a given speed, gradient and rider weight.
///
/// Sum of rolling resistance, aerodynamic drag and the grade component for
/// the rider plus a fixed bike mass. Descents reduce the total but never
/// invert it below zero.
pub fn wheel_force(speed_kmh: f64, gradient_percent: f64, weight_kg: f64) -> f64 {
    let v = (speed_kmh.max(0.0)) / 3.6;
    let mass = weight_kg + BIKE_MASS;

    // Small-angle normalization: sin(atan(g)) = g / sqrt(1 + g²)
    let grade = gradient_percent / 100.0;
    let norm = (1.0 + grade * grade).sqrt();
    let sin_g = grade / norm;
    let cos_g = 1.0 / norm;

    let rolling = DEFAULT_CRR * mass * GRAVITY * cos_g;
    let drag = 0.5 * AIR_DENSITY * DEFAULT_CDA * v * v;
    let grade_force = mass * GRAVITY * sin_g;

    (rolling + drag + grade_force).max(0.0)
}

/// Pedal-side force: wheel force scaled by the mechanical advantage of the
/// current gear.
pub fn pedal_force(wheel_force_n: f64, gear_ratio: f64) -> f64 {
    wheel_force_n * gear_ratio
}

/// Map a pedal force onto the trainer's 0-100 resistance scale.
///
/// `scaling` is the single calibration knob exposed to the user
/// (documented range 0.1-0.5, default 0.2).
pub fn map_force_to_resistance(pedal_force_n: f64, scaling: f64) -> f64 {
    (pedal_force_n * scaling).clamp(0.0, 100.0)
}

/// Exponential moving average over the raw gradient signal.
///
/// `factor` trades responsiveness for stability against GPS noise; 0
/// disables smoothing, values are clamped to [0, 0.95].
pub fn smooth_gradient(previous_smoothed: f64, raw_gradient: f64, factor: f64) -> f64 {
    let f = factor.clamp(0.0, 0.95);
    f * previous_smoothed + (1.0 - f) * raw_gradient
}
