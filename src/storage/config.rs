//! Application configuration loaded from TOML.
//!
//! Unset or zero factors silently fall back to the documented defaults;
//! configuration never fails a session for a missing value.

use crate::sim::engine::EngineSettings;
use crate::sim::physics::{DEFAULT_GRADIENT_SMOOTHING, DEFAULT_RESISTANCE_SCALING};
use crate::sim::Mode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File exists but could not be read
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// File read but is not valid TOML
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Virtual drivetrain and wheel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BikeConfig {
    /// Chainring tooth counts, big ring first
    pub chainrings: Vec<u8>,
    /// Cassette tooth counts, smallest cog first
    pub cassette: Vec<u8>,
    /// Wheel circumference in meters
    pub wheel_circumference_m: f64,
}

impl Default for BikeConfig {
    fn default() -> Self {
        Self {
            chainrings: vec![50, 34],
            cassette: vec![11, 12, 13, 14, 16, 18, 20, 22, 25, 28, 32],
            wheel_circumference_m: 2.1,
        }
    }
}

/// Rider parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiderConfig {
    /// Rider weight in kilograms
    pub weight_kg: f64,
}

impl Default for RiderConfig {
    fn default() -> Self {
        Self { weight_kg: 75.0 }
    }
}

/// Simulation tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Force-to-resistance scaling factor, 0.1-0.5 (0 = default)
    pub resistance_scaling: f64,
    /// Gradient EMA factor, 0-0.95 (0 = default)
    pub gradient_smoothing: f64,
    /// Mode the session starts in
    pub starting_mode: Mode,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            resistance_scaling: DEFAULT_RESISTANCE_SCALING,
            gradient_smoothing: DEFAULT_GRADIENT_SMOOTHING,
            starting_mode: Mode::Sim,
        }
    }
}

/// Trainer link settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Only connect to trainers whose name contains this string
    pub device_name: Option<String>,
    /// Depth of the outbound command queue (0 = default)
    pub command_queue_depth: usize,
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Drivetrain and wheel
    pub bike: BikeConfig,
    /// Rider parameters
    pub rider: RiderConfig,
    /// Simulation tuning
    pub simulation: SimulationConfig,
    /// Trainer link settings
    pub trainer: TrainerConfig,
}

impl AppConfig {
    /// Load from the platform config directory, or defaults when no file
    /// exists yet.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Platform config file location.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "veloshift")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Platform data directory for the ride database.
    pub fn data_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "veloshift")
            .map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Effective resistance scaling: zero/unset falls back to the default,
    /// everything else is clamped into the documented range.
    pub fn resistance_scaling(&self) -> f64 {
        let factor = self.simulation.resistance_scaling;
        if factor <= 0.0 {
            DEFAULT_RESISTANCE_SCALING
        } else {
            factor.clamp(0.1, 0.5)
        }
    }

    /// Effective gradient smoothing: zero/unset falls back to the default,
    /// everything else is clamped into the valid range.
    pub fn gradient_smoothing(&self) -> f64 {
        let factor = self.simulation.gradient_smoothing;
        if factor <= 0.0 {
            DEFAULT_GRADIENT_SMOOTHING
        } else {
            factor.min(0.95)
        }
    }

    /// Engine settings derived from this configuration.
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            wheel_circumference_m: self.bike.wheel_circumference_m,
            rider_weight_kg: self.rider.weight_kg,
            resistance_scaling: self.resistance_scaling(),
            gradient_smoothing: self.gradient_smoothing(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bike.chainrings, vec![50, 34]);
        assert_eq!(config.rider.weight_kg, 75.0);
        assert_eq!(config.resistance_scaling(), 0.2);
        assert_eq!(config.gradient_smoothing(), 0.85);
    }

    #[test]
    fn test_zero_factors_fall_back() {
        let mut config = AppConfig::default();
        config.simulation.resistance_scaling = 0.0;
        config.simulation.gradient_smoothing = 0.0;
        assert_eq!(config.resistance_scaling(), 0.2);
        assert_eq!(config.gradient_smoothing(), 0.85);
    }

    #[test]
    fn test_out_of_range_factors_clamped() {
        let mut config = AppConfig::default();
        config.simulation.resistance_scaling = 3.0;
        config.simulation.gradient_smoothing = 0.99;
        assert_eq!(config.resistance_scaling(), 0.5);
        assert_eq!(config.gradient_smoothing(), 0.95);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml = r#"
[rider]
weight_kg = 82.5

[simulation]
starting_mode = "erg"
"#;
        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.rider.weight_kg, 82.5);
        assert_eq!(config.simulation.starting_mode, Mode::Erg);
        // Untouched sections keep their defaults
        assert_eq!(config.bike.wheel_circumference_m, 2.1);
    }
}
