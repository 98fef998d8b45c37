//! Runtime configuration
//!
//! Stored as JSON; every field has a default so a partial file (or none at
//! all) yields a working setup.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::fleet::{SPEED_MAX, SPEED_MIN};

/// Errors loading or checking a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue {
        /// Dotted path of the field
        field: String,
        /// What is wrong with it
        message: String,
    },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Simulation clock settings
    pub simulation: SimulationConfig,
    /// Live tracking settings
    pub tracking: TrackingConfig,
    /// Persistence settings
    pub storage: StorageConfig,
}

/// Simulation clock settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Period between position ticks
    pub tick_interval_ms: u64,
    /// Fraction of the remaining distance covered per tick
    pub step_fraction: f64,
    /// Full width of the symmetric random speed delta (10.0 means ±5)
    pub speed_jitter: f64,
    /// Lower speed bound (km/h)
    pub speed_min: f64,
    /// Upper speed bound (km/h)
    pub speed_max: f64,
    /// Period between status reshuffles
    pub status_refresh_ms: u64,
    /// Chance that a vehicle changes status on a reshuffle
    pub status_change_probability: f64,
    /// Fixed RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 10_000,
            step_fraction: 0.01,
            speed_jitter: 10.0,
            speed_min: SPEED_MIN,
            speed_max: SPEED_MAX,
            status_refresh_ms: 30_000,
            status_change_probability: 0.2,
            seed: None,
        }
    }
}

impl SimulationConfig {
    /// Tick period
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Status reshuffle period
    pub fn status_refresh(&self) -> Duration {
        Duration::from_millis(self.status_refresh_ms)
    }
}

/// Live tracking settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Bound on the first location fix
    pub initial_fix_timeout_ms: u64,
    /// Bound between continuous updates before a timeout is logged
    pub watch_timeout_ms: u64,
    /// Period of the display heartbeat
    pub heartbeat_interval_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            initial_fix_timeout_ms: 10_000,
            watch_timeout_ms: 15_000,
            heartbeat_interval_ms: 10_000,
        }
    }
}

impl TrackingConfig {
    /// Bound on the first fix
    pub fn initial_fix_timeout(&self) -> Duration {
        Duration::from_millis(self.initial_fix_timeout_ms)
    }

    /// Bound between watch updates
    pub fn watch_timeout(&self) -> Duration {
        Duration::from_millis(self.watch_timeout_ms)
    }

    /// Heartbeat period
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

/// Persistence settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Where the file store lives; defaults to the platform data dir
    pub data_dir: Option<PathBuf>,
}

impl FleetConfig {
    /// Parse from JSON text and validate
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: FleetConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file and validate
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Write as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Check every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let sim = &self.simulation;

        if !(sim.step_fraction > 0.0 && sim.step_fraction < 1.0) {
            return Err(invalid("simulation.step_fraction", "must be between 0 and 1"));
        }
        if !sim.speed_jitter.is_finite() || sim.speed_jitter < 0.0 {
            return Err(invalid("simulation.speed_jitter", "must be a non-negative number"));
        }
        if !(sim.speed_min.is_finite() && sim.speed_max.is_finite())
            || sim.speed_min >= sim.speed_max
        {
            return Err(invalid("simulation.speed_min", "must be below speed_max"));
        }
        if !(0.0..=1.0).contains(&sim.status_change_probability) {
            return Err(invalid(
                "simulation.status_change_probability",
                "must be between 0 and 1",
            ));
        }

        let intervals = [
            ("simulation.tick_interval_ms", sim.tick_interval_ms),
            ("simulation.status_refresh_ms", sim.status_refresh_ms),
            ("tracking.initial_fix_timeout_ms", self.tracking.initial_fix_timeout_ms),
            ("tracking.watch_timeout_ms", self.tracking.watch_timeout_ms),
            ("tracking.heartbeat_interval_ms", self.tracking.heartbeat_interval_ms),
        ];
        for (field, value) in intervals {
            if value == 0 {
                return Err(invalid(field, "must be greater than zero"));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = FleetConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.tick_interval(), Duration::from_secs(10));
        assert_eq!(config.tracking.watch_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config =
            FleetConfig::from_json(r#"{ "simulation": { "seed": 7, "step_fraction": 0.05 } }"#)
                .unwrap();
        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.step_fraction, 0.05);
        assert_eq!(config.simulation.speed_max, 60.0);
        assert_eq!(config.tracking, TrackingConfig::default());
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = FleetConfig::from_json(r#"{ "simulation": { "step_fraction": 1.5 } }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "simulation.step_fraction"));

        let err = FleetConfig::from_json(r#"{ "tracking": { "heartbeat_interval_ms": 0 } }"#)
            .unwrap_err();
        assert!(err.to_string().contains("heartbeat_interval_ms"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fleet.json");

        let mut config = FleetConfig::default();
        config.storage.data_dir = Some(dir.path().join("data"));
        config.save(&path).unwrap();

        assert_eq!(FleetConfig::load(&path).unwrap(), config);
    }
}
