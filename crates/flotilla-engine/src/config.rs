//! Run configuration, validation, and TOML loading.
//!
//! [`SimConfig`] is everything a run needs: the physical description plus
//! the step size, pacing and optional duration limit. It is read-only for
//! the lifetime of a run; changing any value means
//! [`reset_with`](crate::Simulation::reset_with) a new config.

use std::path::Path;
use std::time::Duration;

use flotilla_core::ConfigError;
use flotilla_physics::PhysicsConfig;
use serde::{Deserialize, Serialize};

/// Round-off allowance when converting a duration limit into a step count.
const STEP_LIMIT_EPSILON: f64 = 1e-9;

// ── SimConfig ──────────────────────────────────────────────────────

/// Complete configuration for one simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Physical parameters.
    pub physics: PhysicsConfig,
    /// Fixed simulation step in seconds. Default: 0.1.
    pub dt: f64,
    /// Simulated seconds after which the run stops by itself. Default: none.
    pub max_duration: Option<f64>,
    /// Simulated seconds per wall-clock second. `None` steps as fast as
    /// possible. Default: 1.0.
    pub time_scale: Option<f64>,
    /// Keep the system after `stop()` so it can be inspected and stepped
    /// manually. Default: true.
    pub retain_on_stop: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            dt: 0.1,
            max_duration: None,
            time_scale: Some(1.0),
            retain_on_stop: true,
        }
    }
}

impl SimConfig {
    /// Validate physical and run invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.physics.validate()?;
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ConfigError::NotPositive {
                param: "dt",
                value: self.dt,
            });
        }
        if let Some(limit) = self.max_duration {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(ConfigError::NotPositive {
                    param: "max_duration",
                    value: limit,
                });
            }
        }
        // The wall budget dt / k must also fit in a Duration.
        if let Some(k) = self.time_scale {
            if !(k.is_finite() && k > 0.0 && Duration::try_from_secs_f64(self.dt / k).is_ok()) {
                return Err(ConfigError::NotPositive {
                    param: "time_scale",
                    value: k,
                });
            }
        }
        Ok(())
    }

    /// Number of steps after which the run ends, if a duration is set.
    ///
    /// Always at least one step.
    pub fn step_limit(&self) -> Option<u64> {
        self.max_duration
            .map(|limit| ((limit / self.dt - STEP_LIMIT_EPSILON).ceil() as u64).max(1))
    }

    /// Wall-clock seconds each step should take, or `None` when unpaced.
    pub fn step_budget_secs(&self) -> Option<f64> {
        self.time_scale.map(|k| self.dt / k)
    }

    /// This config with pacing disabled.
    pub fn unpaced(self) -> Self {
        Self {
            time_scale: None,
            ..self
        }
    }

    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Render as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            reason: e.to_string(),
        })
    }
}
