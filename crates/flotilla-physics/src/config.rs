//! Physical parameters and their validation.
//!
//! [`PhysicsConfig`] is read-only for the lifetime of a run: changing a
//! parameter means building a new [`System`](crate::System). Defaults
//! describe the reference scenario: four 5 kg floaters of 10 litres on a
//! 10 m loop in water.

use flotilla_core::ConfigError;
use serde::{Deserialize, Serialize};

// ── DragLaw ─────────────────────────────────────────────────────────

/// How drag magnitude scales with speed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DragLaw {
    /// `D = c · |v|`.
    Linear,
    /// `D = c · v²`.
    #[default]
    Quadratic,
}

impl DragLaw {
    /// Drag magnitude for the given coefficient and velocity. Always `>= 0`
    /// for finite inputs.
    pub fn magnitude(self, coefficient: f64, velocity: f64) -> f64 {
        match self {
            Self::Linear => coefficient * velocity.abs(),
            Self::Quadratic => coefficient * velocity * velocity,
        }
    }
}

// ── DrivetrainConfig ────────────────────────────────────────────────

/// Shared mechanical coupling between the floater chain and the output shaft.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrivetrainConfig {
    /// Sprocket radius converting chain force to torque (m). Default: 1.0.
    pub effective_radius: f64,
    /// Fraction of gross torque delivered to the shaft, in `(0, 1]`. Default: 1.0.
    pub efficiency: f64,
    /// Constant friction torque (N·m). Default: 0.0.
    pub constant_loss: f64,
    /// Viscous loss coefficient, torque per rad/s. Default: 0.0.
    pub viscous_loss: f64,
}

impl Default for DrivetrainConfig {
    fn default() -> Self {
        Self {
            effective_radius: 1.0,
            efficiency: 1.0,
            constant_loss: 0.0,
            viscous_loss: 0.0,
        }
    }
}

impl DrivetrainConfig {
    /// Check drivetrain invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("effective_radius", self.effective_radius)?;
        if !(self.efficiency > 0.0 && self.efficiency <= 1.0) {
            return Err(ConfigError::OutOfRange {
                param: "efficiency",
                value: self.efficiency,
                min: 0.0,
                max: 1.0,
            });
        }
        non_negative("constant_loss", self.constant_loss)?;
        non_negative("viscous_loss", self.viscous_loss)?;
        Ok(())
    }
}

// ── PhysicsConfig ───────────────────────────────────────────────────

/// Complete physical description of a floater system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Number of floaters, evenly spaced around the loop. Default: 4.
    pub n_floaters: u32,
    /// Total loop length (m). The ascending leg is the first half. Default: 10.
    pub loop_length: f64,
    /// Fluid density (kg/m³). Default: 1000.
    pub fluid_density: f64,
    /// Gravitational acceleration (m/s²). Default: 9.81.
    pub gravity: f64,
    /// Mass of one floater (kg). Default: 5.
    pub floater_mass: f64,
    /// Full displaced volume of one floater (m³). Default: 0.01.
    pub floater_volume: f64,
    /// Drag coefficient, units depend on [`drag_law`](Self::drag_law). Default: 0.2.
    pub drag_coefficient: f64,
    /// Drag scaling law. Default: quadratic.
    pub drag_law: DragLaw,
    /// Fraction of the full volume still displaced on the return path,
    /// in `[0, 1]`. Default: 0.0 (fully de-buoyed).
    pub return_volume_fraction: f64,
    /// Duration of each fill and vent hold (s). A hold always lasts at
    /// least one step. Default: 0.0.
    pub phase_duration: f64,
    /// Drivetrain parameters.
    pub drivetrain: DrivetrainConfig,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            n_floaters: 4,
            loop_length: 10.0,
            fluid_density: 1000.0,
            gravity: 9.81,
            floater_mass: 5.0,
            floater_volume: 0.01,
            drag_coefficient: 0.2,
            drag_law: DragLaw::Quadratic,
            return_volume_fraction: 0.0,
            phase_duration: 0.0,
            drivetrain: DrivetrainConfig::default(),
        }
    }
}

impl PhysicsConfig {
    /// Validate all physical invariants.
    ///
    /// Zero or negative mass, volume, and loop length are rejected here so
    /// that per-step code never has to tolerate them. So are floaters that
    /// could stall: buoyancy must exceed weight on the way up and fall
    /// short of it on the way down.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_floaters == 0 {
            return Err(ConfigError::NoFloaters);
        }
        positive("loop_length", self.loop_length)?;
        positive("fluid_density", self.fluid_density)?;
        positive("gravity", self.gravity)?;
        positive("floater_mass", self.floater_mass)?;
        positive("floater_volume", self.floater_volume)?;
        non_negative("drag_coefficient", self.drag_coefficient)?;
        if !(0.0..=1.0).contains(&self.return_volume_fraction) {
            return Err(ConfigError::OutOfRange {
                param: "return_volume_fraction",
                value: self.return_volume_fraction,
                min: 0.0,
                max: 1.0,
            });
        }
        non_negative("phase_duration", self.phase_duration)?;
        self.check_net_drive()?;
        self.drivetrain.validate()
    }

    /// Both legs need a forward net force at rest.
    fn check_net_drive(&self) -> Result<(), ConfigError> {
        let full = self.fluid_density * self.gravity * self.floater_volume;
        let weight = self.weight();
        if full <= weight {
            return Err(ConfigError::NoNetDrive {
                leg: "ascending",
                buoyancy: full,
                weight,
            });
        }
        let reduced = full * self.return_volume_fraction;
        if reduced >= weight {
            return Err(ConfigError::NoNetDrive {
                leg: "descending",
                buoyancy: reduced,
                weight,
            });
        }
        Ok(())
    }

    /// Height of the top sprocket above the bottom one.
    pub fn leg_length(&self) -> f64 {
        self.loop_length / 2.0
    }

    /// Height above the bottom of the loop for a path position.
    pub fn height_at(&self, position: f64) -> f64 {
        let half = self.leg_length();
        if position < half {
            position
        } else {
            self.loop_length - position
        }
    }

    /// Weight of one floater (N).
    pub fn weight(&self) -> f64 {
        self.floater_mass * self.gravity
    }
}

/// Reject values that are not finite and strictly positive.
pub(crate) fn positive(param: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { param, value })
    }
}

/// Reject values that are not finite and non-negative.
pub(crate) fn non_negative(param: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Negative { param, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(PhysicsConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_mass_rejected() {
        let cfg = PhysicsConfig {
            floater_mass: 0.0,
            ..PhysicsConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NotPositive {
                param: "floater_mass",
                value: 0.0
            })
        );
    }

    #[test]
    fn negative_volume_rejected() {
        let cfg = PhysicsConfig {
            floater_volume: -0.01,
            ..PhysicsConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NotPositive {
                param: "floater_volume",
                ..
            })
        ));
    }

    #[test]
    fn nan_loop_length_rejected() {
        let cfg = PhysicsConfig {
            loop_length: f64::NAN,
            ..PhysicsConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NotPositive {
                param: "loop_length",
                ..
            })
        ));
    }

    #[test]
    fn zero_floaters_rejected() {
        let cfg = PhysicsConfig {
            n_floaters: 0,
            ..PhysicsConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::NoFloaters));
    }

    #[test]
    fn negative_drag_rejected() {
        let cfg = PhysicsConfig {
            drag_coefficient: -0.1,
            ..PhysicsConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Negative { .. })));
    }

    #[test]
    fn return_fraction_out_of_range_rejected() {
        let cfg = PhysicsConfig {
            return_volume_fraction: 1.5,
            ..PhysicsConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfRange {
                param: "return_volume_fraction",
                ..
            })
        ));
    }

    #[test]
    fn floater_heavier_than_displaced_fluid_rejected() {
        let cfg = PhysicsConfig {
            floater_mass: 20.0,
            ..PhysicsConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::NoNetDrive {
                leg: "ascending",
                ..
            })
        ));
        // Neutrally buoyant floaters never leave the bottom either.
        let neutral = PhysicsConfig {
            floater_mass: 10.0,
            ..PhysicsConfig::default()
        };
        assert!(matches!(
            neutral.validate(),
            Err(ConfigError::NoNetDrive {
                leg: "ascending",
                ..
            })
        ));
    }

    #[test]
    fn buoyant_return_path_rejected() {
        // Default floaters are neutral at half their volume.
        for fraction in [0.5, 0.75, 1.0] {
            let cfg = PhysicsConfig {
                return_volume_fraction: fraction,
                ..PhysicsConfig::default()
            };
            match cfg.validate() {
                Err(ConfigError::NoNetDrive {
                    leg,
                    buoyancy,
                    weight,
                }) => {
                    assert_eq!(leg, "descending");
                    assert!(buoyancy >= weight);
                }
                other => panic!("fraction {fraction} accepted: {other:?}"),
            }
        }
        let cfg = PhysicsConfig {
            return_volume_fraction: 0.49,
            ..PhysicsConfig::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn efficiency_bounds() {
        let mut cfg = PhysicsConfig::default();
        cfg.drivetrain.efficiency = 0.0;
        assert!(cfg.validate().is_err());
        cfg.drivetrain.efficiency = 1.0;
        assert!(cfg.validate().is_ok());
        cfg.drivetrain.efficiency = 1.01;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn height_folds_at_top() {
        let cfg = PhysicsConfig::default();
        assert_eq!(cfg.height_at(0.0), 0.0);
        assert_eq!(cfg.height_at(2.5), 2.5);
        assert_eq!(cfg.height_at(5.0), 5.0);
        assert_eq!(cfg.height_at(7.5), 2.5);
    }

    #[test]
    fn drag_laws() {
        assert_eq!(DragLaw::Linear.magnitude(0.5, -4.0), 2.0);
        assert_eq!(DragLaw::Quadratic.magnitude(0.5, -4.0), 8.0);
        assert_eq!(DragLaw::Quadratic.magnitude(0.5, 0.0), 0.0);
    }
}
