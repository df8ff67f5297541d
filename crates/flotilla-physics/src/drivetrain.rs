//! Drivetrain aggregation: floater forces to shaft torque and power.
//!
//! The drivetrain is a passive coupling with no inertia of its own. Each
//! step it sums the forward drive force of every floater (in id order, so
//! floating-point summation is reproducible), converts it to torque at the
//! effective radius, and subtracts mechanical losses.
//!
//! ```text
//! u     = mean(direction_i · v_i)          chain speed
//! ω     = u / r                            shaft angular velocity
//! τ_g   = η · r · Σ direction_i · F_i      gross torque
//! τ_l   = τ_c + k · ω                      loss torque
//! τ     = τ_g − τ_l
//! P     = τ · ω
//! ```

use flotilla_core::{PhysicsDivergence, Quantity};

use crate::config::DrivetrainConfig;
use crate::floater::Floater;

/// Drivetrain quantities for one step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DriveOutput {
    /// Mean floater speed along the loop (m/s).
    pub chain_speed: f64,
    /// Shaft angular velocity (rad/s).
    pub angular_velocity: f64,
    /// Torque before losses (N·m).
    pub gross_torque: f64,
    /// Torque lost to friction (N·m).
    pub loss_torque: f64,
    /// Delivered torque (N·m).
    pub net_torque: f64,
    /// Delivered power (W).
    pub net_power: f64,
}

/// Aggregates floater contributions into shaft output.
#[derive(Clone, Debug, PartialEq)]
pub struct Drivetrain {
    config: DrivetrainConfig,
}

impl Drivetrain {
    /// Create a drivetrain from validated parameters.
    pub fn new(config: DrivetrainConfig) -> Self {
        Self { config }
    }

    /// The drivetrain parameters.
    pub fn config(&self) -> &DrivetrainConfig {
        &self.config
    }

    /// Sum floater contributions, in slice order.
    pub fn aggregate(&self, floaters: &[Floater]) -> Result<DriveOutput, PhysicsDivergence> {
        let cfg = &self.config;
        let mut drive_force = 0.0;
        let mut speed_sum = 0.0;
        for f in floaters {
            drive_force += f.drive_force();
            speed_sum += f.path_speed();
        }
        let chain_speed = if floaters.is_empty() {
            0.0
        } else {
            speed_sum / floaters.len() as f64
        };
        let angular_velocity = chain_speed / cfg.effective_radius;
        let gross_torque = cfg.efficiency * cfg.effective_radius * drive_force;
        let loss_torque = cfg.constant_loss + cfg.viscous_loss * angular_velocity;
        let net_torque = PhysicsDivergence::check(None, Quantity::Torque, gross_torque - loss_torque)?;
        let net_power = PhysicsDivergence::check(None, Quantity::Power, net_torque * angular_velocity)?;

        Ok(DriveOutput {
            chain_speed,
            angular_velocity,
            gross_torque,
            loss_torque,
            net_torque,
            net_power,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhysicsConfig;
    use approx::assert_relative_eq;
    use flotilla_core::{FloaterId, OperationalState};

    fn pair(cfg: &PhysicsConfig) -> Vec<Floater> {
        vec![
            Floater::at(FloaterId(0), 2.0, 1.0, OperationalState::Ascending, cfg),
            Floater::at(FloaterId(1), 7.0, -1.0, OperationalState::Descending, cfg),
        ]
    }

    #[test]
    fn both_legs_drive_forward() {
        let cfg = PhysicsConfig::default();
        let floaters = pair(&cfg);
        assert!(floaters[0].drive_force() > 0.0);
        assert!(floaters[1].drive_force() > 0.0);

        let out = Drivetrain::new(cfg.drivetrain.clone())
            .aggregate(&floaters)
            .unwrap();
        assert_relative_eq!(out.chain_speed, 1.0, epsilon = 1e-12);
        assert_relative_eq!(out.angular_velocity, 1.0, epsilon = 1e-12);
        let expected = floaters[0].drive_force() + floaters[1].drive_force();
        assert_relative_eq!(out.gross_torque, expected, epsilon = 1e-12);
        assert_eq!(out.loss_torque, 0.0);
        assert_relative_eq!(out.net_power, out.net_torque * out.angular_velocity);
    }

    #[test]
    fn losses_and_efficiency_reduce_torque() {
        let mut cfg = PhysicsConfig::default();
        cfg.drivetrain = DrivetrainConfig {
            effective_radius: 0.5,
            efficiency: 0.8,
            constant_loss: 2.0,
            viscous_loss: 1.5,
        };
        let floaters = pair(&cfg);
        let forces: f64 = floaters.iter().map(Floater::drive_force).sum();
        let out = Drivetrain::new(cfg.drivetrain.clone())
            .aggregate(&floaters)
            .unwrap();

        let omega = 1.0 / 0.5;
        assert_relative_eq!(out.angular_velocity, omega, epsilon = 1e-12);
        assert_relative_eq!(out.gross_torque, 0.8 * 0.5 * forces, epsilon = 1e-9);
        assert_relative_eq!(out.loss_torque, 2.0 + 1.5 * omega, epsilon = 1e-12);
        assert_relative_eq!(
            out.net_torque,
            out.gross_torque - out.loss_torque,
            epsilon = 1e-12
        );
        assert_relative_eq!(out.net_power, out.net_torque * omega, epsilon = 1e-9);
    }

    #[test]
    fn held_floaters_contribute_nothing() {
        let cfg = PhysicsConfig::default();
        let floaters = vec![
            Floater::at(FloaterId(0), 5.0, 0.0, OperationalState::Venting, &cfg),
            Floater::at(FloaterId(1), 0.0, 0.0, OperationalState::Filling, &cfg),
        ];
        let out = Drivetrain::new(cfg.drivetrain.clone())
            .aggregate(&floaters)
            .unwrap();
        assert_eq!(out, DriveOutput::default());
    }
}
