//! Shared fixtures for Flotilla tests.
//!
//! Physical configurations used across crates, plus a consistency check
//! for snapshots observed from reader threads.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use flotilla_core::{FloaterId, Snapshot};
use flotilla_physics::{DragLaw, DrivetrainConfig, PhysicsConfig};

/// Step size at which [`divergent_physics`] overflows on its second step.
pub const DIVERGENT_DT: f64 = 1.0;

/// The reference scenario: four floaters evenly spaced on a 10 m loop in
/// water, starting at 0, 2.5, 5 and 7.5.
pub fn reference_physics() -> PhysicsConfig {
    PhysicsConfig {
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

/// The reference scenario with drag and drivetrain losses removed.
pub fn frictionless_physics(n_floaters: u32) -> PhysicsConfig {
    PhysicsConfig {
        n_floaters,
        drag_coefficient: 0.0,
        drivetrain: DrivetrainConfig {
            constant_loss: 0.0,
            viscous_loss: 0.0,
            ..DrivetrainConfig::default()
        },
        ..reference_physics()
    }
}

/// A single floater whose drag overflows to infinity on the second step
/// at [`DIVERGENT_DT`]. The first step completes normally.
pub fn divergent_physics() -> PhysicsConfig {
    PhysicsConfig {
        n_floaters: 1,
        loop_length: 1000.0,
        drag_coefficient: 1e307,
        ..reference_physics()
    }
}

/// A configuration with realistic losses and timed holds, for soak tests.
pub fn lossy_physics(n_floaters: u32) -> PhysicsConfig {
    PhysicsConfig {
        n_floaters,
        loop_length: 20.0,
        return_volume_fraction: 0.1,
        phase_duration: 0.3,
        drivetrain: DrivetrainConfig {
            effective_radius: 0.5,
            efficiency: 0.85,
            constant_loss: 1.0,
            viscous_loss: 0.5,
        },
        ..reference_physics()
    }
}

/// Panic unless `snap` is internally consistent: its time matches its
/// step, its power matches torque and angular velocity, and every floater
/// is present in id order, on the loop, with finite kinematics.
pub fn assert_snapshot_consistent(snap: &Snapshot, dt: f64, config: &PhysicsConfig) {
    assert_eq!(
        snap.time,
        snap.step.0 as f64 * dt,
        "time {} does not belong to step {}",
        snap.time,
        snap.step
    );
    assert_eq!(
        snap.net_power,
        snap.net_torque * snap.angular_velocity,
        "power does not match torque at step {}",
        snap.step
    );
    assert_eq!(snap.floaters.len(), config.n_floaters as usize);
    for (i, sample) in snap.floaters.iter().enumerate() {
        assert_eq!(sample.id, FloaterId(i as u32));
        assert!(
            sample.position >= 0.0 && sample.position < config.loop_length,
            "floater {} off the loop at {}",
            sample.id,
            sample.position
        );
        assert!(sample.velocity.is_finite());
        assert!(sample.net_force.is_finite());
    }
}
