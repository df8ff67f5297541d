//! Benchmark profiles for the Flotilla buoyancy simulator.
//!
//! - [`reference_profile`]: the four-floater, 10 m reference loop
//! - [`stress_profile`]: a long loop crowded with lossy floaters and timed holds
//! - [`bench_snapshot`]: a synthetic snapshot for store benchmarks

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use flotilla_core::{FloaterId, FloaterSample, OperationalState, RunId, Snapshot, StepId};
use flotilla_engine::SimConfig;
use flotilla_physics::{DrivetrainConfig, PhysicsConfig};

/// Build the reference profile: 4 floaters, 10 m loop, dt = 0.1, unpaced.
pub fn reference_profile() -> SimConfig {
    SimConfig::default().unpaced()
}

/// Build a stress profile: `n_floaters` on a 200 m loop, dt = 0.01, unpaced.
///
/// Holds last 0.25 s and the return path keeps a tenth of its buoyancy, so
/// every branch of the floater update is exercised.
pub fn stress_profile(n_floaters: u32) -> SimConfig {
    SimConfig {
        physics: PhysicsConfig {
            n_floaters,
            loop_length: 200.0,
            return_volume_fraction: 0.1,
            phase_duration: 0.25,
            drivetrain: DrivetrainConfig {
                effective_radius: 0.75,
                efficiency: 0.9,
                constant_loss: 2.0,
                viscous_loss: 0.1,
            },
            ..PhysicsConfig::default()
        },
        dt: 0.01,
        ..SimConfig::default()
    }
    .unpaced()
}

/// A snapshot with `n_floaters` plausible samples, for store benchmarks.
pub fn bench_snapshot(n_floaters: u32, step: u64) -> Snapshot {
    let floaters = (0..n_floaters)
        .map(|i| FloaterSample {
            id: FloaterId(i),
            position: f64::from(i) * 0.5,
            velocity: 1.0,
            state: OperationalState::Ascending,
            net_force: 49.05,
        })
        .collect();
    Snapshot {
        sequence: 0,
        run: RunId(1),
        step: StepId(step),
        time: step as f64 * 0.01,
        net_torque: 10.0,
        net_power: 20.0,
        angular_velocity: 2.0,
        floaters,
    }
}
