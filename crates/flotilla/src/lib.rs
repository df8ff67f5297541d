//! Flotilla: a real-time simulator for a closed loop of buoyant floaters
//! driving a shared drivetrain.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Flotilla sub-crates. For most users, adding `flotilla` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::time::Duration;
//! use flotilla::prelude::*;
//!
//! // The reference loop, run as fast as possible for one simulated second.
//! let config = SimConfig {
//!     max_duration: Some(1.0),
//!     ..SimConfig::default()
//! }
//! .unpaced();
//!
//! let mut sim = Simulation::new();
//! sim.start(config).unwrap();
//! assert_eq!(
//!     sim.wait_stopped(Duration::from_secs(10)),
//!     Some(ExitReason::DurationReached)
//! );
//!
//! let snap = sim.latest().unwrap();
//! assert_eq!(snap.step, StepId(10));
//! assert_eq!(snap.floaters.len(), 4);
//! assert_eq!(sim.state(), LifecycleState::Stopped);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `flotilla-core` | IDs, states, snapshots, error types |
//! | [`physics`] | `flotilla-physics` | Physical configuration, floaters, drivetrain, `System` |
//! | [`engine`] | `flotilla-engine` | Run configuration, snapshot store, tick loop, `Simulation` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types and IDs (`flotilla-core`).
///
/// Contains [`types::Snapshot`], the operational and lifecycle state
/// enums, and the error taxonomy shared by every layer.
pub use flotilla_core as types;

/// Floater physics (`flotilla-physics`).
///
/// [`physics::System`] steps a loop of floaters deterministically and
/// can be driven directly when no real-time pacing is wanted.
pub use flotilla_physics as physics;

/// Real-time stepping and lifecycle control (`flotilla-engine`).
///
/// [`engine::Simulation`] runs a system on its own thread and publishes
/// snapshots to a [`engine::SnapshotStore`] readable from any thread.
pub use flotilla_engine as engine;

/// Common imports for typical Flotilla usage.
///
/// ```rust
/// use flotilla::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use flotilla_core::{
        FloaterId, FloaterSample, LifecycleState, OperationalState, RunId, Snapshot, StepId,
    };

    // Errors
    pub use flotilla_core::{ConfigError, PhysicsDivergence, Quantity};

    // Physics
    pub use flotilla_physics::{DragLaw, DrivetrainConfig, PhysicsConfig, System};

    // Engine
    pub use flotilla_engine::{
        ExitReason, SimConfig, SimError, Simulation, SnapshotStore, TickEngine,
    };
}
