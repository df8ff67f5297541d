//! Physical model for Flotilla.
//!
//! Floaters travel a closed loop under buoyancy, weight and drag along a
//! single vertical degree of freedom. A [`System`] owns the floaters and a
//! passive [`Drivetrain`] that turns their summed forward force into shaft
//! torque and power. Everything here is single-threaded and deterministic;
//! pacing and publication live in `flotilla-engine`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod drivetrain;
pub mod floater;
pub mod system;

pub use config::{DragLaw, DrivetrainConfig, PhysicsConfig};
pub use drivetrain::{DriveOutput, Drivetrain};
pub use floater::{Floater, ForceBalance, StepWork};
pub use system::{EnergyLedger, System, SystemMetrics};

// Compile-time assertion: System is moved onto the tick thread.
const _: fn() = || {
    fn assert<T: Send + 'static>() {}
    assert::<System>();
};
