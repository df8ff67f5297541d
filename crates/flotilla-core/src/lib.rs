//! Core types for the Flotilla buoyancy simulation engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by the physics model, the stepping engine, and any
//! external consumer of published state: identifiers, operational and
//! lifecycle states, the immutable [`Snapshot`] record, and the error
//! taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod snapshot;
pub mod state;

pub use error::{ConfigError, PhysicsDivergence, Quantity};
pub use id::{FloaterId, RunId, StepId};
pub use snapshot::{FloaterSample, FloaterSamples, Snapshot};
pub use state::{LifecycleState, OperationalState};
