//! Real-time stepping engine for Flotilla.
//!
//! Wraps a [`flotilla_physics::System`] in a [`TickEngine`] that publishes
//! an immutable snapshot after every completed step, runs it on a
//! dedicated paced thread, and exposes the STOPPED / RUNNING / PAUSED
//! lifecycle through [`Simulation`]. Consumers read state from the
//! lock-light [`SnapshotStore`] without ever blocking the stepping loop.
//!
//! ```text
//! Controller thread           flotilla-tick thread          Reader threads (N)
//!     |                              |                              |
//!     |--start(cfg)--spawn---------->| system.step()                |
//!     |                              | store.publish(snapshot) ---->| store.latest()
//!     |                              | recv_timeout(budget)         | store.history()
//!     |--pause()/stop()--[Halt]----->| (observed between steps)     |
//!     |<--------JoinHandle<engine>---|                              |
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod ring;
pub mod scheduler;
pub mod tick;
pub(crate) mod tick_thread;

pub use config::SimConfig;
pub use error::{Operation, SimError};
pub use metrics::{LoopStats, StepMetrics};
pub use ring::{SnapshotStore, DEFAULT_HISTORY};
pub use scheduler::Simulation;
pub use tick::{TickEngine, TickResult};
pub use tick_thread::ExitReason;
