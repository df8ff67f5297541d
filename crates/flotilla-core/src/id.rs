//! Strongly-typed identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a floater within a system.
///
/// Floaters are created when a system is initialized and assigned
/// sequential IDs. `FloaterId(n)` is the n-th floater in update order and
/// stays stable for the lifetime of the system, including across resets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FloaterId(pub u32);

impl fmt::Display for FloaterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FloaterId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Number of completed steps since the start (or last reset) of a run.
///
/// `StepId(0)` is the initial state; the first completed step is `StepId(1)`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct StepId(pub u64);

impl StepId {
    /// The step that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Identifies one run of a simulation.
///
/// A new run begins on every `start()` and `reset()`. Snapshots carry the
/// run they were produced in so consumers can tell a restarted clock from
/// an out-of-order delivery.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RunId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
