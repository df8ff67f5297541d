//! Immutable published records of system state.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::id::{FloaterId, RunId, StepId};
use crate::state::OperationalState;

/// Per-floater samples of one snapshot. Typical loops fit inline.
pub type FloaterSamples = SmallVec<[FloaterSample; 8]>;

/// One floater's state at the end of a step.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FloaterSample {
    /// Stable floater identity.
    pub id: FloaterId,
    /// Distance along the loop, in `[0, loop_length)`.
    pub position: f64,
    /// Signed vertical velocity (positive = up).
    pub velocity: f64,
    /// Operational phase after the step.
    pub state: OperationalState,
    /// Net vertical force acting on the floater during the step.
    pub net_force: f64,
}

/// A self-contained record of the system after one completed step.
///
/// Snapshots are shared behind `Arc` once published and are never mutated
/// afterwards; a consumer always sees every field from the same step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Publication order within the store. Assigned by the store at
    /// publish time; strictly increasing across runs.
    pub sequence: u64,
    /// Run that produced this snapshot.
    pub run: RunId,
    /// Completed step count within the run.
    pub step: StepId,
    /// Simulated time in seconds (`step × dt`).
    pub time: f64,
    /// Net drivetrain torque (N·m).
    pub net_torque: f64,
    /// Net drivetrain power (W).
    pub net_power: f64,
    /// Drivetrain angular velocity (rad/s).
    pub angular_velocity: f64,
    /// Per-floater samples in identity order.
    pub floaters: FloaterSamples,
}

impl Snapshot {
    /// Look up a floater's sample by id.
    pub fn floater(&self, id: FloaterId) -> Option<&FloaterSample> {
        self.floaters.get(id.0 as usize).filter(|s| s.id == id)
    }

    /// Number of floaters in each phase: `[ascending, descending, filling, venting]`.
    pub fn phase_counts(&self) -> [usize; 4] {
        let mut counts = [0usize; 4];
        for sample in &self.floaters {
            let slot = match sample.state {
                OperationalState::Ascending => 0,
                OperationalState::Descending => 1,
                OperationalState::Filling => 2,
                OperationalState::Venting => 3,
            };
            counts[slot] += 1;
        }
        counts
    }
}
