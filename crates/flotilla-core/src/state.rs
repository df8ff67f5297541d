//! Operational (per-floater) and lifecycle (per-simulation) states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operational phase of a single floater.
///
/// Exactly one phase is active at any time. The phases form a closed
/// cycle, see [`successor`](OperationalState::successor):
///
/// ```text
/// ASCENDING → VENTING → DESCENDING → FILLING → ASCENDING → …
/// ```
///
/// `Venting` and `Filling` are holds at the top and bottom of the loop:
/// the floater is stationary while its displaced volume changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationalState {
    /// Travelling up the ascending leg with full displaced volume.
    Ascending,
    /// Travelling down the descending leg, de-buoyed.
    Descending,
    /// Held at the bottom of the loop while being filled.
    Filling,
    /// Held at the top of the loop while being vented.
    Venting,
}

impl OperationalState {
    /// The phase entered when this one completes.
    pub fn successor(self) -> Self {
        match self {
            Self::Ascending => Self::Venting,
            Self::Venting => Self::Descending,
            Self::Descending => Self::Filling,
            Self::Filling => Self::Ascending,
        }
    }

    /// Whether the floater is held stationary by the fill/vent mechanism.
    pub fn is_held(self) -> bool {
        matches!(self, Self::Filling | Self::Venting)
    }

    /// Whether the floater displaces its full volume in this phase.
    ///
    /// Filling is counted as buoyant: the floater leaves the hold
    /// fully displaced.
    pub fn is_buoyant(self) -> bool {
        matches!(self, Self::Ascending | Self::Filling)
    }

    /// Sign relating vertical velocity to travel along the loop.
    ///
    /// `+1.0` on the ascending leg (moving up advances the floater),
    /// `-1.0` on the descending leg (moving down advances it). Held
    /// phases report the sign of the leg they are about to leave on.
    pub fn leg_direction(self) -> f64 {
        match self {
            Self::Ascending | Self::Filling => 1.0,
            Self::Descending | Self::Venting => -1.0,
        }
    }
}

impl fmt::Display for OperationalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ascending => "ASCENDING",
            Self::Descending => "DESCENDING",
            Self::Filling => "FILLING",
            Self::Venting => "VENTING",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of a simulation run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Not stepping. Either never started, explicitly stopped, or halted
    /// by a duration limit or a divergence.
    #[default]
    Stopped,
    /// A dedicated thread is advancing the system.
    Running,
    /// Stepping suspended; system state retained as-is.
    Paused,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
            Self::Paused => "paused",
        };
        f.write_str(name)
    }
}
