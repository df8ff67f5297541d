//! Errors returned by lifecycle operations.

use std::fmt;

use flotilla_core::{ConfigError, LifecycleState, PhysicsDivergence};
use thiserror::Error;

/// A lifecycle operation on [`Simulation`](crate::Simulation).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `start(config)`.
    Start,
    /// `pause()`.
    Pause,
    /// `resume()`.
    Resume,
    /// `stop()`.
    Stop,
    /// `reset()` / `reset_with(config)`.
    Reset,
    /// `step()`.
    Step,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Reset => "reset",
            Self::Step => "step",
        };
        f.write_str(name)
    }
}

/// Failure of a lifecycle operation.
///
/// Every variant except [`Divergence`](Self::Divergence) leaves the
/// lifecycle state unchanged.
#[derive(Debug, Error)]
pub enum SimError {
    /// The configuration was rejected; no run was started.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    /// The operation is not permitted in the current state.
    #[error("cannot {op} while {state}")]
    InvalidTransition {
        /// The requested operation.
        op: Operation,
        /// The state it was requested in.
        state: LifecycleState,
    },
    /// A manually requested step diverged. The run is now stopped.
    #[error("physics diverged: {0}")]
    Divergence(#[from] PhysicsDivergence),
    /// The tick thread could not be started.
    #[error("failed to spawn tick thread: {reason}")]
    ThreadSpawnFailed {
        /// OS error message.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::{FloaterId, Quantity};

    #[test]
    fn transition_message() {
        let err = SimError::InvalidTransition {
            op: Operation::Resume,
            state: LifecycleState::Stopped,
        };
        assert_eq!(err.to_string(), "cannot resume while stopped");
    }

    #[test]
    fn wraps_lower_errors() {
        let err: SimError = ConfigError::NoFloaters.into();
        assert!(matches!(err, SimError::InvalidConfiguration(_)));
        assert_eq!(
            err.to_string(),
            "invalid configuration: n_floaters must be at least 1"
        );

        let err: SimError = PhysicsDivergence {
            floater: Some(FloaterId(1)),
            quantity: Quantity::Velocity,
            value: f64::NAN,
        }
        .into();
        assert_eq!(
            err.to_string(),
            "physics diverged: non-finite velocity (NaN) on floater 1"
        );
    }
}
