//! Error types shared across the Flotilla workspace.
//!
//! Two failure families live here: configuration errors, detected before
//! a run begins, and [`PhysicsDivergence`], raised when a step produces a
//! non-finite value. Lifecycle misuse is an engine concern and is defined
//! there.

use std::fmt;

use thiserror::Error;

use crate::id::FloaterId;

/// Errors detected while validating or loading a configuration.
///
/// A configuration that fails validation is rejected before any system
/// is constructed, so no snapshot is ever produced from it.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// The floater count is zero.
    #[error("n_floaters must be at least 1")]
    NoFloaters,
    /// A parameter that must be finite and strictly positive is not.
    #[error("{param} must be finite and positive, got {value}")]
    NotPositive {
        /// Name of the offending parameter.
        param: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A parameter that must be finite and non-negative is not.
    #[error("{param} must be finite and non-negative, got {value}")]
    Negative {
        /// Name of the offending parameter.
        param: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A parameter lies outside its closed range.
    #[error("{param} must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        /// Name of the offending parameter.
        param: &'static str,
        /// The rejected value.
        value: f64,
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// Buoyancy and weight do not drive floaters forward along one leg:
    /// the loop would stall with that floater pinned at the leg start.
    #[error("floaters cannot travel the {leg} leg: buoyancy {buoyancy} N against weight {weight} N")]
    NoNetDrive {
        /// `"ascending"` or `"descending"`.
        leg: &'static str,
        /// Buoyant force on that leg.
        buoyancy: f64,
        /// Floater weight.
        weight: f64,
    },
    /// Snapshot history capacity is below the minimum of 2.
    #[error("history length {configured} is below minimum of 2")]
    HistoryTooSmall {
        /// The configured capacity.
        configured: usize,
    },
    /// The configuration text could not be parsed.
    #[error("failed to parse configuration: {reason}")]
    Parse {
        /// Parser diagnostic.
        reason: String,
    },
    /// The configuration could not be rendered as text.
    #[error("failed to serialize configuration: {reason}")]
    Serialize {
        /// Serializer diagnostic.
        reason: String,
    },
    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {reason}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error message.
        reason: String,
    },
}

/// The physical quantity that became non-finite during a step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quantity {
    /// Net vertical force on a floater.
    NetForce,
    /// Floater acceleration.
    Acceleration,
    /// Floater vertical velocity.
    Velocity,
    /// Floater position along the loop.
    Position,
    /// Drivetrain torque.
    Torque,
    /// Drivetrain power.
    Power,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NetForce => "net force",
            Self::Acceleration => "acceleration",
            Self::Velocity => "velocity",
            Self::Position => "position",
            Self::Torque => "torque",
            Self::Power => "power",
        };
        f.write_str(name)
    }
}

/// A step produced a non-finite value.
///
/// Fatal to the current run. The step that raised it is discarded in
/// full: no floater keeps a partial update and the clock does not
/// advance.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
#[error(
    "non-finite {quantity} ({value}){}",
    .floater.map(|id| format!(" on floater {id}")).unwrap_or_default()
)]
pub struct PhysicsDivergence {
    /// The floater that diverged, or `None` for drivetrain quantities.
    pub floater: Option<FloaterId>,
    /// Which quantity diverged.
    pub quantity: Quantity,
    /// The offending value (NaN or ±∞).
    pub value: f64,
}

impl PhysicsDivergence {
    /// Return `Ok(value)` if finite, otherwise a divergence for `quantity`.
    pub fn check(
        floater: Option<FloaterId>,
        quantity: Quantity,
        value: f64,
    ) -> Result<f64, Self> {
        if value.is_finite() {
            Ok(value)
        } else {
            Err(Self {
                floater,
                quantity,
                value,
            })
        }
    }
}
