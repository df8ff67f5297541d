//! A single floater: force balance, integration, and phase transitions.
//!
//! Each step computes buoyancy, weight and drag along the vertical axis,
//! integrates with semi-implicit Euler (velocity first, then position with
//! the updated velocity), and then applies the position thresholds of the
//! phase cycle. Semi-implicit Euler is first-order but stays stable at the
//! step sizes this engine targets; it is not swappable.
//!
//! # Geometry
//!
//! ```text
//!   top (L/2) ── VENTING ──┐
//!      ▲                   │
//!   ASCENDING         DESCENDING
//!   s ∈ [0, L/2)      s ∈ [L/2, L)
//!      │                   ▼
//!   bottom (0 ≡ L) ─ FILLING ┘
//! ```
//!
//! Velocity is vertical (positive up). On the ascending leg the path
//! position advances by `v·dt`; on the descending leg by `-v·dt`.
//!
//! Drag can bring a floater to rest within a step but never reverse it:
//! its impulse is capped at the floater's momentum. Together with the
//! net-drive rules in [`PhysicsConfig::validate`] this keeps every
//! travelling floater moving forward along its leg.

use flotilla_core::{FloaterId, OperationalState, PhysicsDivergence, Quantity};

use crate::config::PhysicsConfig;

/// Hold timers are considered expired within this fraction of `dt`,
/// absorbing round-off from repeated subtraction.
const HOLD_TOLERANCE: f64 = 1e-9;

// ── ForceBalance ────────────────────────────────────────────────────

/// Vertical force components acting on a floater during one step.
///
/// All values are signed along the "up" axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ForceBalance {
    /// Buoyant force, `ρ·g·V_eff` (always `>= 0`).
    pub buoyancy: f64,
    /// Weight, `m·g`, reported as a positive magnitude acting down.
    pub weight: f64,
    /// Drag, signed so that it always opposes the velocity.
    pub drag: f64,
    /// `buoyancy - weight + drag`.
    pub net: f64,
    /// `net / m`.
    pub acceleration: f64,
}

impl ForceBalance {
    /// Limit drag to the impulse that stops a floater moving at
    /// `velocity` within `dt`, then rebalance.
    fn cap_drag(self, velocity: f64, dt: f64, cfg: &PhysicsConfig) -> Self {
        let limit = cfg.floater_mass * velocity.abs() / dt;
        if self.drag.abs() <= limit {
            return self;
        }
        let drag = self.drag.signum() * limit;
        let net = self.buoyancy - self.weight + drag;
        Self {
            drag,
            net,
            acceleration: net / cfg.floater_mass,
            ..self
        }
    }

    /// Force balance for a floater in `state` moving at `velocity`.
    pub fn compute(state: OperationalState, velocity: f64, cfg: &PhysicsConfig) -> Self {
        let volume = if state.is_buoyant() {
            cfg.floater_volume
        } else {
            cfg.floater_volume * cfg.return_volume_fraction
        };
        let buoyancy = cfg.fluid_density * cfg.gravity * volume;
        let weight = cfg.weight();
        let drag_magnitude = cfg.drag_law.magnitude(cfg.drag_coefficient, velocity);
        let drag = if velocity > 0.0 {
            -drag_magnitude
        } else if velocity < 0.0 {
            drag_magnitude
        } else {
            0.0
        };
        let net = buoyancy - weight + drag;
        Self {
            buoyancy,
            weight,
            drag,
            net,
            acceleration: net / cfg.floater_mass,
        }
    }
}

// ── StepWork ────────────────────────────────────────────────────────

/// Work done on a floater during its last step (J).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepWork {
    /// Work done by buoyancy.
    pub buoyancy: f64,
    /// Work done by gravity.
    pub gravity: f64,
    /// Work done by drag (never positive).
    pub drag: f64,
    /// Kinetic energy taken out by the mechanism when the floater was
    /// stopped at a threshold.
    pub absorbed: f64,
}

// ── Floater ─────────────────────────────────────────────────────────

/// One body travelling the loop.
///
/// A floater only ever reads shared parameters; it never observes other
/// floaters. Coupling happens in the drivetrain aggregation.
#[derive(Clone, Debug, PartialEq)]
pub struct Floater {
    id: FloaterId,
    position: f64,
    velocity: f64,
    state: OperationalState,
    hold_remaining: f64,
    forces: ForceBalance,
    work: StepWork,
}

impl Floater {
    /// Create a floater at rest at `position`.
    ///
    /// Floaters on the first half of the loop start ascending, the rest
    /// descending.
    pub fn new(id: FloaterId, position: f64, cfg: &PhysicsConfig) -> Self {
        let state = if position < cfg.leg_length() {
            OperationalState::Ascending
        } else {
            OperationalState::Descending
        };
        Self {
            id,
            position,
            velocity: 0.0,
            state,
            hold_remaining: 0.0,
            forces: ForceBalance::compute(state, 0.0, cfg),
            work: StepWork::default(),
        }
    }

    /// Place a floater with explicit kinematic state.
    #[cfg(test)]
    pub(crate) fn at(
        id: FloaterId,
        position: f64,
        velocity: f64,
        state: OperationalState,
        cfg: &PhysicsConfig,
    ) -> Self {
        Self {
            id,
            position,
            velocity,
            state,
            hold_remaining: if state.is_held() { cfg.phase_duration } else { 0.0 },
            forces: ForceBalance::compute(state, velocity, cfg),
            work: StepWork::default(),
        }
    }

    /// Advance this floater by `dt`.
    ///
    /// On error the floater may be partially updated; callers discard it
    /// (see [`System::step`](crate::System::step)).
    pub fn update(&mut self, dt: f64, cfg: &PhysicsConfig) -> Result<(), PhysicsDivergence> {
        if self.state.is_held() {
            self.hold(dt, cfg);
            Ok(())
        } else {
            self.travel(dt, cfg)
        }
    }

    /// Stationary step while filling or venting.
    fn hold(&mut self, dt: f64, cfg: &PhysicsConfig) {
        self.velocity = 0.0;
        self.forces = ForceBalance::compute(self.state, 0.0, cfg);
        self.work = StepWork::default();
        self.hold_remaining -= dt;
        if self.hold_remaining <= HOLD_TOLERANCE * dt {
            log::trace!("floater {} {} -> {}", self.id, self.state, self.state.successor());
            self.state = self.state.successor();
            self.hold_remaining = 0.0;
        }
    }

    /// Integrate one step along the current leg.
    fn travel(&mut self, dt: f64, cfg: &PhysicsConfig) -> Result<(), PhysicsDivergence> {
        let id = Some(self.id);
        let raw = ForceBalance::compute(self.state, self.velocity, cfg);
        PhysicsDivergence::check(id, Quantity::NetForce, raw.net)?;
        PhysicsDivergence::check(id, Quantity::Acceleration, raw.acceleration)?;
        let forces = raw.cap_drag(self.velocity, dt, cfg);

        // Semi-implicit Euler: velocity first, then position from the new velocity.
        let velocity = PhysicsDivergence::check(
            id,
            Quantity::Velocity,
            self.velocity + forces.acceleration * dt,
        )?;
        let direction = self.state.leg_direction();
        let velocity = if direction * velocity < 0.0 { 0.0 } else { velocity };
        let target = PhysicsDivergence::check(
            id,
            Quantity::Position,
            self.position + direction * velocity * dt,
        )?;

        let half = cfg.leg_length();
        let leg_end = match self.state {
            OperationalState::Ascending => half,
            _ => cfg.loop_length,
        };
        let stopped_energy = 0.5 * cfg.floater_mass * velocity * velocity;

        let (position, velocity, absorbed, next_state) = if target >= leg_end {
            (leg_end, 0.0, stopped_energy, self.state.successor())
        } else {
            (target, velocity, 0.0, self.state)
        };

        let rise = direction * (position - self.position);
        self.work = StepWork {
            buoyancy: forces.buoyancy * rise,
            gravity: -forces.weight * rise,
            drag: forces.drag * rise,
            absorbed,
        };
        self.forces = forces;
        self.velocity = velocity;
        self.position = if position >= cfg.loop_length {
            position - cfg.loop_length
        } else {
            position
        };
        if next_state != self.state {
            log::trace!(
                "floater {} {} -> {} at s={}, absorbed {absorbed} J",
                self.id,
                self.state,
                next_state,
                self.position
            );
            self.state = next_state;
            self.hold_remaining = cfg.phase_duration;
        }
        Ok(())
    }

    /// Stable identity.
    pub fn id(&self) -> FloaterId {
        self.id
    }

    /// Distance along the loop, in `[0, loop_length)`.
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Signed vertical velocity.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Current operational phase.
    pub fn state(&self) -> OperationalState {
        self.state
    }

    /// Forces used by the most recent step (or the initial balance).
    pub fn forces(&self) -> &ForceBalance {
        &self.forces
    }

    /// Work done during the most recent step.
    pub fn work(&self) -> &StepWork {
        &self.work
    }

    /// Seconds left in the current fill or vent hold.
    pub fn hold_remaining(&self) -> f64 {
        self.hold_remaining
    }

    /// Force pushing the chain forward. Zero while held.
    pub fn drive_force(&self) -> f64 {
        if self.state.is_held() {
            0.0
        } else {
            self.state.leg_direction() * self.forces.net
        }
    }

    /// Speed along the loop in the direction of travel. Zero while held.
    pub fn path_speed(&self) -> f64 {
        if self.state.is_held() {
            0.0
        } else {
            self.state.leg_direction() * self.velocity
        }
    }

    /// Height above the bottom of the loop.
    pub fn height(&self, cfg: &PhysicsConfig) -> f64 {
        cfg.height_at(self.position)
    }

    /// Kinetic energy `½·m·v²`.
    pub fn kinetic_energy(&self, cfg: &PhysicsConfig) -> f64 {
        0.5 * cfg.floater_mass * self.velocity * self.velocity
    }
}
