//! The floater system: ordered floaters, shared parameters, and the clock.
//!
//! [`System::step`] is all-or-nothing. Floaters are advanced into a
//! staging copy (reusing its allocation each step); only when every floater
//! and the drivetrain produce finite values is the staging copy swapped in
//! and the clock advanced. A divergent step leaves the system exactly as
//! it was before the call.

use flotilla_core::{ConfigError, FloaterId, PhysicsDivergence, StepId};

use crate::config::{positive, PhysicsConfig};
use crate::drivetrain::{DriveOutput, Drivetrain};
use crate::floater::Floater;

// ── SystemMetrics ───────────────────────────────────────────────────

/// Aggregated results of the most recently completed step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SystemMetrics {
    /// Completed steps, including this one.
    pub step: StepId,
    /// Simulated time after this step (s).
    pub elapsed: f64,
    /// Drivetrain output for this step.
    pub drive: DriveOutput,
}

// ── EnergyLedger ────────────────────────────────────────────────────

/// Cumulative work done on all floaters since the start of the run (J).
///
/// With drag and drivetrain losses at zero, the change in total kinetic
/// energy over any interval equals
/// `buoyant_work + gravity_work + drag_work - absorbed` up to integration
/// error.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EnergyLedger {
    /// Work done by buoyancy.
    pub buoyant_work: f64,
    /// Work done by gravity.
    pub gravity_work: f64,
    /// Work done by drag.
    pub drag_work: f64,
    /// Kinetic energy absorbed when floaters were stopped at thresholds.
    pub absorbed: f64,
}

impl EnergyLedger {
    /// Net energy delivered to the floaters' motion.
    pub fn net(&self) -> f64 {
        self.buoyant_work + self.gravity_work + self.drag_work - self.absorbed
    }
}

// ── System ──────────────────────────────────────────────────────────

/// An ensemble of floaters coupled through a shared drivetrain.
///
/// Floaters are stored and updated in id order. `dt` is fixed at
/// construction so that elapsed time is always exactly `steps × dt`.
#[derive(Clone, Debug)]
pub struct System {
    config: PhysicsConfig,
    dt: f64,
    floaters: Vec<Floater>,
    staging: Vec<Floater>,
    drivetrain: Drivetrain,
    steps: u64,
    ledger: EnergyLedger,
    last_metrics: Option<SystemMetrics>,
}

impl System {
    /// Build a system with floaters evenly spaced around the loop.
    ///
    /// Floater `i` of `N` starts at rest at `i · L / N`.
    pub fn new(config: PhysicsConfig, dt: f64) -> Result<Self, ConfigError> {
        config.validate()?;
        positive("dt", dt)?;
        let drivetrain = Drivetrain::new(config.drivetrain.clone());
        let floaters = initial_floaters(&config);
        let staging = Vec::with_capacity(floaters.len());
        log::debug!(
            "system built: {} floaters on a {} m loop, dt {}s",
            config.n_floaters,
            config.loop_length,
            dt
        );
        Ok(Self {
            config,
            dt,
            floaters,
            staging,
            drivetrain,
            steps: 0,
            ledger: EnergyLedger::default(),
            last_metrics: None,
        })
    }

    /// Advance every floater by `dt`, then aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsDivergence`] if any floater or drivetrain quantity
    /// becomes non-finite. The system is left untouched.
    pub fn step(&mut self) -> Result<SystemMetrics, PhysicsDivergence> {
        self.staging.clone_from(&self.floaters);
        for floater in self.staging.iter_mut() {
            floater.update(self.dt, &self.config)?;
        }
        let drive = self.drivetrain.aggregate(&self.staging)?;

        // Commit.
        for f in &self.staging {
            let work = f.work();
            self.ledger.buoyant_work += work.buoyancy;
            self.ledger.gravity_work += work.gravity;
            self.ledger.drag_work += work.drag;
            self.ledger.absorbed += work.absorbed;
        }
        std::mem::swap(&mut self.floaters, &mut self.staging);
        self.steps += 1;

        let metrics = SystemMetrics {
            step: StepId(self.steps),
            elapsed: self.elapsed(),
            drive,
        };
        self.last_metrics = Some(metrics);
        Ok(metrics)
    }

    /// Return to the initial placement with a zeroed clock and ledger.
    ///
    /// Floater identities and allocations are kept.
    pub fn reset(&mut self) {
        for (i, floater) in self.floaters.iter_mut().enumerate() {
            *floater = Floater::new(
                FloaterId(i as u32),
                initial_position(&self.config, i),
                &self.config,
            );
        }
        self.staging.clear();
        self.steps = 0;
        self.ledger = EnergyLedger::default();
        self.last_metrics = None;
    }

    /// Floaters in id order.
    pub fn floaters(&self) -> &[Floater] {
        &self.floaters
    }

    /// Look up a floater by id.
    pub fn floater(&self, id: FloaterId) -> Option<&Floater> {
        self.floaters.get(id.0 as usize)
    }

    /// The physical parameters this system was built with.
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Fixed step size (s).
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Completed steps since construction or reset.
    pub fn steps(&self) -> StepId {
        StepId(self.steps)
    }

    /// Simulated time, `steps × dt`.
    pub fn elapsed(&self) -> f64 {
        self.steps as f64 * self.dt
    }

    /// Metrics of the most recent step, `None` before the first step.
    pub fn last_metrics(&self) -> Option<&SystemMetrics> {
        self.last_metrics.as_ref()
    }

    /// Cumulative work ledger.
    pub fn ledger(&self) -> &EnergyLedger {
        &self.ledger
    }

    /// Total kinetic energy of all floaters.
    pub fn kinetic_energy(&self) -> f64 {
        self.floaters
            .iter()
            .map(|f| f.kinetic_energy(&self.config))
            .sum()
    }

    /// Total gravitational potential energy relative to the loop bottom.
    pub fn potential_energy(&self) -> f64 {
        self.floaters
            .iter()
            .map(|f| self.config.weight() * f.height(&self.config))
            .sum()
    }
}

fn initial_position(config: &PhysicsConfig, index: usize) -> f64 {
    index as f64 * config.loop_length / config.n_floaters as f64
}

fn initial_floaters(config: &PhysicsConfig) -> Vec<Floater> {
    (0..config.n_floaters as usize)
        .map(|i| Floater::new(FloaterId(i as u32), initial_position(config, i), config))
        .collect()
}
