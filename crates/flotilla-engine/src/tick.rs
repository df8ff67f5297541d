//! Tick engine: one system, one run, one snapshot per completed step.
//!
//! [`TickEngine`] is the unit of ownership that moves between the
//! controller and the tick thread. It is usable on its own as a lockstep
//! driver: call [`execute_tick`](TickEngine::execute_tick) in a loop and
//! read results from the shared [`SnapshotStore`].

use std::sync::Arc;
use std::time::Instant;

use flotilla_core::{ConfigError, FloaterSample, PhysicsDivergence, RunId, Snapshot, StepId};
use flotilla_physics::{System, SystemMetrics};

use crate::config::SimConfig;
use crate::metrics::StepMetrics;
use crate::ring::SnapshotStore;

// ── TickResult ───────────────────────────────────────────────────

/// Result of a successful step.
#[derive(Clone, Debug)]
pub struct TickResult {
    /// The snapshot as published.
    pub snapshot: Arc<Snapshot>,
    /// Timing for this step.
    pub metrics: StepMetrics,
}

// ── TickEngine ───────────────────────────────────────────────────

/// Owns a [`System`] and publishes its state after every step.
pub struct TickEngine {
    config: SimConfig,
    system: System,
    store: Arc<SnapshotStore>,
    run: RunId,
    step_limit: Option<u64>,
    last_metrics: StepMetrics,
}

// Compile-time assertion: the engine moves onto the tick thread and back.
const _: fn() = || {
    fn assert<T: Send + 'static>() {}
    assert::<TickEngine>();
};

impl TickEngine {
    /// Validate `config`, build its system and open `run` in `store`.
    pub fn new(
        config: SimConfig,
        store: Arc<SnapshotStore>,
        run: RunId,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let system = System::new(config.physics.clone(), config.dt)?;
        let step_limit = config.step_limit();
        store.begin_run();
        Ok(Self {
            config,
            system,
            store,
            run,
            step_limit,
            last_metrics: StepMetrics::default(),
        })
    }

    /// Advance one step and publish the resulting snapshot.
    ///
    /// # Errors
    ///
    /// On [`PhysicsDivergence`] the step is discarded and nothing is
    /// published; the last good snapshot stays current.
    pub fn execute_tick(&mut self) -> Result<TickResult, PhysicsDivergence> {
        let tick_start = Instant::now();
        let step = match self.system.step() {
            Ok(step) => step,
            Err(e) => {
                log::warn!(
                    "run {} diverged after step {}: {e}",
                    self.run,
                    self.system.steps()
                );
                return Err(e);
            }
        };
        let physics_us = tick_start.elapsed().as_micros() as u64;

        let publish_start = Instant::now();
        let snapshot = self.store.publish(self.build_snapshot(&step));
        let publish_us = publish_start.elapsed().as_micros() as u64;

        let metrics = StepMetrics {
            total_us: tick_start.elapsed().as_micros() as u64,
            physics_us,
            publish_us,
        };
        self.last_metrics = metrics;
        log::trace!(
            "run {} step {} t={:.3}s torque={:.3} power={:.3}",
            self.run,
            step.step,
            step.elapsed,
            step.drive.net_torque,
            step.drive.net_power
        );
        Ok(TickResult { snapshot, metrics })
    }

    fn build_snapshot(&self, step: &SystemMetrics) -> Snapshot {
        let floaters = self
            .system
            .floaters()
            .iter()
            .map(|f| FloaterSample {
                id: f.id(),
                position: f.position(),
                velocity: f.velocity(),
                state: f.state(),
                net_force: f.forces().net,
            })
            .collect();
        Snapshot {
            // Assigned by the store.
            sequence: 0,
            run: self.run,
            step: step.step,
            time: step.elapsed,
            net_torque: step.drive.net_torque,
            net_power: step.drive.net_power,
            angular_velocity: step.drive.angular_velocity,
            floaters,
        }
    }

    /// Restore the initial system state and open a new run.
    pub fn reset(&mut self, run: RunId) {
        self.system.reset();
        self.run = run;
        self.last_metrics = StepMetrics::default();
        self.store.begin_run();
    }

    /// Whether the configured duration limit has been reached.
    pub fn limit_reached(&self) -> bool {
        self.step_limit
            .is_some_and(|limit| self.system.steps().0 >= limit)
    }

    /// Completed steps in the current run.
    pub fn current_step(&self) -> StepId {
        self.system.steps()
    }

    /// The simulated system.
    pub fn system(&self) -> &System {
        &self.system
    }

    /// The configuration this engine was built from.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The current run.
    pub fn run(&self) -> RunId {
        self.run
    }

    /// The store snapshots are published to.
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Timing of the most recent successful step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }
}

impl std::fmt::Debug for TickEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickEngine")
            .field("run", &self.run)
            .field("step", &self.system.steps())
            .field("step_limit", &self.step_limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use flotilla_core::{FloaterId, Quantity};
    use flotilla_physics::PhysicsConfig;

    fn engine(config: SimConfig) -> TickEngine {
        let store = Arc::new(SnapshotStore::new(8).unwrap());
        TickEngine::new(config, store, RunId(1)).unwrap()
    }

    #[test]
    fn invalid_config_rejected_before_publishing() {
        let store = Arc::new(SnapshotStore::new(8).unwrap());
        let config = SimConfig {
            physics: PhysicsConfig {
                floater_mass: 0.0,
                ..PhysicsConfig::default()
            },
            ..SimConfig::default()
        };
        assert!(TickEngine::new(config, Arc::clone(&store), RunId(1)).is_err());
        assert!(store.latest().is_none());
    }

    #[test]
    fn tick_publishes_snapshot() {
        let mut engine = engine(SimConfig::default());
        let result = engine.execute_tick().unwrap();
        let snap = &result.snapshot;
        assert_eq!(snap.run, RunId(1));
        assert_eq!(snap.step, StepId(1));
        assert_eq!(snap.time, 0.1);
        assert_eq!(snap.floaters.len(), 4);
        assert!(Arc::ptr_eq(snap, &engine.store().latest().unwrap()));
        assert_eq!(engine.last_metrics(), &result.metrics);
    }

    #[test]
    fn snapshot_mirrors_system() {
        let mut engine = engine(SimConfig::default());
        for _ in 0..7 {
            engine.execute_tick().unwrap();
        }
        let snap = engine.store().latest().unwrap();
        for (sample, floater) in snap.floaters.iter().zip(engine.system().floaters()) {
            assert_eq!(sample.id, floater.id());
            assert_eq!(sample.position, floater.position());
            assert_eq!(sample.velocity, floater.velocity());
            assert_eq!(sample.state, floater.state());
        }
        let drive = engine.system().last_metrics().unwrap().drive;
        assert_eq!(snap.net_torque, drive.net_torque);
        assert_relative_eq!(snap.net_power, snap.net_torque * snap.angular_velocity);
    }

    #[test]
    fn divergence_publishes_nothing() {
        let config = SimConfig {
            physics: PhysicsConfig {
                n_floaters: 1,
                loop_length: 1000.0,
                drag_coefficient: 1e307,
                ..PhysicsConfig::default()
            },
            dt: 1.0,
            ..SimConfig::default()
        };
        let mut engine = engine(config);
        engine.execute_tick().unwrap();
        let err = engine.execute_tick().unwrap_err();
        assert_eq!(err.floater, Some(FloaterId(0)));
        assert_eq!(err.quantity, Quantity::NetForce);
        assert_eq!(engine.store().published(), 1);
        assert_eq!(engine.store().latest().unwrap().step, StepId(1));
    }

    #[test]
    fn limit_reached_after_duration() {
        let mut engine = engine(SimConfig {
            max_duration: Some(0.3),
            ..SimConfig::default()
        });
        for _ in 0..2 {
            engine.execute_tick().unwrap();
            assert!(!engine.limit_reached());
        }
        engine.execute_tick().unwrap();
        assert!(engine.limit_reached());
    }

    #[test]
    fn reset_opens_new_run() {
        let mut engine = engine(SimConfig::default());
        for _ in 0..5 {
            engine.execute_tick().unwrap();
        }
        engine.reset(RunId(2));
        assert_eq!(engine.current_step(), StepId(0));
        assert!(engine.store().latest().is_none());

        let snap = engine.execute_tick().unwrap().snapshot;
        assert_eq!(snap.run, RunId(2));
        assert_eq!(snap.step, StepId(1));
        assert_eq!(snap.sequence, 5);
    }
}
