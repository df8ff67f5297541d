//! User-facing lifecycle controller.
//!
//! [`Simulation`] implements the STOPPED / RUNNING / PAUSED state machine.
//! While RUNNING, a dedicated `flotilla-tick` thread owns the
//! [`TickEngine`]; while PAUSED (or STOPPED with the system retained) the
//! controller holds it. Readers never talk to the controller: they clone
//! the [`SnapshotStore`] handle from [`Simulation::store`] and poll it from
//! any thread.
//!
//! ```text
//!              start(cfg)                 pause()
//!   STOPPED ───────────────▶ RUNNING ───────────────▶ PAUSED
//!      ▲  ◀─── stop() / limit / divergence ───┐ ◀──── resume()
//!      │                                      │
//!      └──────────── stop() ◀─────────────────┘ step(): PAUSED ─▶ PAUSED
//!
//!   reset() / reset_with(cfg): any state ─▶ RUNNING (new run)
//! ```

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use flotilla_core::{LifecycleState, PhysicsDivergence, RunId, Snapshot};

use crate::config::SimConfig;
use crate::error::{Operation, SimError};
use crate::metrics::LoopStats;
use crate::ring::{SnapshotStore, DEFAULT_HISTORY};
use crate::tick::TickEngine;
use crate::tick_thread::{ExitReason, LoopControl, LoopExit, TickThreadState};

/// Handle to a running tick thread.
struct TickThread {
    control: Sender<LoopControl>,
    /// Disconnects when the thread exits, for any reason.
    done: Receiver<()>,
    handle: JoinHandle<LoopExit>,
}

// ── Simulation ───────────────────────────────────────────────────

/// Lifecycle controller for one simulation at a time.
///
/// Every operation returns `Result<_, SimError>`. A rejected operation
/// never changes the lifecycle state.
///
/// Runs can end without a call from the controller (duration limit or
/// divergence). Methods taking `&mut self` first collect a finished tick
/// thread, so [`state`](Self::state) and friends always reflect it.
pub struct Simulation {
    store: Arc<SnapshotStore>,
    state: LifecycleState,
    config: Option<SimConfig>,
    /// Held while PAUSED, or STOPPED with the system retained.
    engine: Option<TickEngine>,
    /// Present while RUNNING.
    tick: Option<TickThread>,
    runs: u64,
    last_error: Option<PhysicsDivergence>,
    exit_reason: Option<ExitReason>,
    stats: LoopStats,
}

// Compile-time assertion: the controller can be handed to another thread.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<Simulation>();
};

impl Default for Simulation {
    fn default() -> Self {
        Self::with_store(SnapshotStore::default())
    }
}

impl Simulation {
    /// An idle controller keeping [`DEFAULT_HISTORY`] snapshots.
    pub fn new() -> Self {
        Self::default()
    }

    /// An idle controller keeping `history_len` snapshots.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidConfiguration`] if `history_len < 2`.
    pub fn with_history(history_len: usize) -> Result<Self, SimError> {
        Ok(Self::with_store(SnapshotStore::new(history_len)?))
    }

    fn with_store(store: SnapshotStore) -> Self {
        Self {
            store: Arc::new(store),
            state: LifecycleState::Stopped,
            config: None,
            engine: None,
            tick: None,
            runs: 0,
            last_error: None,
            exit_reason: None,
            stats: LoopStats::default(),
        }
    }

    // ── Lifecycle operations ─────────────────────────────────────

    /// STOPPED → RUNNING with a fresh system built from `config`.
    pub fn start(&mut self, config: SimConfig) -> Result<(), SimError> {
        self.reap();
        self.require(Operation::Start, &[LifecycleState::Stopped])?;
        self.launch(config)
    }

    /// RUNNING → PAUSED. The system is retained as-is.
    ///
    /// If the run ended by itself before the request reached the tick
    /// thread, the controller ends up STOPPED and this returns
    /// [`SimError::InvalidTransition`].
    pub fn pause(&mut self) -> Result<(), SimError> {
        self.reap();
        self.require(Operation::Pause, &[LifecycleState::Running])?;
        match self.halt_tick() {
            Some(ExitReason::Halted) => {
                self.state = LifecycleState::Paused;
                log::info!("simulation paused at step {}", self.step_label());
                Ok(())
            }
            reason => {
                self.finish(reason.unwrap_or(ExitReason::Halted));
                Err(SimError::InvalidTransition {
                    op: Operation::Pause,
                    state: self.state,
                })
            }
        }
    }

    /// PAUSED → RUNNING, continuing from the retained system.
    pub fn resume(&mut self) -> Result<(), SimError> {
        self.reap();
        self.require(Operation::Resume, &[LifecycleState::Paused])?;
        let Some(engine) = self.engine.take() else {
            return Err(SimError::InvalidTransition {
                op: Operation::Resume,
                state: self.state,
            });
        };
        self.spawn(engine)?;
        log::info!("simulation resumed");
        Ok(())
    }

    /// RUNNING or PAUSED → STOPPED.
    ///
    /// The last published snapshot stays available. The system is kept for
    /// inspection and manual stepping when the config says
    /// `retain_on_stop`.
    pub fn stop(&mut self) -> Result<(), SimError> {
        self.reap();
        self.require(
            Operation::Stop,
            &[LifecycleState::Running, LifecycleState::Paused],
        )?;
        let reason = self.halt_tick().unwrap_or(ExitReason::Halted);
        self.finish(reason);
        Ok(())
    }

    /// Any state → RUNNING with the last-used configuration.
    ///
    /// The clock and every floater return to their initial state and a new
    /// run begins; snapshots of earlier runs are no longer returned.
    pub fn reset(&mut self) -> Result<(), SimError> {
        self.reap();
        let Some(config) = self.config.clone() else {
            return Err(SimError::InvalidTransition {
                op: Operation::Reset,
                state: self.state,
            });
        };
        self.halt_tick();
        match self.engine.take() {
            Some(mut engine) => {
                self.runs += 1;
                engine.reset(RunId(self.runs));
                log::info!("simulation reset: run {}", self.runs);
                self.begin(engine)
            }
            None => self.launch(config),
        }
    }

    /// Any state → RUNNING with a new configuration.
    ///
    /// An invalid `config` is rejected before the current run is touched.
    pub fn reset_with(&mut self, config: SimConfig) -> Result<(), SimError> {
        self.reap();
        config.validate()?;
        self.halt_tick();
        self.engine = None;
        self.launch(config)
    }

    /// Advance exactly one step while PAUSED, or while STOPPED with a
    /// retained system, and return its snapshot. Ends PAUSED.
    ///
    /// # Errors
    ///
    /// [`SimError::InvalidTransition`] while RUNNING or without a system.
    /// [`SimError::Divergence`] if the step diverged; the run is then
    /// STOPPED and the previous snapshot stays current.
    pub fn step(&mut self) -> Result<Arc<Snapshot>, SimError> {
        self.reap();
        let Some(engine) = self.engine.as_mut() else {
            return Err(SimError::InvalidTransition {
                op: Operation::Step,
                state: self.state,
            });
        };
        match engine.execute_tick() {
            Ok(result) => {
                if self.state != LifecycleState::Paused {
                    log::info!("simulation paused for manual stepping");
                }
                self.state = LifecycleState::Paused;
                Ok(result.snapshot)
            }
            Err(e) => {
                self.last_error = Some(e);
                self.engine = None;
                self.finish(ExitReason::Diverged(e));
                Err(SimError::Divergence(e))
            }
        }
    }

    /// Block until the current run stops or `timeout` elapses.
    ///
    /// Returns why the run ended, or `None` if it is still running (or
    /// paused, which never ends by itself) when the wait is over.
    pub fn wait_stopped(&mut self, timeout: Duration) -> Option<ExitReason> {
        if let Some(tick) = &self.tick {
            if let Err(RecvTimeoutError::Timeout) = tick.done.recv_timeout(timeout) {
                return None;
            }
            // Disconnected: the loop has returned and the join is immediate.
            if let Some(tick) = self.tick.take() {
                let reason = self.join_tick(tick);
                self.finish(reason);
            }
        }
        match self.state {
            LifecycleState::Stopped => self.exit_reason,
            _ => None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────

    /// Current lifecycle state.
    pub fn state(&mut self) -> LifecycleState {
        self.reap();
        self.state
    }

    /// Most recent snapshot of the current run, if any step has completed.
    ///
    /// Still returns the final snapshot after `stop()` or a divergence.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.store.latest()
    }

    /// Retained snapshots of the current run, oldest first.
    pub fn history(&self) -> Vec<Arc<Snapshot>> {
        self.store.history()
    }

    /// Shared handle for reader threads.
    pub fn store(&self) -> Arc<SnapshotStore> {
        Arc::clone(&self.store)
    }

    /// The configuration of the current (or last) run.
    pub fn config(&self) -> Option<&SimConfig> {
        self.config.as_ref()
    }

    /// The divergence that ended the last run, if it ended that way.
    pub fn last_error(&mut self) -> Option<PhysicsDivergence> {
        self.reap();
        self.last_error
    }

    /// Why the last stint of RUNNING ended. `None` while a run has not yet
    /// ended.
    pub fn exit_reason(&mut self) -> Option<ExitReason> {
        self.reap();
        self.exit_reason
    }

    /// Tick-loop counters accumulated since the current run began.
    pub fn stats(&mut self) -> LoopStats {
        self.reap();
        self.stats
    }

    // ── Internals ────────────────────────────────────────────────

    fn require(&self, op: Operation, allowed: &[LifecycleState]) -> Result<(), SimError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            log::debug!("rejected {op} while {}", self.state);
            Err(SimError::InvalidTransition {
                op,
                state: self.state,
            })
        }
    }

    /// Build a fresh engine for a new run and start it.
    fn launch(&mut self, config: SimConfig) -> Result<(), SimError> {
        let run = RunId(self.runs + 1);
        let engine = TickEngine::new(config.clone(), Arc::clone(&self.store), run)?;
        self.runs += 1;
        log::info!(
            "simulation started: run {run}, {} floaters, dt {}s",
            config.physics.n_floaters,
            config.dt
        );
        self.config = Some(config);
        self.begin(engine)
    }

    /// Clear per-run bookkeeping and hand `engine` to a new tick thread.
    fn begin(&mut self, engine: TickEngine) -> Result<(), SimError> {
        self.last_error = None;
        self.exit_reason = None;
        self.stats = LoopStats::default();
        self.spawn(engine)
    }

    fn spawn(&mut self, engine: TickEngine) -> Result<(), SimError> {
        let (control_tx, control_rx) = crossbeam_channel::bounded(1);
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);
        let budget = engine
            .config()
            .step_budget_secs()
            .map(Duration::from_secs_f64);
        let spawned = thread::Builder::new()
            .name("flotilla-tick".into())
            .spawn(move || {
                let _done = done_tx;
                TickThreadState::new(engine, control_rx, budget).run()
            });
        match spawned {
            Ok(handle) => {
                self.tick = Some(TickThread {
                    control: control_tx,
                    done: done_rx,
                    handle,
                });
                self.state = LifecycleState::Running;
                Ok(())
            }
            Err(e) => {
                // The engine went down with the closure.
                self.engine = None;
                self.state = LifecycleState::Stopped;
                Err(SimError::ThreadSpawnFailed {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Ask the tick thread to stop after its current step, then collect it.
    fn halt_tick(&mut self) -> Option<ExitReason> {
        let tick = self.tick.take()?;
        // Fails only if the loop already exited by itself.
        let _ = tick.control.send(LoopControl::Halt);
        Some(self.join_tick(tick))
    }

    /// Collect a tick thread that stopped by itself.
    fn reap(&mut self) {
        if let Some(tick) = self.tick.take_if(|t| t.handle.is_finished()) {
            let reason = self.join_tick(tick);
            self.finish(reason);
        }
    }

    fn join_tick(&mut self, tick: TickThread) -> ExitReason {
        match tick.handle.join() {
            Ok(exit) => {
                self.stats.merge(&exit.stats);
                if let ExitReason::Diverged(e) = exit.reason {
                    self.last_error = Some(e);
                } else {
                    self.engine = Some(exit.engine);
                }
                exit.reason
            }
            Err(_) => {
                log::error!("tick thread panicked; run {} is lost", self.runs);
                ExitReason::Panicked
            }
        }
    }

    /// Enter STOPPED.
    fn finish(&mut self, reason: ExitReason) {
        let retain = self.config.as_ref().is_some_and(|c| c.retain_on_stop);
        if !retain {
            self.engine = None;
        }
        self.state = LifecycleState::Stopped;
        self.exit_reason = Some(reason);
        match reason {
            ExitReason::Diverged(e) => log::warn!("simulation stopped: {e}"),
            _ => log::info!("simulation stopped ({reason}) at step {}", self.step_label()),
        }
    }

    fn step_label(&self) -> String {
        self.engine
            .as_ref()
            .map_or_else(|| "-".to_string(), |e| e.current_step().to_string())
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.halt_tick();
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("state", &self.state)
            .field("runs", &self.runs)
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flotilla_core::{ConfigError, StepId};
    use flotilla_physics::PhysicsConfig;

    fn manual() -> SimConfig {
        // Long limit, unpaced; tests pause immediately and step by hand.
        SimConfig::default().unpaced()
    }

    #[test]
    fn new_controller_is_idle() {
        let mut sim = Simulation::new();
        assert_eq!(sim.state(), LifecycleState::Stopped);
        assert!(sim.latest().is_none());
        assert!(sim.config().is_none());
        assert_eq!(sim.store().capacity(), DEFAULT_HISTORY);
    }

    #[test]
    fn small_history_rejected() {
        assert!(matches!(
            Simulation::with_history(1),
            Err(SimError::InvalidConfiguration(ConfigError::HistoryTooSmall {
                configured: 1
            }))
        ));
    }

    #[test]
    fn operations_rejected_when_idle() {
        let mut sim = Simulation::new();
        for (op, result) in [
            (Operation::Pause, sim.pause()),
            (Operation::Resume, sim.resume()),
            (Operation::Stop, sim.stop()),
            (Operation::Reset, sim.reset()),
        ] {
            match result {
                Err(SimError::InvalidTransition { op: got, state }) => {
                    assert_eq!(got, op);
                    assert_eq!(state, LifecycleState::Stopped);
                }
                other => panic!("{op} while idle returned {other:?}"),
            }
        }
        assert!(matches!(
            sim.step(),
            Err(SimError::InvalidTransition {
                op: Operation::Step,
                ..
            })
        ));
        assert_eq!(sim.state(), LifecycleState::Stopped);
    }

    #[test]
    fn invalid_config_never_starts() {
        let mut sim = Simulation::new();
        let config = SimConfig {
            physics: PhysicsConfig {
                floater_mass: 0.0,
                ..PhysicsConfig::default()
            },
            ..SimConfig::default()
        };
        assert!(matches!(
            sim.start(config),
            Err(SimError::InvalidConfiguration(_))
        ));
        assert_eq!(sim.state(), LifecycleState::Stopped);
        assert!(sim.latest().is_none());
        assert_eq!(sim.store().published(), 0);
    }

    #[test]
    fn paused_steps_advance_one_dt() {
        let mut sim = Simulation::new();
        sim.start(manual()).unwrap();
        sim.pause().unwrap();
        assert_eq!(sim.state(), LifecycleState::Paused);

        let before = sim.latest().map_or(0, |s| s.step.0);
        let snap = sim.step().unwrap();
        assert_eq!(snap.step, StepId(before + 1));
        assert_eq!(sim.state(), LifecycleState::Paused);
        assert!(Arc::ptr_eq(&snap, &sim.latest().unwrap()));
    }

    #[test]
    fn step_rejected_while_running() {
        let mut sim = Simulation::new();
        sim.start(SimConfig::default()).unwrap();
        assert!(matches!(
            sim.step(),
            Err(SimError::InvalidTransition {
                op: Operation::Step,
                state: LifecycleState::Running
            })
        ));
        assert_eq!(sim.state(), LifecycleState::Running);
        sim.stop().unwrap();
    }

    #[test]
    fn start_rejected_while_running() {
        let mut sim = Simulation::new();
        sim.start(SimConfig::default()).unwrap();
        assert!(matches!(
            sim.start(SimConfig::default()),
            Err(SimError::InvalidTransition {
                op: Operation::Start,
                state: LifecycleState::Running
            })
        ));
    }

    #[test]
    fn stopped_without_retain_cannot_step() {
        let mut sim = Simulation::new();
        sim.start(SimConfig {
            retain_on_stop: false,
            ..manual()
        })
        .unwrap();
        sim.stop().unwrap();
        assert!(matches!(
            sim.step(),
            Err(SimError::InvalidTransition {
                op: Operation::Step,
                state: LifecycleState::Stopped
            })
        ));
    }

    #[test]
    fn stopped_with_retain_steps_into_paused() {
        let mut sim = Simulation::new();
        sim.start(manual()).unwrap();
        sim.stop().unwrap();
        assert_eq!(sim.exit_reason(), Some(ExitReason::Halted));
        sim.step().unwrap();
        assert_eq!(sim.state(), LifecycleState::Paused);
        sim.resume().unwrap();
        assert_eq!(sim.state(), LifecycleState::Running);
    }

    #[test]
    fn reset_with_invalid_config_keeps_run() {
        let mut sim = Simulation::new();
        sim.start(manual()).unwrap();
        sim.pause().unwrap();
        let bad = SimConfig {
            dt: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            sim.reset_with(bad),
            Err(SimError::InvalidConfiguration(_))
        ));
        assert_eq!(sim.state(), LifecycleState::Paused);
        assert!(sim.step().is_ok());
    }

    #[test]
    fn duration_limit_stops_run() {
        let mut sim = Simulation::new();
        sim.start(SimConfig {
            max_duration: Some(1.0),
            ..SimConfig::default().unpaced()
        })
        .unwrap();
        let reason = sim.wait_stopped(Duration::from_secs(10));
        assert_eq!(reason, Some(ExitReason::DurationReached));
        assert_eq!(sim.state(), LifecycleState::Stopped);
        assert_eq!(sim.latest().unwrap().step, StepId(10));
        assert_eq!(sim.stats().steps, 10);
    }

    /// Install a tick thread that panics instead of running a loop.
    fn install_panicking_tick(sim: &mut Simulation) {
        let (control_tx, _control_rx) = crossbeam_channel::bounded(1);
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);
        let handle = thread::Builder::new()
            .name("flotilla-tick".into())
            .spawn(move || -> LoopExit {
                let _done = done_tx;
                panic!("tick loop failure");
            })
            .unwrap();
        sim.tick = Some(TickThread {
            control: control_tx,
            done: done_rx,
            handle,
        });
        sim.config = Some(manual());
        sim.runs = 1;
        sim.state = LifecycleState::Running;
    }

    #[test]
    fn panicked_tick_thread_stops_the_run() {
        let mut sim = Simulation::new();
        install_panicking_tick(&mut sim);

        let reason = sim.wait_stopped(Duration::from_secs(10));
        assert_eq!(reason, Some(ExitReason::Panicked));
        assert_eq!(sim.state(), LifecycleState::Stopped);
        assert_eq!(sim.exit_reason(), Some(ExitReason::Panicked));
        assert!(sim.last_error().is_none());
        // The system went down with the thread.
        assert!(matches!(
            sim.step(),
            Err(SimError::InvalidTransition {
                op: Operation::Step,
                ..
            })
        ));
    }

    #[test]
    fn reset_after_panic_launches_a_fresh_run() {
        let mut sim = Simulation::new();
        install_panicking_tick(&mut sim);
        assert_eq!(
            sim.wait_stopped(Duration::from_secs(10)),
            Some(ExitReason::Panicked)
        );

        sim.reset().unwrap();
        assert_eq!(sim.state(), LifecycleState::Running);
        sim.pause().unwrap();
        let snap = sim.step().unwrap();
        assert_eq!(snap.run, RunId(2));
        sim.stop().unwrap();
        assert_eq!(sim.exit_reason(), Some(ExitReason::Halted));
    }
}
