//! The RUNNING loop: step, publish, pace, repeat.
//!
//! The tick thread owns the [`TickEngine`] exclusively while it runs
//! (moved in via `thread::spawn`) and hands it back through its
//! `JoinHandle` on exit. The controller talks to it over a crossbeam
//! control channel. The channel is polled once at the top of every
//! iteration and doubles as the pacing timer, so a halt request wakes the
//! loop from its wait immediately and never interrupts a step.

use std::fmt;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use flotilla_core::PhysicsDivergence;

use crate::metrics::LoopStats;
use crate::tick::TickEngine;

/// Requests from the controller to the tick thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LoopControl {
    /// Finish the current step, then return the engine.
    Halt,
}

// ── ExitReason ───────────────────────────────────────────────────

/// Why the most recent stint of RUNNING ended.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ExitReason {
    /// The controller asked the loop to stop (pause, stop or reset).
    Halted,
    /// The configured `max_duration` was reached.
    DurationReached,
    /// A step produced a non-finite value. The run is over.
    Diverged(PhysicsDivergence),
    /// The tick thread panicked; its engine is lost.
    Panicked,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Halted => f.write_str("halted"),
            Self::DurationReached => f.write_str("duration reached"),
            Self::Diverged(e) => write!(f, "diverged: {e}"),
            Self::Panicked => f.write_str("tick thread panicked"),
        }
    }
}

/// What the tick thread returns through its `JoinHandle`.
#[derive(Debug)]
pub(crate) struct LoopExit {
    pub engine: TickEngine,
    pub reason: ExitReason,
    pub stats: LoopStats,
}

// ── TickThreadState ──────────────────────────────────────────────

/// State held by the tick thread's main loop.
pub(crate) struct TickThreadState {
    engine: TickEngine,
    control: Receiver<LoopControl>,
    step_budget: Option<Duration>,
    stats: LoopStats,
}

impl TickThreadState {
    pub fn new(
        engine: TickEngine,
        control: Receiver<LoopControl>,
        step_budget: Option<Duration>,
    ) -> Self {
        Self {
            engine,
            control,
            step_budget,
            stats: LoopStats::default(),
        }
    }

    /// Main loop. Runs until halted, the duration limit is hit, or a step
    /// diverges. A dropped controller counts as a halt.
    pub fn run(mut self) -> LoopExit {
        log::debug!(
            "tick loop entered: run {} at step {}",
            self.engine.run(),
            self.engine.current_step()
        );
        let reason = loop {
            match self.control.try_recv() {
                Ok(LoopControl::Halt) | Err(TryRecvError::Disconnected) => {
                    break ExitReason::Halted
                }
                Err(TryRecvError::Empty) => {}
            }
            if self.engine.limit_reached() {
                break ExitReason::DurationReached;
            }

            let tick_start = Instant::now();
            match self.engine.execute_tick() {
                Ok(result) => {
                    let overran = self
                        .step_budget
                        .is_some_and(|budget| tick_start.elapsed() > budget);
                    self.stats.record(&result.metrics, overran);
                    if overran {
                        self.report_overrun(result.metrics.total_us);
                    }
                }
                Err(e) => break ExitReason::Diverged(e),
            }
            if self.engine.limit_reached() {
                break ExitReason::DurationReached;
            }

            if let Some(budget) = self.step_budget {
                if let Some(remaining) = budget.checked_sub(tick_start.elapsed()) {
                    match self.control.recv_timeout(remaining) {
                        Ok(LoopControl::Halt) | Err(RecvTimeoutError::Disconnected) => {
                            break ExitReason::Halted
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                    }
                }
            }
        };
        log::debug!(
            "tick loop exited ({reason}): run {} at step {}, {} steps this stint",
            self.engine.run(),
            self.engine.current_step(),
            self.stats.steps
        );
        LoopExit {
            engine: self.engine,
            reason,
            stats: self.stats,
        }
    }

    fn report_overrun(&self, step_us: u64) {
        // First overrun of a stint is a warning; the rest would flood the log.
        if self.stats.overruns == 1 {
            log::warn!(
                "step {} took {step_us}us, over its {:?} budget; simulation is running behind real time",
                self.engine.current_step(),
                self.step_budget.unwrap_or_default()
            );
        } else {
            log::trace!("step {} overran ({step_us}us)", self.engine.current_step());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::ring::SnapshotStore;
    use flotilla_core::{RunId, StepId};
    use flotilla_physics::PhysicsConfig;
    use std::sync::Arc;
    use std::thread;

    fn engine(config: SimConfig) -> TickEngine {
        let store = Arc::new(SnapshotStore::new(16).unwrap());
        TickEngine::new(config, store, RunId(1)).unwrap()
    }

    #[test]
    fn stops_at_duration_limit() {
        let config = SimConfig {
            max_duration: Some(2.0),
            ..SimConfig::default()
        }
        .unpaced();
        let (_tx, rx) = crossbeam_channel::bounded(1);
        let exit = TickThreadState::new(engine(config), rx, None).run();
        assert_eq!(exit.reason, ExitReason::DurationReached);
        assert_eq!(exit.engine.current_step(), StepId(20));
        assert_eq!(exit.stats.steps, 20);
        assert_eq!(exit.stats.overruns, 0);
    }

    #[test]
    fn pending_halt_runs_no_step() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        tx.send(LoopControl::Halt).unwrap();
        let exit = TickThreadState::new(engine(SimConfig::default()), rx, None).run();
        assert_eq!(exit.reason, ExitReason::Halted);
        assert_eq!(exit.engine.current_step(), StepId(0));
    }

    #[test]
    fn dropped_controller_halts() {
        let (tx, rx) = crossbeam_channel::bounded::<LoopControl>(1);
        drop(tx);
        let exit = TickThreadState::new(engine(SimConfig::default()), rx, None).run();
        assert_eq!(exit.reason, ExitReason::Halted);
    }

    #[test]
    fn divergence_ends_loop() {
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
        let (_tx, rx) = crossbeam_channel::bounded(1);
        let exit = TickThreadState::new(engine(config), rx, None).run();
        assert!(matches!(exit.reason, ExitReason::Diverged(_)));
        assert_eq!(exit.engine.current_step(), StepId(1));
        assert_eq!(exit.stats.steps, 1);
    }

    #[test]
    fn halt_interrupts_pacing_wait() {
        // One step per ten seconds of wall time.
        let budget = Some(Duration::from_secs(10));
        let (tx, rx) = crossbeam_channel::bounded(1);
        let handle = thread::spawn(move || {
            TickThreadState::new(engine(SimConfig::default()), rx, budget).run()
        });
        thread::sleep(Duration::from_millis(50));

        let start = Instant::now();
        tx.send(LoopControl::Halt).unwrap();
        let exit = handle.join().unwrap();
        assert!(
            start.elapsed() < Duration::from_secs(2),
            "halt waited out the pacing budget"
        );
        assert_eq!(exit.reason, ExitReason::Halted);
        assert_eq!(exit.engine.current_step(), StepId(1));
    }
}
