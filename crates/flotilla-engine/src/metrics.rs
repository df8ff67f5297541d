//! Per-step timing and loop statistics.
//!
//! [`StepMetrics`] is measured by the tick engine on every step;
//! [`LoopStats`] is accumulated by the tick thread over one stint of
//! RUNNING and handed back when the thread exits.

use std::time::Duration;

/// Wall-clock cost of a single step. All durations are in microseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepMetrics {
    /// Entire step, physics plus publication.
    pub total_us: u64,
    /// Floater integration and drivetrain aggregation.
    pub physics_us: u64,
    /// Building and publishing the snapshot.
    pub publish_us: u64,
}

/// Counters for one stint of the tick thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Steps completed.
    pub steps: u64,
    /// Paced steps whose computation exceeded the wall-clock budget.
    pub overruns: u64,
    /// Largest single step cost, in microseconds.
    pub max_step_us: u64,
    /// Sum of step costs, in microseconds.
    pub busy_us: u64,
}

impl LoopStats {
    /// Record a completed step.
    pub fn record(&mut self, metrics: &StepMetrics, overran: bool) {
        self.steps += 1;
        self.busy_us += metrics.total_us;
        self.max_step_us = self.max_step_us.max(metrics.total_us);
        if overran {
            self.overruns += 1;
        }
    }

    /// Mean step cost, or zero before any step.
    pub fn mean_step(&self) -> Duration {
        if self.steps == 0 {
            Duration::ZERO
        } else {
            Duration::from_micros(self.busy_us / self.steps)
        }
    }

    /// Fold another stint's counters into this one.
    pub fn merge(&mut self, other: &LoopStats) {
        self.steps += other.steps;
        self.overruns += other.overruns;
        self.busy_us += other.busy_us;
        self.max_step_us = self.max_step_us.max(other.max_step_us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let s = LoopStats::default();
        assert_eq!(s.steps, 0);
        assert_eq!(s.mean_step(), Duration::ZERO);
    }

    #[test]
    fn record_and_merge() {
        let mut a = LoopStats::default();
        a.record(
            &StepMetrics {
                total_us: 30,
                physics_us: 20,
                publish_us: 10,
            },
            false,
        );
        a.record(
            &StepMetrics {
                total_us: 50,
                ..StepMetrics::default()
            },
            true,
        );
        assert_eq!(a.steps, 2);
        assert_eq!(a.overruns, 1);
        assert_eq!(a.max_step_us, 50);
        assert_eq!(a.mean_step(), Duration::from_micros(40));

        let mut total = LoopStats {
            steps: 1,
            overruns: 0,
            max_step_us: 70,
            busy_us: 70,
        };
        total.merge(&a);
        assert_eq!(total.steps, 3);
        assert_eq!(total.overruns, 1);
        assert_eq!(total.max_step_us, 70);
        assert_eq!(total.busy_us, 150);
    }
}
