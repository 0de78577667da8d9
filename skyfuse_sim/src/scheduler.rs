// skyfuse_sim/src/scheduler.rs

//! A minimal periodic scheduler: one OS thread per task, released at a fixed
//! rate, with explicit stop and join.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::SimError;

// =========================================================================
// == Task Definition ==
// =========================================================================

/// What the task body wants the scheduler to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskControl {
    Continue,
    Stop,
}

/// Work executed once per period.
pub trait Periodic: Send + 'static {
    fn run_once(&mut self) -> TaskControl;
}

/// How releases are spaced in wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// Sleep until the next period boundary.
    RealTime,
    /// Run the next iteration immediately. Simulated time still advances by
    /// one period per iteration.
    AsFastAsPossible,
}

#[derive(Debug, Clone)]
pub struct TaskSpec {
    pub name: String,
    pub rate_hz: f64,
    /// Execution time above which an iteration counts as a deadline miss.
    pub budget: Duration,
    pub pacing: Pacing,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, rate_hz: f64) -> Self {
        let period = period_of(rate_hz);
        Self {
            name: name.into(),
            rate_hz,
            // Leave a fifth of the period as margin.
            budget: period * 4 / 5,
            pacing: Pacing::RealTime,
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn period(&self) -> Duration {
        period_of(self.rate_hz)
    }
}

fn period_of(rate_hz: f64) -> Duration {
    Duration::from_nanos((1e9 / rate_hz).round() as u64)
}

// =========================================================================
// == Task Statistics ==
// =========================================================================

/// Timing statistics of one task.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TaskStats {
    pub last_execution_us: u64,
    /// Exponential moving average (alpha = 0.1).
    pub avg_execution_us: u64,
    pub max_execution_us: u64,
    /// Iterations whose execution time exceeded the budget.
    pub deadline_misses: u64,
    /// Exponential moving average of the deviation from the target period.
    pub avg_jitter_us: u64,
    pub execution_count: u64,
}

impl TaskStats {
    /// Records one iteration. Returns true if it missed its deadline.
    pub fn update(
        &mut self,
        execution_us: u64,
        period_us: u64,
        target_period_us: u64,
        budget_us: u64,
    ) -> bool {
        self.last_execution_us = execution_us;
        self.execution_count = self.execution_count.saturating_add(1);

        if self.execution_count == 1 {
            self.avg_execution_us = execution_us;
        } else {
            self.avg_execution_us = (execution_us + 9 * self.avg_execution_us) / 10;
        }
        self.max_execution_us = self.max_execution_us.max(execution_us);

        let jitter = period_us.abs_diff(target_period_us);
        if self.execution_count == 1 {
            self.avg_jitter_us = jitter;
        } else {
            self.avg_jitter_us = (jitter + 9 * self.avg_jitter_us) / 10;
        }

        let missed = execution_us > budget_us;
        if missed {
            self.deadline_misses = self.deadline_misses.saturating_add(1);
        }
        missed
    }
}

// =========================================================================
// == Periodic Task ==
// =========================================================================

/// Handle to a running periodic task.
///
/// Dropping the handle detaches the thread; call [`PeriodicTask::stop`] or
/// [`PeriodicTask::join`] to get the body and its statistics back.
pub struct PeriodicTask<T: Periodic> {
    name: String,
    stop: Arc<AtomicBool>,
    handle: JoinHandle<(T, TaskStats)>,
}

impl<T: Periodic> PeriodicTask<T> {
    pub fn spawn(spec: TaskSpec, mut body: T) -> Result<Self, SimError> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = stop.clone();
        let name = spec.name.clone();

        let handle = thread::Builder::new()
            .name(spec.name.clone())
            .spawn(move || {
                let stats = run_loop(&spec, &mut body, &stop_flag);
                (body, stats)
            })
            .map_err(|source| SimError::Spawn {
                task: name.clone(),
                source,
            })?;

        debug!("Spawned periodic task '{}'.", name);
        Ok(Self { name, stop, handle })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Asks the task to stop after its current iteration and waits for it.
    pub fn stop(self) -> Result<(T, TaskStats), SimError> {
        self.stop.store(true, Ordering::Release);
        self.join()
    }

    /// Waits for the task to end on its own.
    pub fn join(self) -> Result<(T, TaskStats), SimError> {
        let name = self.name;
        self.handle
            .join()
            .map_err(|_| SimError::TaskPanicked(name))
    }
}

fn run_loop<T: Periodic>(spec: &TaskSpec, body: &mut T, stop: &AtomicBool) -> TaskStats {
    let period = spec.period();
    let target_period_us = period.as_micros() as u64;
    let budget_us = spec.budget.as_micros() as u64;

    let mut stats = TaskStats::default();
    let mut next_release = Instant::now();
    let mut last_start: Option<Instant> = None;

    while !stop.load(Ordering::Acquire) {
        let start = Instant::now();
        let control = body.run_once();
        let execution_us = start.elapsed().as_micros() as u64;

        let period_us = match (spec.pacing, last_start) {
            (Pacing::RealTime, Some(last)) => start.duration_since(last).as_micros() as u64,
            _ => target_period_us,
        };
        last_start = Some(start);

        if stats.update(execution_us, period_us, target_period_us, budget_us) {
            warn!(
                "Task '{}' missed its deadline: {} us > {} us budget ({} misses so far).",
                spec.name, execution_us, budget_us, stats.deadline_misses
            );
        }

        if control == TaskControl::Stop {
            break;
        }

        if spec.pacing == Pacing::RealTime {
            next_release += period;
            let now = Instant::now();
            if next_release > now {
                thread::sleep(next_release - now);
            } else {
                // Overran; don't try to catch up with a burst.
                next_release = now;
            }
        }
    }

    debug!(
        "Task '{}' finished after {} iterations.",
        spec.name, stats.execution_count
    );
    stats
}
