// skyfuse_sim/src/lib.rs

//! Host side of SkyFuse: configuration loading, a periodic scheduler, a
//! simulated sensor suite and the tasks that drive the `skyfuse_core`
//! pipeline.

use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use skyfuse_core::estimation::{BuildContext, Chain, FilterRegistry, Pipeline, PipelineContext};
use skyfuse_core::localization::pose_channel;
use skyfuse_core::state::StateField;

use crate::config::HostConfig;
use crate::localization::LocalizationTask;
use crate::runtime::{EstimationSummary, EstimationTask};
use crate::scheduler::{Pacing, TaskSpec};
use crate::sensors::{SimClock, SimulatedSensors};
use crate::trajectory::{Trajectory, TruthSample};

// This prelude is for convenience for binaries and tests using this crate.
pub mod prelude;

pub mod cli;
pub mod config;
pub mod error;
pub mod localization;
pub mod runtime;
pub mod scheduler;
pub mod sensors;
pub mod trajectory;

pub use error::{ConfigError, SimError};

/// How a run is driven, on top of what the configuration file says.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunOptions {
    pub pacing: Pacing,
    /// Overrides `simulation.duration_s`.
    pub duration_s: Option<f64>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            pacing: Pacing::RealTime,
            duration_s: None,
        }
    }
}

/// Outcome of a complete run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub estimation: EstimationSummary,
    /// Truth at the time of the last cycle.
    pub truth: TruthSample,
    /// Number of poses the localization task published, if it ran.
    pub localization_poses: Option<u64>,
}

impl RunSummary {
    /// Distance between the estimated and the true position, if the last
    /// cycle produced a position.
    pub fn position_error(&self) -> Option<f64> {
        let state = &self.estimation.final_state;
        state
            .is_fresh(StateField::Position)
            .then(|| (state.position - self.truth.position).norm())
    }

    /// Angle between the estimated and the true attitude (radians), if the
    /// last cycle produced an attitude.
    pub fn attitude_error(&self) -> Option<f64> {
        let state = &self.estimation.final_state;
        state
            .is_fresh(StateField::Attitude)
            .then(|| state.attitude.angle_to(&self.truth.attitude))
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let est = &self.estimation;
        writeln!(
            f,
            "{} cycles: {} ok, {} partial failure, {} fatal",
            est.cycles, est.tally.ok, est.tally.partial_failure, est.tally.fatal
        )?;
        writeln!(
            f,
            "timing: avg {} us, max {} us, {} deadline misses",
            est.stats.avg_execution_us, est.stats.max_execution_us, est.stats.deadline_misses
        )?;
        writeln!(f, "fresh fields: {}", est.final_state.updated())?;
        if let Some(e) = self.position_error() {
            writeln!(f, "position error: {:.3} m", e)?;
        }
        if let Some(e) = self.attitude_error() {
            writeln!(f, "attitude error: {:.2} deg", e.to_degrees())?;
        }
        if let Some(poses) = self.localization_poses {
            writeln!(f, "localization poses: {}", poses)?;
        }
        Ok(())
    }
}

/// Runs one simulation to completion: builds the chain from `config`,
/// starts the localization task if enabled, drives the pipeline for the
/// configured duration and shuts everything down again.
pub fn run(config: &HostConfig, options: RunOptions) -> Result<RunSummary, SimError> {
    let duration_s = options.duration_s.unwrap_or(config.simulation.duration_s);
    if !(duration_s.is_finite() && duration_s > 0.0) {
        return Err(ConfigError::Invalid {
            field: "duration",
            reason: format!("must be positive, got {}", duration_s),
        }
        .into());
    }
    if config.cycles_for(duration_s) == 0 {
        return Err(ConfigError::Invalid {
            field: "duration",
            reason: format!(
                "{} s is shorter than one cycle at {} Hz",
                duration_s, config.scheduler.rate_hz
            ),
        }
        .into());
    }
    let trajectory = Trajectory::new(config.simulation.trajectory);
    let clock = SimClock::default();

    // --- Localization ---
    let (sink, feed) = pose_channel();
    let localization = if config.localization.enabled {
        if options.pacing == Pacing::AsFastAsPossible {
            warn!("Localization runs in real time; in fast mode its poses will mostly be stale.");
        }
        Some(LocalizationTask::spawn(
            &config.localization,
            trajectory,
            clock.clone(),
            sink,
            config.simulation.seed,
        )?)
    } else {
        None
    };
    let build_ctx = BuildContext {
        pose_feed: localization.is_some().then_some(feed),
    };

    // --- Estimation ---
    // The localization task is stopped whatever the estimation outcome.
    let estimation = run_estimation(config, options.pacing, duration_s, clock, build_ctx);
    let localization_poses = match localization {
        Some(task) => Some(task.stop()?),
        None => None,
    };
    let estimation = estimation?;

    let truth = trajectory.sample(estimation.final_report.timestamp);
    let summary = RunSummary {
        estimation,
        truth,
        localization_poses,
    };
    info!("Run complete.\n{}", summary);
    Ok(summary)
}

fn run_estimation(
    config: &HostConfig,
    pacing: Pacing,
    duration_s: f64,
    clock: SimClock,
    build_ctx: BuildContext,
) -> Result<EstimationSummary, SimError> {
    let registry = FilterRegistry::with_builtins();
    let chain = Chain::from_config(&config.estimation, &registry, &build_ctx)?;
    let sensors = SimulatedSensors::new(
        &config.simulation,
        &config.sensors,
        config.scheduler.rate_hz,
        clock,
    )?;
    let pipeline = Pipeline::start(chain, PipelineContext::new(Box::new(sensors)))?;

    let mut spec = TaskSpec::new("estimation", config.scheduler.rate_hz).with_pacing(pacing);
    if let Some(budget_us) = config.scheduler.budget_us {
        spec = spec.with_budget(Duration::from_micros(budget_us));
    }

    let cycles = config.cycles_for(duration_s);
    info!(
        "Running {} cycles ({:.1} s at {:.1} Hz).",
        cycles, duration_s, config.scheduler.rate_hz
    );
    let task = EstimationTask::spawn(pipeline, spec, Some(cycles), registry, build_ctx)?;
    task.join()
}
