// skyfuse_sim/src/runtime.rs

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use tracing::{info, warn};

use skyfuse_core::config::ChainConfig;
use skyfuse_core::estimation::{
    BuildContext, Chain, CycleReport, CycleStatus, FilterRegistry, Pipeline,
};
use skyfuse_core::publish::{estimate_channel, EstimatePublisher, EstimateReader};
use skyfuse_core::state::StateEstimate;

use crate::error::SimError;
use crate::scheduler::{Periodic, PeriodicTask, TaskControl, TaskSpec, TaskStats};

// =========================================================================
// == Commands ==
// =========================================================================

/// Change notifications for a running estimation task. They are applied
/// between two cycles, never during one.
#[derive(Debug, Clone)]
pub enum PipelineCommand {
    /// Build a new chain from this configuration and swap it in. If no filter
    /// of the new chain initialises, the running chain is kept.
    Reconfigure(ChainConfig),
    Stop,
}

/// Number of cycles that ended with each status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTally {
    pub ok: u64,
    pub partial_failure: u64,
    pub fatal: u64,
}

impl StatusTally {
    fn record(&mut self, status: CycleStatus) {
        match status {
            CycleStatus::Ok => self.ok += 1,
            CycleStatus::PartialFailure => self.partial_failure += 1,
            CycleStatus::Fatal => self.fatal += 1,
        }
    }
}

/// What the estimation task hands back when it ends.
#[derive(Debug, Clone)]
pub struct EstimationSummary {
    pub cycles: u64,
    pub tally: StatusTally,
    pub reconfigurations: u64,
    pub final_state: StateEstimate,
    pub final_report: CycleReport,
    pub stats: TaskStats,
}

// =========================================================================
// == Estimation Task ==
// =========================================================================

/// Owns the pipeline on a dedicated periodic thread: applies pending
/// commands, steps the pipeline, then publishes the finished estimate.
pub struct EstimationTask {
    task: PeriodicTask<EstimationLoop>,
    commands: Sender<PipelineCommand>,
    reader: EstimateReader,
}

impl EstimationTask {
    /// `max_cycles` ends the task on its own after that many cycles.
    pub fn spawn(
        pipeline: Pipeline,
        spec: TaskSpec,
        max_cycles: Option<u64>,
        registry: FilterRegistry,
        build_ctx: BuildContext,
    ) -> Result<Self, SimError> {
        let (commands, inbox) = mpsc::channel();
        let (publisher, reader) = estimate_channel();
        let body = EstimationLoop {
            pipeline,
            publisher,
            inbox,
            registry,
            build_ctx,
            max_cycles,
            tally: StatusTally::default(),
            reconfigurations: 0,
        };

        info!(
            "Starting estimation task '{}' at {:.1} Hz.",
            spec.name, spec.rate_hz
        );
        let task = PeriodicTask::spawn(spec, body)?;
        Ok(Self {
            task,
            commands,
            reader,
        })
    }

    /// A reader of the estimates this task publishes.
    pub fn reader(&self) -> EstimateReader {
        self.reader.clone()
    }

    /// A handle other threads can use to send commands.
    pub fn commands(&self) -> Sender<PipelineCommand> {
        self.commands.clone()
    }

    pub fn reconfigure(&self, config: ChainConfig) -> Result<(), SimError> {
        self.commands
            .send(PipelineCommand::Reconfigure(config))
            .map_err(|_| SimError::TaskGone)
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the task after its current cycle.
    pub fn stop(self) -> Result<EstimationSummary, SimError> {
        // The task may already have ended on its own; that is fine.
        let _ = self.commands.send(PipelineCommand::Stop);
        let (body, stats) = self.task.stop()?;
        Ok(body.into_summary(stats))
    }

    /// Waits for the task to reach `max_cycles`.
    pub fn join(self) -> Result<EstimationSummary, SimError> {
        let (body, stats) = self.task.join()?;
        Ok(body.into_summary(stats))
    }
}

struct EstimationLoop {
    pipeline: Pipeline,
    publisher: EstimatePublisher,
    inbox: Receiver<PipelineCommand>,
    registry: FilterRegistry,
    build_ctx: BuildContext,
    max_cycles: Option<u64>,
    tally: StatusTally,
    reconfigurations: u64,
}

impl EstimationLoop {
    fn reconfigure(&mut self, config: &ChainConfig) {
        let chain = match Chain::from_config(config, &self.registry, &self.build_ctx) {
            Ok(chain) => chain,
            Err(e) => {
                warn!("Ignoring reconfiguration: {}", e);
                return;
            }
        };
        let cycle = self.pipeline.cycles();
        // A rejected chain is logged by the pipeline and the running one stays.
        if let Ok(report) = self.pipeline.rebuild(chain) {
            self.reconfigurations += 1;
            info!(
                "Reconfigured at cycle {}: {}/{} filters functional.",
                cycle,
                report.functional_count(),
                report.outcomes.len()
            );
        }
    }

    fn into_summary(self, stats: TaskStats) -> EstimationSummary {
        EstimationSummary {
            cycles: self.pipeline.cycles(),
            tally: self.tally,
            reconfigurations: self.reconfigurations,
            final_state: *self.pipeline.state(),
            final_report: self.pipeline.last_report().clone(),
            stats,
        }
    }
}

impl Periodic for EstimationLoop {
    fn run_once(&mut self) -> TaskControl {
        loop {
            match self.inbox.try_recv() {
                Ok(PipelineCommand::Reconfigure(config)) => self.reconfigure(&config),
                Ok(PipelineCommand::Stop) => return TaskControl::Stop,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        let status = self.pipeline.step();
        self.tally.record(status);
        if status != CycleStatus::Fatal {
            self.pipeline.publish(&self.publisher);
        }

        match self.max_cycles {
            Some(max) if self.pipeline.cycles() >= max => TaskControl::Stop,
            _ => TaskControl::Continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Pacing;
    use skyfuse_core::config::{FilterEntry, FilterKind};
    use skyfuse_core::estimation::filters::StationaryFilter;
    use skyfuse_core::estimation::PipelineContext;
    use skyfuse_core::messages::ClockOnlySource;
    use skyfuse_core::state::StateField;
    use std::thread;
    use std::time::Duration;

    fn stationary_pipeline() -> Pipeline {
        let chain = Chain::builder()
            .filter("stationary", Box::new(StationaryFilter))
            .build()
            .unwrap();
        let ctx = PipelineContext::new(Box::new(ClockOnlySource::new(100.0)));
        Pipeline::start(chain, ctx).unwrap()
    }

    #[test]
    fn runs_the_requested_cycles_and_publishes() {
        let spec = TaskSpec::new("est", 100.0).with_pacing(Pacing::AsFastAsPossible);
        let task = EstimationTask::spawn(
            stationary_pipeline(),
            spec,
            Some(25),
            FilterRegistry::with_builtins(),
            BuildContext::default(),
        )
        .unwrap();
        let reader = task.reader();

        let summary = task.join().unwrap();
        assert_eq!(summary.cycles, 25);
        assert_eq!(summary.tally.ok, 25);
        assert_eq!(summary.stats.execution_count, 25);

        let published = reader.latest().unwrap();
        assert_eq!(published.cycle, 25);
        assert!(published.state.is_fresh(StateField::Position));
    }

    #[test]
    fn reconfigure_swaps_chain_between_cycles() {
        let spec = TaskSpec::new("est", 200.0);
        let task = EstimationTask::spawn(
            stationary_pipeline(),
            spec,
            None,
            FilterRegistry::with_builtins(),
            BuildContext::default(),
        )
        .unwrap();

        let attitude_only = ChainConfig {
            filters: vec![FilterEntry::new(FilterKind::Complementary {
                accel_gain: 0.5,
                bias_gain: 0.01,
            })],
        };
        task.reconfigure(attitude_only).unwrap();
        thread::sleep(Duration::from_millis(50));

        let summary = task.stop().unwrap();
        assert_eq!(summary.reconfigurations, 1);
        // No IMU in a clock-only source: every cycle after the swap fails softly.
        assert!(summary.tally.partial_failure > 0);
        assert_eq!(summary.final_report.status, CycleStatus::PartialFailure);
        assert!(summary.final_state.updated().is_empty());
    }

    #[test]
    fn dead_reconfiguration_keeps_running_chain() {
        let spec = TaskSpec::new("est", 200.0);
        let task = EstimationTask::spawn(
            stationary_pipeline(),
            spec,
            None,
            FilterRegistry::with_builtins(),
            BuildContext::default(),
        )
        .unwrap();

        // No pose feed in the build context, so this filter cannot initialise.
        let dead = ChainConfig {
            filters: vec![FilterEntry::new(FilterKind::ExternalPose { max_age_s: 0.5 })],
        };
        task.reconfigure(dead).unwrap();
        thread::sleep(Duration::from_millis(30));

        let summary = task.stop().unwrap();
        assert_eq!(summary.reconfigurations, 0);
        assert_eq!(summary.tally.partial_failure, 0);
        assert!(summary.final_state.is_fresh(StateField::Position));
    }
}
