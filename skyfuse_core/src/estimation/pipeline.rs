// skyfuse_core/src/estimation/pipeline.rs

use tracing::{debug, info, warn};

use crate::estimation::chain::{Chain, InitReport};
use crate::estimation::{FatalPipelineError, FilterContext, FilterRuntimeError};
use crate::messages::{SensorFrame, SensorSource};
use crate::publish::EstimatePublisher;
use crate::state::{StateEstimate, StateUpdate, UpdatedFields};

// =========================================================================
// == Cycle Status & Report ==
// =========================================================================

/// Aggregate outcome of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// Every active filter stepped successfully.
    Ok,
    /// At least one filter failed its step; the others were still merged.
    PartialFailure,
    /// No filter is functional; no cycle was executed.
    Fatal,
}

/// A filter that failed its step during a cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterFault {
    /// Position of the filter in the chain.
    pub order: usize,
    pub error: FilterRuntimeError,
}

/// Everything that happened during the last cycle.
///
/// Storage is sized to the chain when the pipeline is built, so filling the
/// report never allocates inside the cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Number of the cycle, starting at 1. Zero if no cycle has run yet.
    pub cycle: u64,
    pub timestamp: f64,
    pub status: CycleStatus,
    /// Union of every successful filter's contribution.
    pub updated: UpdatedFields,
    /// Number of filters whose step was invoked.
    pub invoked: usize,
    /// Tags committed by each filter, indexed by chain order.
    pub contributions: Vec<UpdatedFields>,
    pub faults: Vec<FilterFault>,
}

impl CycleReport {
    fn sized_for(chain_len: usize) -> Self {
        Self {
            cycle: 0,
            timestamp: 0.0,
            status: CycleStatus::Fatal,
            updated: UpdatedFields::EMPTY,
            invoked: 0,
            contributions: vec![UpdatedFields::EMPTY; chain_len],
            faults: Vec::with_capacity(chain_len),
        }
    }

    /// Resizes the per-filter storage for a new chain, keeping the summary of
    /// the last cycle.
    fn resize(&mut self, chain_len: usize) {
        self.contributions.clear();
        self.contributions.resize(chain_len, UpdatedFields::EMPTY);
        self.faults = Vec::with_capacity(chain_len);
    }

    fn reset(&mut self, cycle: u64, timestamp: f64) {
        self.cycle = cycle;
        self.timestamp = timestamp;
        self.status = CycleStatus::Ok;
        self.updated = UpdatedFields::EMPTY;
        self.invoked = 0;
        self.contributions.fill(UpdatedFields::EMPTY);
        self.faults.clear();
    }
}

// =========================================================================
// == Pipeline ==
// =========================================================================

/// Everything the pipeline needs from the surrounding application,
/// constructed once at startup.
pub struct PipelineContext {
    pub sensors: Box<dyn SensorSource>,
}

impl PipelineContext {
    pub fn new(sensors: Box<dyn SensorSource>) -> Self {
        Self { sensors }
    }
}

/// Runs the filter chain once per cycle and merges the filters' partial
/// updates into a single [`StateEstimate`].
///
/// The pipeline is synchronous and single-threaded. It is driven by an
/// external periodic task that calls [`Pipeline::step`] once per period and
/// publishes the state only after `step` has returned.
pub struct Pipeline {
    chain: Chain,
    sensors: Box<dyn SensorSource>,
    frame: SensorFrame,
    state: StateEstimate,
    // Scratch copy a filter writes into; committed only if its step succeeds.
    staging: StateEstimate,
    report: CycleReport,
    init_report: Option<InitReport>,
    // Set when the chain's one-shot init left no functional filter.
    init_error: Option<FatalPipelineError>,
    last_timestamp: Option<f64>,
    cycles: u64,
}

impl Pipeline {
    pub fn new(chain: Chain, ctx: PipelineContext) -> Self {
        let report = CycleReport::sized_for(chain.len());
        Self {
            chain,
            sensors: ctx.sensors,
            frame: SensorFrame::default(),
            state: StateEstimate::default(),
            staging: StateEstimate::default(),
            report,
            init_report: None,
            init_error: None,
            last_timestamp: None,
            cycles: 0,
        }
    }

    /// Builds the pipeline and initialises its chain, refusing to start if no
    /// filter ends up functional.
    pub fn start(chain: Chain, ctx: PipelineContext) -> Result<Self, FatalPipelineError> {
        let mut pipeline = Self::new(chain, ctx);
        pipeline.init()?;
        Ok(pipeline)
    }

    /// Calls `init` exactly once on every enabled filter.
    ///
    /// Calling it again returns the stored outcome, report or error, without
    /// touching the filters.
    pub fn init(&mut self) -> Result<&InitReport, FatalPipelineError> {
        if let Some(e) = &self.init_error {
            return Err(e.clone());
        }
        if self.init_report.is_none() {
            match self.chain.init() {
                Ok(report) => self.init_report = Some(report),
                Err(e) => {
                    self.init_error = Some(e.clone());
                    return Err(e);
                }
            }
        }
        // Just set above if it was missing.
        Ok(self.init_report.get_or_insert_with(InitReport::default))
    }

    /// Runs one cycle.
    ///
    /// Clears the freshness tags, steps every active filter in chain order,
    /// commits each successful filter's writes (later filters overwrite
    /// earlier ones) and returns the aggregate status. A failing filter is
    /// recorded in the [`CycleReport`] and skipped; it never aborts the cycle.
    pub fn step(&mut self) -> CycleStatus {
        if self.init_report.is_none() || self.chain.active_count() == 0 {
            self.report.status = CycleStatus::Fatal;
            return CycleStatus::Fatal;
        }

        self.frame.clear();
        self.sensors.sample(&mut self.frame);
        let timestamp = self.frame.timestamp;
        let dt = self
            .last_timestamp
            .map_or(0.0, |last| (timestamp - last).max(0.0));
        self.last_timestamp = Some(timestamp);

        self.cycles += 1;
        let previous_status = self.report.status;
        self.report.reset(self.cycles, timestamp);
        self.state.begin_cycle();

        let ctx = FilterContext {
            sensors: &self.frame,
            dt,
            cycle: self.cycles,
        };

        for descriptor in self.chain.descriptors_mut() {
            if !descriptor.is_active() {
                continue;
            }
            let order = descriptor.order();

            self.staging = self.state;
            let mut update = StateUpdate::new(&mut self.staging);
            let outcome = descriptor.filter_mut().step(&ctx, &mut update);
            let written = update.written();
            self.report.invoked += 1;

            match outcome {
                Ok(()) => {
                    self.state.commit(&self.staging, written);
                    self.report.contributions[order] = written;
                }
                Err(error) => {
                    debug!(
                        "Cycle {}: filter '{}' failed: {}",
                        self.cycles,
                        descriptor.name(),
                        error
                    );
                    self.report.faults.push(FilterFault { order, error });
                }
            }
        }

        self.report.updated = self.state.updated();
        self.report.status = if self.report.faults.is_empty() {
            CycleStatus::Ok
        } else {
            CycleStatus::PartialFailure
        };

        if self.cycles == 1 {
            info!("First estimation cycle: {:?}.", self.report.status);
        } else if self.report.status != previous_status {
            info!(
                "Estimation status changed from {:?} to {:?} at cycle {}.",
                previous_status, self.report.status, self.cycles
            );
        }

        self.report.status
    }

    /// Replaces the running chain with `chain` between two cycles.
    ///
    /// The new chain is initialised first; if none of its filters is
    /// functional the running chain is kept and the error returned. The state
    /// estimate itself carries over unchanged.
    pub fn rebuild(&mut self, mut chain: Chain) -> Result<&InitReport, FatalPipelineError> {
        let report = match chain.init() {
            Ok(report) => report,
            Err(e) => {
                warn!("Rejected new filter chain, keeping the running one: {}", e);
                return Err(e);
            }
        };

        info!(
            "Filter chain rebuilt with {} filters ({} active).",
            chain.len(),
            chain.active_count()
        );
        self.report.resize(chain.len());
        self.chain = chain;
        self.init_error = None;
        Ok(self.init_report.insert(report))
    }

    /// Hands the finished estimate of the last cycle to `publisher`.
    pub fn publish(&self, publisher: &EstimatePublisher) {
        publisher.publish(&self.state, self.report.cycle, self.report.timestamp);
    }

    pub fn state(&self) -> &StateEstimate {
        &self.state
    }

    pub fn last_report(&self) -> &CycleReport {
        &self.report
    }

    pub fn init_report(&self) -> Option<&InitReport> {
        self.init_report.as_ref()
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Number of cycles executed so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Name of the filter at `order` in the chain.
    pub fn filter_name(&self, order: usize) -> Option<&str> {
        self.chain.descriptors().get(order).map(|d| d.name())
    }
}
