// skyfuse_core/src/estimation/mod.rs

use crate::localization::PoseFeed;
use crate::messages::SensorFrame;
use crate::state::StateUpdate;

/// Provides the per-cycle inputs a filter may read during its `step`.
/// This struct is created by the pipeline at the start of every cycle.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    /// The sensor samples collected for this cycle.
    pub sensors: &'a SensorFrame,
    /// Seconds elapsed since the previous cycle (0.0 on the first one).
    pub dt: f64,
    /// Number of the current cycle, starting at 1.
    pub cycle: u64,
}

/// Shared handles handed to filter factories when a chain is built.
///
/// This replaces any process-wide state: whatever a filter needs from the
/// surrounding application is passed in here explicitly.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    /// Latest-pose feed of the external localization task, if it is running.
    pub pose_feed: Option<PoseFeed>,
}

/// The contract for any stage of the state-estimation chain.
///
/// Both operations execute inside the hard real-time cycle of the flight
/// controller: implementations must not block, perform I/O, or do unbounded
/// work.
pub trait Filter: Send {
    /// A short, static identifier of the algorithm (e.g. `"Stationary"`).
    fn kind(&self) -> &'static str;

    /// One-time setup, called exactly once before the first cycle.
    /// On error the filter is marked non-functional and never stepped.
    fn init(&mut self) -> Result<(), FilterInitError>;

    /// Runs the filter for one cycle.
    ///
    /// The filter writes only the fields it owns through `state`; the setters
    /// record the matching tags. On error everything written during this call
    /// is discarded, so the previous values survive and their tags stay unset.
    fn step(
        &mut self,
        ctx: &FilterContext,
        state: &mut StateUpdate,
    ) -> Result<(), FilterRuntimeError>;
}

pub mod chain;
pub mod error;
pub mod filters;
pub mod pipeline;
pub mod registry;

pub use chain::{Chain, ChainBuilder, FilterDescriptor, FilterHealth, InitOutcome, InitReport};
pub use error::{ChainError, FatalPipelineError, FilterInitError, FilterRuntimeError};
pub use pipeline::{CycleReport, CycleStatus, FilterFault, Pipeline, PipelineContext};
pub use registry::{FilterFactory, FilterRegistry};
