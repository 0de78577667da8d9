// skyfuse_sim/src/prelude.rs

// Re-export the entire skyfuse_core prelude so you can easily access
// pure types like `Filter`, `Pipeline`, `StateEstimate`, etc.
pub use skyfuse_core::prelude::*;

// Re-export common host types.
pub use crate::config::{load_config, parse_config, HostConfig};
pub use crate::error::{ConfigError, SimError};
pub use crate::runtime::{EstimationSummary, EstimationTask, PipelineCommand};
pub use crate::scheduler::{Pacing, PeriodicTask, TaskSpec, TaskStats};
pub use crate::{run, RunOptions, RunSummary};
