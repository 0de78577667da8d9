// skyfuse_core/src/prelude.rs

// --- Core Abstractions ---
pub use crate::estimation::{Filter, FilterContext};
pub use crate::messages::SensorSource;

// --- Core Data Structures ---
pub use crate::messages::{
    BaroSample, ExternalPose, GpsFix, GpsSample, ImuSample, SensorFrame,
};
pub use crate::state::{StateEstimate, StateField, StateUpdate, UpdatedFields};

// --- Chain & Pipeline ---
pub use crate::config::{ChainConfig, FilterEntry, FilterKind};
pub use crate::estimation::{
    BuildContext, Chain, CycleReport, CycleStatus, FilterRegistry, InitReport, Pipeline,
    PipelineContext,
};

// --- Errors ---
pub use crate::estimation::{ChainError, FatalPipelineError, FilterInitError, FilterRuntimeError};

// --- Built-in Filters ---
pub use crate::estimation::filters::{
    BaroFilter, ComplementaryFilter, ExternalPoseFilter, GpsFilter, StationaryFilter,
};

// --- Hand-off Channels ---
pub use crate::frames::GeoPoint;
pub use crate::localization::{pose_channel, PoseFeed, PoseSink};
pub use crate::publish::{estimate_channel, EstimatePublisher, EstimateReader, PublishedEstimate};
