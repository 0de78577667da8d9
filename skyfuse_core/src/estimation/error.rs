// skyfuse_core/src/estimation/error.rs

use thiserror::Error;

/// A filter's one-time setup failed. The filter is excluded from every
/// subsequent cycle; the rest of the chain is unaffected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterInitError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("required input `{0}` is not available")]
    Unavailable(&'static str),

    #[error("hardware initialisation failed: {0}")]
    Hardware(String),
}

/// A filter's per-cycle step failed. Its tags stay unset for this cycle and
/// the pipeline moves on to the next filter.
///
/// Variants only carry `Copy` data so that reporting a failure never
/// allocates inside the real-time cycle.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum FilterRuntimeError {
    #[error("no `{0}` sample available this cycle")]
    MissingInput(&'static str),

    #[error("`{input}` sample rejected: {reason}")]
    InvalidInput {
        input: &'static str,
        reason: &'static str,
    },

    #[error("GPS has no usable fix ({satellites} satellites)")]
    NoFix { satellites: u8 },

    #[error("input is stale ({age_s:.3} s old)")]
    Stale { age_s: f64 },
}

/// The pipeline cannot run at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FatalPipelineError {
    #[error("the filter chain has no enabled filters")]
    NoEnabledFilters,

    #[error("none of the {attempted} enabled filters initialised successfully")]
    NoFunctionalFilters { attempted: usize },
}

/// Building a chain from configuration failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChainError {
    #[error("no filter factory registered for kind `{0}`")]
    UnknownKind(String),

    #[error("filter name `{0}` is used more than once")]
    DuplicateName(String),

    #[error("filter `{filter}` has an invalid parameter: {reason}")]
    InvalidParameter { filter: String, reason: String },

    #[error(transparent)]
    Fatal(#[from] FatalPipelineError),
}
