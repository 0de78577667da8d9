// skyfuse_core/src/lib.rs

//! Pure state-estimation core: the filter contract, the configurable filter
//! chain and the pipeline that merges every filter's partial update into one
//! [`state::StateEstimate`] per cycle. Nothing in here spawns threads or
//! touches the clock; the host application drives it.

pub mod config;
pub mod estimation;
pub mod frames;
pub mod localization;
pub mod messages;
pub mod prelude;
pub mod publish;
pub mod state;
