// skyfuse_core/src/publish.rs

//! Single-writer, multi-reader hand-off of the finished estimate.
//!
//! The estimation task publishes once per cycle, after the pipeline has
//! stepped, so readers only ever observe a completely merged estimate.

use parking_lot::RwLock;
use std::sync::Arc;

use crate::state::StateEstimate;

/// A finished estimate stamped with the cycle that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublishedEstimate {
    pub cycle: u64,
    pub timestamp: f64,
    pub state: StateEstimate,
}

/// Creates the writer handle and a first reader.
pub fn estimate_channel() -> (EstimatePublisher, EstimateReader) {
    let slot = Arc::new(RwLock::new(None));
    (
        EstimatePublisher { slot: slot.clone() },
        EstimateReader { slot },
    )
}

/// Writer side, owned by the estimation task.
#[derive(Debug)]
pub struct EstimatePublisher {
    slot: Arc<RwLock<Option<PublishedEstimate>>>,
}

impl EstimatePublisher {
    pub fn publish(&self, state: &StateEstimate, cycle: u64, timestamp: f64) {
        *self.slot.write() = Some(PublishedEstimate {
            cycle,
            timestamp,
            state: *state,
        });
    }

    /// Another reader of this channel.
    pub fn reader(&self) -> EstimateReader {
        EstimateReader {
            slot: self.slot.clone(),
        }
    }
}

/// Reader side: controllers, telemetry, logging.
#[derive(Debug, Clone)]
pub struct EstimateReader {
    slot: Arc<RwLock<Option<PublishedEstimate>>>,
}

impl EstimateReader {
    /// The most recently published estimate, if any.
    pub fn latest(&self) -> Option<PublishedEstimate> {
        *self.slot.read()
    }
}
