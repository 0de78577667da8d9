// skyfuse_core/src/localization/mod.rs

//! Hand-off between an independent localization task (vision, SLAM, motion
//! capture, ...) and the estimation chain.
//!
//! The producer runs in its own execution context at its own rate and writes
//! into a single "latest pose" slot. The consumer side is polled from inside
//! the real-time cycle, so it never waits: if the producer happens to hold the
//! slot at that instant, the consumer keeps the pose it saw last time.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::messages::ExternalPose;

/// Creates a connected producer/consumer pair.
pub fn pose_channel() -> (PoseSink, PoseFeed) {
    let slot = Arc::new(Mutex::new(None));
    (
        PoseSink { slot: slot.clone() },
        PoseFeed { slot, cached: None },
    )
}

/// Producer side, owned by the localization task.
#[derive(Debug, Clone)]
pub struct PoseSink {
    slot: Arc<Mutex<Option<ExternalPose>>>,
}

impl PoseSink {
    /// Replaces the latest pose. Older, unread poses are dropped.
    pub fn publish(&self, pose: ExternalPose) {
        *self.slot.lock() = Some(pose);
    }
}

/// Consumer side, owned by a filter.
#[derive(Debug, Clone)]
pub struct PoseFeed {
    slot: Arc<Mutex<Option<ExternalPose>>>,
    cached: Option<ExternalPose>,
}

impl PoseFeed {
    /// The newest pose seen so far, without blocking.
    pub fn latest(&mut self) -> Option<ExternalPose> {
        if let Some(slot) = self.slot.try_lock() {
            if let Some(pose) = *slot {
                self.cached = Some(pose);
            }
        }
        self.cached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn pose(timestamp: f64) -> ExternalPose {
        ExternalPose {
            timestamp,
            position: Vector3::new(timestamp, 0.0, 0.0),
            attitude: None,
        }
    }

    #[test]
    fn empty_until_first_publish() {
        let (sink, mut feed) = pose_channel();
        assert_eq!(feed.latest(), None);
        sink.publish(pose(1.0));
        assert_eq!(feed.latest(), Some(pose(1.0)));
    }

    #[test]
    fn keeps_only_the_newest_pose() {
        let (sink, mut feed) = pose_channel();
        sink.publish(pose(1.0));
        sink.publish(pose(2.0));
        assert_eq!(feed.latest().map(|p| p.timestamp), Some(2.0));
    }

    #[test]
    fn contended_slot_returns_cached_pose() {
        let (sink, mut feed) = pose_channel();
        sink.publish(pose(1.0));
        assert!(feed.latest().is_some());

        let _guard = sink.slot.lock();
        assert_eq!(feed.latest(), Some(pose(1.0)));
    }

    #[test]
    fn feeds_are_independent_consumers() {
        let (sink, feed) = pose_channel();
        let mut a = feed.clone();
        let mut b = feed;
        sink.publish(pose(3.0));
        assert_eq!(a.latest(), b.latest());
    }
}
