// skyfuse_core/src/estimation/filters/external_pose.rs

use crate::estimation::{Filter, FilterContext, FilterInitError, FilterRuntimeError};
use crate::localization::PoseFeed;
use crate::state::StateUpdate;

/// Plugs an independent localization task into the chain.
///
/// The task keeps its own thread and rate; this filter only picks up the newest
/// pose it published and writes it like any other filter would.
///
/// Each pose is written once, on the first cycle that sees it. Cycles in
/// between write nothing, so Position and Attitude are only tagged when a new
/// pose arrived. A pose dated slightly after the cycle's sensor timestamp was
/// published between sampling and stepping and is accepted; one more than
/// `max_age_s` in the future is rejected.
#[derive(Debug, Clone)]
pub struct ExternalPoseFilter {
    feed: Option<PoseFeed>,
    max_age_s: f64,
    last_written: Option<f64>,
}

impl ExternalPoseFilter {
    pub fn new(feed: Option<PoseFeed>, max_age_s: f64) -> Self {
        Self {
            feed,
            max_age_s,
            last_written: None,
        }
    }
}

impl Filter for ExternalPoseFilter {
    fn kind(&self) -> &'static str {
        "ExternalPose"
    }

    fn init(&mut self) -> Result<(), FilterInitError> {
        if self.feed.is_none() {
            return Err(FilterInitError::Unavailable("localization pose feed"));
        }
        if !(self.max_age_s.is_finite() && self.max_age_s > 0.0) {
            return Err(FilterInitError::InvalidParameter {
                name: "max_age_s",
                reason: format!("must be a positive number of seconds, got {}", self.max_age_s),
            });
        }
        Ok(())
    }

    fn step(
        &mut self,
        ctx: &FilterContext,
        state: &mut StateUpdate,
    ) -> Result<(), FilterRuntimeError> {
        let feed = self
            .feed
            .as_mut()
            .ok_or(FilterRuntimeError::MissingInput("localization pose feed"))?;

        let Some(pose) = feed.latest() else {
            // The localization task has not produced anything yet.
            return Ok(());
        };

        let age_s = ctx.sensors.timestamp - pose.timestamp;
        if age_s > self.max_age_s {
            return Err(FilterRuntimeError::Stale { age_s });
        }
        if age_s < -self.max_age_s {
            return Err(FilterRuntimeError::InvalidInput {
                input: "external pose",
                reason: "timestamp lies in the future",
            });
        }
        if self.last_written.is_some_and(|t| pose.timestamp <= t) {
            return Ok(());
        }

        self.last_written = Some(pose.timestamp);
        state.set_position(pose.position);
        if let Some(attitude) = pose.attitude {
            state.set_attitude(attitude);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::localization::pose_channel;
    use crate::messages::{ExternalPose, SensorFrame};
    use crate::state::{StateEstimate, StateField, UpdatedFields};
    use nalgebra::{UnitQuaternion, Vector3};

    fn run_at(
        filter: &mut ExternalPoseFilter,
        timestamp: f64,
    ) -> (Result<(), FilterRuntimeError>, UpdatedFields, StateEstimate) {
        let frame = SensorFrame {
            timestamp,
            ..Default::default()
        };
        let ctx = FilterContext {
            sensors: &frame,
            dt: 0.01,
            cycle: 1,
        };
        let mut state = StateEstimate::default();
        let mut update = StateUpdate::new(&mut state);
        let result = filter.step(&ctx, &mut update);
        let written = update.written();
        (result, written, state)
    }

    #[test]
    fn writes_fresh_pose() {
        let (sink, feed) = pose_channel();
        let mut filter = ExternalPoseFilter::new(Some(feed), 0.5);
        filter.init().unwrap();

        let attitude = UnitQuaternion::from_euler_angles(0.0, 0.0, 1.0);
        sink.publish(ExternalPose {
            timestamp: 10.0,
            position: Vector3::new(1.0, 2.0, -3.0),
            attitude: Some(attitude),
        });

        let (result, written, state) = run_at(&mut filter, 10.2);
        assert!(result.is_ok());
        assert!(written.contains(StateField::Position));
        assert!(written.contains(StateField::Attitude));
        assert!(!written.contains(StateField::Velocity));
        assert_eq!(state.position, Vector3::new(1.0, 2.0, -3.0));
        assert_eq!(state.attitude, attitude);
    }

    #[test]
    fn position_only_pose_leaves_attitude_alone() {
        let (sink, feed) = pose_channel();
        let mut filter = ExternalPoseFilter::new(Some(feed), 0.5);
        filter.init().unwrap();
        sink.publish(ExternalPose {
            timestamp: 0.0,
            position: Vector3::new(4.0, 0.0, 0.0),
            attitude: None,
        });

        let (_, written, _) = run_at(&mut filter, 0.1);
        assert_eq!(
            written,
            [StateField::Position].into_iter().collect::<UpdatedFields>()
        );
    }

    #[test]
    fn stale_pose_is_rejected() {
        let (sink, feed) = pose_channel();
        let mut filter = ExternalPoseFilter::new(Some(feed), 0.5);
        filter.init().unwrap();
        sink.publish(ExternalPose {
            timestamp: 1.0,
            position: Vector3::zeros(),
            attitude: None,
        });

        let (result, written, _) = run_at(&mut filter, 2.0);
        assert!(matches!(result, Err(FilterRuntimeError::Stale { .. })));
        assert!(written.is_empty());
    }

    #[test]
    fn each_pose_is_written_once() {
        let (sink, feed) = pose_channel();
        let mut filter = ExternalPoseFilter::new(Some(feed), 0.5);
        filter.init().unwrap();
        sink.publish(ExternalPose {
            timestamp: 1.0,
            position: Vector3::new(1.0, 0.0, 0.0),
            attitude: None,
        });

        let (_, first, _) = run_at(&mut filter, 1.005);
        assert!(first.contains(StateField::Position));

        // Same pose on the next cycle: still within max_age_s, but not new.
        let (result, second, _) = run_at(&mut filter, 1.010);
        assert!(result.is_ok());
        assert!(second.is_empty());

        sink.publish(ExternalPose {
            timestamp: 1.033,
            position: Vector3::new(2.0, 0.0, 0.0),
            attitude: None,
        });
        let (_, third, state) = run_at(&mut filter, 1.035);
        assert!(third.contains(StateField::Position));
        assert_eq!(state.position, Vector3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn future_dated_pose() {
        let (sink, feed) = pose_channel();
        let mut filter = ExternalPoseFilter::new(Some(feed), 0.5);
        filter.init().unwrap();

        // Published between sampling and stepping.
        sink.publish(ExternalPose {
            timestamp: 2.01,
            position: Vector3::zeros(),
            attitude: None,
        });
        let (result, written, _) = run_at(&mut filter, 2.0);
        assert!(result.is_ok());
        assert!(written.contains(StateField::Position));

        sink.publish(ExternalPose {
            timestamp: 9.0,
            position: Vector3::zeros(),
            attitude: None,
        });
        let (result, written, _) = run_at(&mut filter, 2.1);
        assert!(matches!(result, Err(FilterRuntimeError::InvalidInput { .. })));
        assert!(written.is_empty());
    }

    #[test]
    fn nothing_published_yet_writes_nothing() {
        let (_sink, feed) = pose_channel();
        let mut filter = ExternalPoseFilter::new(Some(feed), 0.5);
        filter.init().unwrap();

        let (result, written, _) = run_at(&mut filter, 0.0);
        assert!(result.is_ok());
        assert!(written.is_empty());
    }

    #[test]
    fn missing_feed_fails_init() {
        let mut filter = ExternalPoseFilter::new(None, 0.5);
        assert_eq!(
            filter.init(),
            Err(FilterInitError::Unavailable("localization pose feed"))
        );
    }
}
