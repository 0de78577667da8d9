// skyfuse_sim/src/localization.rs

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use skyfuse_core::localization::PoseSink;
use skyfuse_core::messages::ExternalPose;

use crate::config::LocalizationConfig;
use crate::error::SimError;
use crate::scheduler::{Periodic, PeriodicTask, TaskControl, TaskSpec};
use crate::sensors::{SimClock, VectorNoise};
use crate::trajectory::Trajectory;

/// Keeps the localization noise stream independent from the sensor one.
const SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Stand-in for an external localization system (motion capture, visual
/// odometry): samples the truth at its own rate, adds noise and publishes
/// the pose for the `ExternalPose` filter.
pub struct LocalizationTask {
    task: PeriodicTask<PoseProducer>,
}

impl LocalizationTask {
    pub fn spawn(
        config: &LocalizationConfig,
        trajectory: Trajectory,
        clock: SimClock,
        sink: PoseSink,
        seed: u64,
    ) -> Result<Self, SimError> {
        let producer = PoseProducer {
            trajectory,
            clock,
            sink,
            rng: ChaCha8Rng::seed_from_u64(seed ^ SEED_SALT),
            noise: VectorNoise::new("localization.noise", config.noise)?,
            publish_attitude: config.publish_attitude,
            published: 0,
        };
        let task = PeriodicTask::spawn(TaskSpec::new("localization", config.rate_hz), producer)?;
        info!("Localization task started at {:.1} Hz.", config.rate_hz);
        Ok(Self { task })
    }

    /// Stops the task and returns how many poses it published.
    pub fn stop(self) -> Result<u64, SimError> {
        let (producer, _) = self.task.stop()?;
        info!("Localization task stopped after {} poses.", producer.published);
        Ok(producer.published)
    }
}

struct PoseProducer {
    trajectory: Trajectory,
    clock: SimClock,
    sink: PoseSink,
    rng: ChaCha8Rng,
    noise: VectorNoise,
    publish_attitude: bool,
    published: u64,
}

impl Periodic for PoseProducer {
    fn run_once(&mut self) -> TaskControl {
        let t = self.clock.now();
        let truth = self.trajectory.sample(t);
        self.sink.publish(ExternalPose {
            timestamp: t,
            position: truth.position + self.noise.sample(&mut self.rng),
            attitude: self.publish_attitude.then_some(truth.attitude),
        });
        self.published += 1;
        TaskControl::Continue
    }
}
