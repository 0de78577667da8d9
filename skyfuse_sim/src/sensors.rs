// skyfuse_sim/src/sensors.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nalgebra::Vector3;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use skyfuse_core::frames::GeoPoint;
use skyfuse_core::messages::{BaroSample, GpsFix, GpsSample, ImuSample, SensorFrame, SensorSource};

use crate::config::{SensorsConfig, SimulationConfig};
use crate::error::SimError;
use crate::trajectory::Trajectory;

// =========================================================================
// == Simulation Clock ==
// =========================================================================

/// Simulated time shared between tasks. Written by the sensor source of the
/// estimation task, read by everyone else.
#[derive(Debug, Clone, Default)]
pub struct SimClock(Arc<AtomicU64>);

impl SimClock {
    pub fn now(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Acquire))
    }

    fn set(&self, t: f64) {
        self.0.store(t.to_bits(), Ordering::Release);
    }
}

// =========================================================================
// == Noise Models ==
// =========================================================================

/// Isotropic zero-mean Gaussian noise on a 3-vector.
#[derive(Debug, Clone, Copy)]
pub struct VectorNoise(Normal<f64>);

impl VectorNoise {
    pub fn new(name: &'static str, std_dev: f64) -> Result<Self, SimError> {
        Normal::new(0.0, std_dev)
            .map(VectorNoise)
            .map_err(|e| SimError::SensorModel {
                name,
                reason: e.to_string(),
            })
    }

    pub fn sample(&self, rng: &mut ChaCha8Rng) -> Vector3<f64> {
        Vector3::new(
            self.0.sample(rng),
            self.0.sample(rng),
            self.0.sample(rng),
        )
    }

    pub fn scalar(&self, rng: &mut ChaCha8Rng) -> f64 {
        self.0.sample(rng)
    }
}

/// Cycles between two samples of a sensor running at `sensor_hz`, or `None`
/// if it is disabled.
fn divider(base_hz: f64, sensor_hz: f64) -> Option<u64> {
    (sensor_hz > 0.0).then(|| (base_hz / sensor_hz).round().max(1.0) as u64)
}

// =========================================================================
// == Simulated Sensors ==
// =========================================================================

/// Produces IMU, barometer and GPS samples from the ground-truth trajectory.
///
/// Time advances by exactly one period per call, so a run is reproducible
/// for a given seed regardless of how fast the host executes it.
pub struct SimulatedSensors {
    trajectory: Trajectory,
    home: GeoPoint,
    clock: SimClock,
    rng: ChaCha8Rng,
    period: f64,
    tick: u64,

    gyro_bias: Vector3<f64>,
    gyro_noise: VectorNoise,
    accel_noise: VectorNoise,

    baro_every: Option<u64>,
    baro_noise: VectorNoise,

    gps_every: Option<u64>,
    gps_position_noise: VectorNoise,
    gps_velocity_noise: VectorNoise,
    gps_satellites: u8,
}

impl SimulatedSensors {
    pub fn new(
        simulation: &SimulationConfig,
        sensors: &SensorsConfig,
        rate_hz: f64,
        clock: SimClock,
    ) -> Result<Self, SimError> {
        Ok(Self {
            trajectory: Trajectory::new(simulation.trajectory),
            home: simulation.home,
            clock,
            rng: ChaCha8Rng::seed_from_u64(simulation.seed),
            period: 1.0 / rate_hz,
            tick: 0,
            gyro_bias: Vector3::from(sensors.gyro_bias),
            gyro_noise: VectorNoise::new("gyro_noise_std", sensors.gyro_noise_std)?,
            accel_noise: VectorNoise::new("accel_noise_std", sensors.accel_noise_std)?,
            baro_every: divider(rate_hz, sensors.baro_rate_hz),
            baro_noise: VectorNoise::new("baro_noise_std", sensors.baro_noise_std)?,
            gps_every: divider(rate_hz, sensors.gps_rate_hz),
            gps_position_noise: VectorNoise::new(
                "gps_position_noise_std",
                sensors.gps_position_noise_std,
            )?,
            gps_velocity_noise: VectorNoise::new(
                "gps_velocity_noise_std",
                sensors.gps_velocity_noise_std,
            )?,
            gps_satellites: sensors.gps_satellites,
        })
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    fn due(every: Option<u64>, tick: u64) -> bool {
        every.is_some_and(|n| tick % n == 0)
    }
}

impl SensorSource for SimulatedSensors {
    fn sample(&mut self, frame: &mut SensorFrame) {
        let t = self.tick as f64 * self.period;
        let truth = self.trajectory.sample(t);

        frame.timestamp = t;
        frame.imu = Some(ImuSample {
            gyro: truth.angular_rate + self.gyro_bias + self.gyro_noise.sample(&mut self.rng),
            accel: truth.specific_force() + self.accel_noise.sample(&mut self.rng),
        });

        if Self::due(self.baro_every, self.tick) {
            frame.baro = Some(BaroSample {
                altitude: self.home.altitude_m
                    + truth.height()
                    + self.baro_noise.scalar(&mut self.rng),
            });
        }

        if Self::due(self.gps_every, self.tick) {
            let position = truth.position + self.gps_position_noise.sample(&mut self.rng);
            let point = self.home.offset_by_ned(&position);
            frame.gps = Some(GpsSample {
                latitude_deg: point.latitude_deg,
                longitude_deg: point.longitude_deg,
                altitude_m: point.altitude_m,
                velocity_ned: truth.velocity + self.gps_velocity_noise.sample(&mut self.rng),
                satellites: self.gps_satellites,
                fix: GpsFix::Fix3D,
            });
        }

        self.clock.set(t);
        self.tick += 1;
    }
}
