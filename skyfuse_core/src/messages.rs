// skyfuse_core/src/messages.rs

use nalgebra::{UnitQuaternion, Vector3};

// =========================================================================
// == Sensor Samples ==
// =========================================================================

/// One inertial sample in the body (FRD) frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuSample {
    /// Angular rate (rad/s).
    pub gyro: Vector3<f64>,
    /// Specific force (m/s^2). Reads roughly (0, 0, -9.81) when level and at rest.
    pub accel: Vector3<f64>,
}

/// One barometer sample, already converted to pressure altitude.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaroSample {
    /// Pressure altitude (meters).
    pub altitude: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GpsFix {
    NoFix,
    Fix2D,
    Fix3D,
}

/// One GPS receiver solution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsSample {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    /// Altitude above mean sea level (meters).
    pub altitude_m: f64,
    /// Velocity in the NED frame (m/s).
    pub velocity_ned: Vector3<f64>,
    pub satellites: u8,
    pub fix: GpsFix,
}

/// Everything the sensor layer delivered for one cycle.
///
/// The pipeline owns a single frame and reuses it every cycle; a `None`
/// field means the sensor produced nothing new since the previous cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorFrame {
    /// Time of the cycle (seconds, monotonic).
    pub timestamp: f64,
    pub imu: Option<ImuSample>,
    pub baro: Option<BaroSample>,
    pub gps: Option<GpsSample>,
}

impl SensorFrame {
    /// Drops every sample but keeps the timestamp.
    pub fn clear(&mut self) {
        self.imu = None;
        self.baro = None;
        self.gps = None;
    }
}

/// The contract for whatever feeds raw sensor data into the pipeline.
/// Hardware drivers implement it on the vehicle, the simulator implements it
/// in `skyfuse_sim`.
pub trait SensorSource: Send {
    /// Fills `frame` with the samples available for this cycle.
    /// Called once per cycle from the real-time task, so it must not block.
    fn sample(&mut self, frame: &mut SensorFrame);
}

/// A source that only advances time. Useful when every configured filter
/// is self-contained, e.g. a stationary-only chain.
#[derive(Debug, Clone)]
pub struct ClockOnlySource {
    period: f64,
    now: f64,
}

impl ClockOnlySource {
    pub fn new(rate_hz: f64) -> Self {
        Self {
            period: if rate_hz > 0.0 { 1.0 / rate_hz } else { 0.0 },
            now: 0.0,
        }
    }
}

impl SensorSource for ClockOnlySource {
    fn sample(&mut self, frame: &mut SensorFrame) {
        frame.timestamp = self.now;
        self.now += self.period;
    }
}

// =========================================================================
// == Localization Messages ==
// =========================================================================

/// A pose produced by an external localization task (vision, SLAM, ...).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExternalPose {
    /// Time the pose refers to (seconds, same clock as [`SensorFrame`]).
    pub timestamp: f64,
    /// Position in the local NED frame (meters).
    pub position: Vector3<f64>,
    /// Body -> NED rotation, if the localization source estimates it.
    pub attitude: Option<UnitQuaternion<f64>>,
}
