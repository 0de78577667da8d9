// skyfuse_core/src/estimation/filters/complementary.rs

use nalgebra::{UnitQuaternion, Vector3};

use crate::estimation::{Filter, FilterContext, FilterInitError, FilterRuntimeError};
use crate::messages::ImuSample;
use crate::state::StateUpdate;

/// Below this specific force (m/s^2) the accelerometer carries no usable
/// gravity direction (free fall) and the tilt correction is skipped.
const MIN_ACCEL_NORM: f64 = 1.0;

/// Attitude estimate that integrates the gyro and pulls roll and pitch
/// towards the gravity direction measured by the accelerometer.
///
/// The correction is a proportional term (`accel_gain`) on the angle between
/// the measured and the predicted gravity direction, plus an integral term
/// (`bias_gain`) that slowly learns the gyro bias. Yaw is not observable from
/// gravity and is only propagated.
#[derive(Debug, Clone)]
pub struct ComplementaryFilter {
    accel_gain: f64,
    bias_gain: f64,
    attitude: UnitQuaternion<f64>,
    gyro_bias: Vector3<f64>,
    aligned: bool,
}

impl ComplementaryFilter {
    pub fn new(accel_gain: f64, bias_gain: f64) -> Self {
        Self {
            accel_gain,
            bias_gain,
            attitude: UnitQuaternion::identity(),
            gyro_bias: Vector3::zeros(),
            aligned: false,
        }
    }

    pub fn gyro_bias(&self) -> &Vector3<f64> {
        &self.gyro_bias
    }

    /// Roll and pitch from a static accelerometer reading, zero yaw.
    fn level_from_accel(accel: &Vector3<f64>) -> UnitQuaternion<f64> {
        let roll = (-accel.y).atan2(-accel.z);
        let pitch = accel.x.atan2((accel.y * accel.y + accel.z * accel.z).sqrt());
        UnitQuaternion::from_euler_angles(roll, pitch, 0.0)
    }

    fn validate(imu: &ImuSample) -> Result<(), FilterRuntimeError> {
        if imu.gyro.iter().chain(imu.accel.iter()).all(|v| v.is_finite()) {
            Ok(())
        } else {
            Err(FilterRuntimeError::InvalidInput {
                input: "imu",
                reason: "non-finite sample",
            })
        }
    }
}

impl Filter for ComplementaryFilter {
    fn kind(&self) -> &'static str {
        "Complementary"
    }

    fn init(&mut self) -> Result<(), FilterInitError> {
        if !(self.accel_gain.is_finite() && self.accel_gain >= 0.0) {
            return Err(FilterInitError::InvalidParameter {
                name: "accel_gain",
                reason: format!("must be a non-negative number, got {}", self.accel_gain),
            });
        }
        if !(self.bias_gain.is_finite() && self.bias_gain >= 0.0) {
            return Err(FilterInitError::InvalidParameter {
                name: "bias_gain",
                reason: format!("must be a non-negative number, got {}", self.bias_gain),
            });
        }
        self.attitude = UnitQuaternion::identity();
        self.gyro_bias = Vector3::zeros();
        self.aligned = false;
        Ok(())
    }

    fn step(
        &mut self,
        ctx: &FilterContext,
        state: &mut StateUpdate,
    ) -> Result<(), FilterRuntimeError> {
        let imu = ctx
            .sensors
            .imu
            .ok_or(FilterRuntimeError::MissingInput("imu"))?;
        Self::validate(&imu)?;

        let mut rate = imu.gyro - self.gyro_bias;

        if !self.aligned {
            // First sample: take roll/pitch straight from gravity.
            self.attitude = Self::level_from_accel(&imu.accel);
            self.aligned = true;
        } else {
            let accel_norm = imu.accel.norm();
            if accel_norm > MIN_ACCEL_NORM {
                // Gravity ("down") in the body frame: measured vs. predicted.
                let measured_down = -imu.accel / accel_norm;
                let predicted_down = self.attitude.inverse() * Vector3::z();
                let error = measured_down.cross(&predicted_down);

                rate += error * self.accel_gain;
                self.gyro_bias -= error * (self.bias_gain * ctx.dt);
            }
            self.attitude *= UnitQuaternion::from_scaled_axis(rate * ctx.dt);
            self.attitude.renormalize();
        }

        state.set_attitude(self.attitude);
        state.set_angular_rate(imu.gyro - self.gyro_bias);
        Ok(())
    }
}
