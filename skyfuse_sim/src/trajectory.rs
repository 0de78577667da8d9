// skyfuse_sim/src/trajectory.rs

use nalgebra::{UnitQuaternion, Vector3};

use crate::config::TrajectoryConfig;

/// Standard gravity (m/s^2), pointing down (+z) in NED.
pub const GRAVITY: f64 = 9.80665;

/// Ground-truth kinematic state at one instant, in the local NED frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruthSample {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub acceleration: Vector3<f64>,
    /// Body -> NED rotation.
    pub attitude: UnitQuaternion<f64>,
    /// Body angular rate (rad/s).
    pub angular_rate: Vector3<f64>,
}

impl TruthSample {
    /// What an ideal accelerometer would read: `R^T (a - g)`.
    pub fn specific_force(&self) -> Vector3<f64> {
        let gravity = Vector3::new(0.0, 0.0, GRAVITY);
        self.attitude.inverse() * (self.acceleration - gravity)
    }

    /// Height above home.
    pub fn height(&self) -> f64 {
        -self.position.z
    }
}

/// Closed-form motion of the simulated vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trajectory {
    config: TrajectoryConfig,
}

impl Trajectory {
    pub fn new(config: TrajectoryConfig) -> Self {
        Self { config }
    }

    pub fn sample(&self, t: f64) -> TruthSample {
        match self.config {
            TrajectoryConfig::Hover { altitude_m } => TruthSample {
                position: Vector3::new(0.0, 0.0, -altitude_m),
                velocity: Vector3::zeros(),
                acceleration: Vector3::zeros(),
                attitude: UnitQuaternion::identity(),
                angular_rate: Vector3::zeros(),
            },
            TrajectoryConfig::Circle {
                radius_m,
                speed_m_s,
                altitude_m,
            } => {
                let omega = speed_m_s / radius_m;
                let (sin, cos) = (omega * t).sin_cos();
                // Heading follows the velocity, which leads the radius by 90 degrees.
                let yaw = omega * t + std::f64::consts::FRAC_PI_2;
                TruthSample {
                    position: Vector3::new(radius_m * cos, radius_m * sin, -altitude_m),
                    velocity: Vector3::new(-speed_m_s * sin, speed_m_s * cos, 0.0),
                    acceleration: Vector3::new(
                        -speed_m_s * omega * cos,
                        -speed_m_s * omega * sin,
                        0.0,
                    ),
                    attitude: UnitQuaternion::from_euler_angles(0.0, 0.0, yaw),
                    angular_rate: Vector3::new(0.0, 0.0, omega),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hover_feels_only_gravity() {
        let trajectory = Trajectory::new(TrajectoryConfig::Hover { altitude_m: 3.0 });
        let truth = trajectory.sample(12.5);
        assert_eq!(truth.height(), 3.0);
        assert_abs_diff_eq!(truth.specific_force(), Vector3::new(0.0, 0.0, -GRAVITY));
    }

    #[test]
    fn circle_is_consistent() {
        let trajectory = Trajectory::new(TrajectoryConfig::Circle {
            radius_m: 10.0,
            speed_m_s: 2.0,
            altitude_m: 5.0,
        });

        for t in [0.0, 1.3, 7.9] {
            let truth = trajectory.sample(t);
            assert_abs_diff_eq!(truth.position.xy().norm(), 10.0, epsilon = 1e-9);
            assert_abs_diff_eq!(truth.velocity.norm(), 2.0, epsilon = 1e-9);
            // Centripetal acceleration v^2 / r, pointing at the centre.
            assert_abs_diff_eq!(truth.acceleration.norm(), 0.4, epsilon = 1e-9);
            assert_abs_diff_eq!(
                truth.acceleration.normalize(),
                -truth.position.xy().normalize().push(0.0),
                epsilon = 1e-9
            );
            // The body x axis points along the velocity.
            let nose = truth.attitude * Vector3::x();
            assert_abs_diff_eq!(nose, truth.velocity / 2.0, epsilon = 1e-9);
        }

        // Finite-difference check of the velocity.
        let h = 1e-6;
        let numeric = (trajectory.sample(1.0 + h).position - trajectory.sample(1.0 - h).position)
            / (2.0 * h);
        assert_abs_diff_eq!(numeric, trajectory.sample(1.0).velocity, epsilon = 1e-6);
    }
}
