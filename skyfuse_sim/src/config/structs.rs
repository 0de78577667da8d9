// skyfuse_sim/src/config/structs.rs

use serde::Deserialize;
use skyfuse_core::config::ChainConfig;
use skyfuse_core::frames::GeoPoint;

// =========================================================================
// == Top-Level Configuration ==
// =========================================================================

/// # HostConfig
/// Root of the data parsed from a `config/*.toml` file.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct HostConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub simulation: SimulationConfig,

    #[serde(default)]
    pub sensors: SensorsConfig,

    #[serde(default)]
    pub localization: LocalizationConfig,

    // The TOML has `[[estimation.filters]]`, which becomes the ordered chain.
    #[serde(default)]
    pub estimation: ChainConfig,
}

// =========================================================================
// == Configuration Sub-Structs ==
// =========================================================================

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Rate of the estimation task, which is also the IMU rate.
    pub rate_hz: f64,
    /// Execution budget per cycle. Defaults to 80% of the period.
    #[serde(default)]
    pub budget_us: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            rate_hz: 400.0,
            budget_us: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Seed for the pseudo-random number generator, for determinism.
    #[serde(default)]
    pub seed: u64,
    /// Duration of the run in simulated seconds.
    pub duration_s: f64,
    /// Take-off location; origin of the local NED frame.
    #[serde(default = "default_home")]
    pub home: GeoPoint,
    #[serde(default)]
    pub trajectory: TrajectoryConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            duration_s: 10.0,
            home: default_home(),
            trajectory: TrajectoryConfig::default(),
        }
    }
}

fn default_home() -> GeoPoint {
    GeoPoint::new(0.0, 0.0, 0.0)
}

/// The ground-truth motion of the simulated vehicle.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "PascalCase", deny_unknown_fields)]
pub enum TrajectoryConfig {
    /// Holds position at the given height above home.
    Hover {
        #[serde(default)]
        altitude_m: f64,
    },
    /// Flies a horizontal circle around home at constant speed, nose along
    /// the velocity.
    Circle {
        radius_m: f64,
        speed_m_s: f64,
        #[serde(default)]
        altitude_m: f64,
    },
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        TrajectoryConfig::Hover { altitude_m: 0.0 }
    }
}

/// Simulated sensor models. The IMU runs at the scheduler rate; the slower
/// sensors deliver a sample every `rate_hz / <sensor>_rate_hz` cycles.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct SensorsConfig {
    pub gyro_noise_std: f64,
    pub gyro_bias: [f64; 3],
    pub accel_noise_std: f64,
    /// Zero disables the barometer.
    pub baro_rate_hz: f64,
    pub baro_noise_std: f64,
    /// Zero disables the GPS receiver.
    pub gps_rate_hz: f64,
    pub gps_position_noise_std: f64,
    pub gps_velocity_noise_std: f64,
    pub gps_satellites: u8,
}

impl Default for SensorsConfig {
    fn default() -> Self {
        Self {
            gyro_noise_std: 0.002,
            gyro_bias: [0.0; 3],
            accel_noise_std: 0.05,
            baro_rate_hz: 50.0,
            baro_noise_std: 0.1,
            gps_rate_hz: 5.0,
            gps_position_noise_std: 0.5,
            gps_velocity_noise_std: 0.05,
            gps_satellites: 10,
        }
    }
}

/// The sibling localization task (vision, motion capture, ...), which runs on
/// its own thread and rate and feeds the `ExternalPose` filter.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, default)]
pub struct LocalizationConfig {
    pub enabled: bool,
    pub rate_hz: f64,
    /// Standard deviation of the position noise (meters).
    pub noise: f64,
    /// Also publish the attitude, not only the position.
    pub publish_attitude: bool,
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rate_hz: 30.0,
            noise: 0.02,
            publish_attitude: true,
        }
    }
}
