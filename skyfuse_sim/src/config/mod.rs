// skyfuse_sim/src/config/mod.rs

//! Loading and validating the host configuration.
//!
//! Values come from a TOML file, then from `SKYFUSE_`-prefixed environment
//! variables, where a double underscore separates nesting levels
//! (`SKYFUSE_SCHEDULER__RATE_HZ=200`).

pub mod structs;

use std::path::Path;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use tracing::info;

use crate::error::ConfigError;
pub use structs::{
    HostConfig, LocalizationConfig, SchedulerConfig, SensorsConfig, SimulationConfig,
    TrajectoryConfig,
};

pub const ENV_PREFIX: &str = "SKYFUSE_";

/// Reads, merges and validates the configuration at `path`.
pub fn load_config(path: &Path) -> Result<HostConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    info!("Loading configuration from: {}", path.display());

    let config: HostConfig = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .extract()?;
    config.validate()?;
    Ok(config)
}

/// Parses and validates configuration from a TOML string, without
/// environment overrides.
pub fn parse_config(toml: &str) -> Result<HostConfig, ConfigError> {
    let config: HostConfig = Figment::from(Toml::string(toml)).extract()?;
    config.validate()?;
    Ok(config)
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be positive, got {}", value)))
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be zero or positive, got {}", value)))
    }
}

impl HostConfig {
    /// Checks everything serde cannot. Filter parameters are left to the
    /// filters' own `init`, so a bad filter only disables that filter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("scheduler.rate_hz", self.scheduler.rate_hz)?;
        if self.scheduler.budget_us == Some(0) {
            return Err(invalid("scheduler.budget_us", "must be positive"));
        }

        positive("simulation.duration_s", self.simulation.duration_s)?;
        self.simulation
            .home
            .validate()
            .map_err(|reason| invalid("simulation.home", reason))?;
        match self.simulation.trajectory {
            TrajectoryConfig::Hover { altitude_m } => {
                non_negative("simulation.trajectory.altitude_m", altitude_m)?;
            }
            TrajectoryConfig::Circle {
                radius_m,
                speed_m_s,
                altitude_m,
            } => {
                positive("simulation.trajectory.radius_m", radius_m)?;
                non_negative("simulation.trajectory.speed_m_s", speed_m_s)?;
                non_negative("simulation.trajectory.altitude_m", altitude_m)?;
            }
        }

        let s = &self.sensors;
        non_negative("sensors.gyro_noise_std", s.gyro_noise_std)?;
        if !s.gyro_bias.iter().all(|b| b.is_finite()) {
            return Err(invalid("sensors.gyro_bias", "must be finite"));
        }
        non_negative("sensors.accel_noise_std", s.accel_noise_std)?;
        non_negative("sensors.baro_rate_hz", s.baro_rate_hz)?;
        non_negative("sensors.baro_noise_std", s.baro_noise_std)?;
        non_negative("sensors.gps_rate_hz", s.gps_rate_hz)?;
        non_negative("sensors.gps_position_noise_std", s.gps_position_noise_std)?;
        non_negative("sensors.gps_velocity_noise_std", s.gps_velocity_noise_std)?;
        if s.baro_rate_hz > self.scheduler.rate_hz || s.gps_rate_hz > self.scheduler.rate_hz {
            return Err(invalid(
                "sensors",
                "sensor rates cannot exceed scheduler.rate_hz",
            ));
        }

        if self.localization.enabled {
            positive("localization.rate_hz", self.localization.rate_hz)?;
            non_negative("localization.noise", self.localization.noise)?;
        }
        Ok(())
    }

    /// Number of estimation cycles covering `duration_s` simulated seconds.
    pub fn cycles_for(&self, duration_s: f64) -> u64 {
        (duration_s * self.scheduler.rate_hz).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyfuse_core::config::FilterKind;

    const OUTDOOR: &str = r#"
        [scheduler]
        rate_hz = 200.0

        [simulation]
        seed = 7
        duration_s = 2.0
        home = { latitude_deg = 47.4, longitude_deg = 8.5, altitude_m = 400.0 }
        trajectory = { type = "Circle", radius_m = 20.0, speed_m_s = 5.0, altitude_m = 10.0 }

        [localization]
        enabled = true
        rate_hz = 20.0

        [[estimation.filters]]
        type = "Barometric"

        [[estimation.filters]]
        type = "Gps"
        home = { latitude_deg = 47.4, longitude_deg = 8.5, altitude_m = 400.0 }

        [[estimation.filters]]
        name = "mocap"
        type = "ExternalPose"
        enabled = false
    "#;

    #[test]
    fn parses_full_config() {
        let config = parse_config(OUTDOOR).unwrap();

        assert_eq!(config.scheduler.rate_hz, 200.0);
        assert_eq!(config.simulation.seed, 7);
        assert!(matches!(
            config.simulation.trajectory,
            TrajectoryConfig::Circle { radius_m, .. } if radius_m == 20.0
        ));
        assert!(config.localization.enabled);
        assert_eq!(config.localization.noise, 0.02);
        assert_eq!(config.sensors, SensorsConfig::default());
        assert_eq!(config.cycles_for(config.simulation.duration_s), 400);

        let filters = &config.estimation.filters;
        assert_eq!(filters.len(), 3);
        assert!(matches!(filters[0].kind, FilterKind::Barometric { .. }));
        assert!(matches!(filters[1].kind, FilterKind::Gps { .. }));
        assert_eq!(filters[2].resolved_name(), "mocap");
        assert!(!filters[2].enabled);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, HostConfig::default());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = parse_config("[scheduler]\nrate_hz = 100.0\nturbo = true\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = parse_config("[scheduler]\nrate_hz = 0.0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "scheduler.rate_hz",
                ..
            }
        ));

        let circle = r#"
            [simulation]
            duration_s = 1.0
            trajectory = { type = "Circle", radius_m = 0.0, speed_m_s = 1.0 }
        "#;
        assert!(matches!(
            parse_config(circle).unwrap_err(),
            ConfigError::Invalid {
                field: "simulation.trajectory.radius_m",
                ..
            }
        ));
    }

    #[test]
    fn environment_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("host.toml", "[scheduler]\nrate_hz = 100.0\n")?;
            jail.set_env("SKYFUSE_SCHEDULER__RATE_HZ", "250.0");

            let config = load_config(Path::new("host.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.scheduler.rate_hz, 250.0);
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_config(Path::new("/nonexistent/skyfuse.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
