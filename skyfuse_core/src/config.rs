// skyfuse_core/src/config.rs

//! Serde types describing which filters run, in which order, and with which
//! parameters. The host application loads them from its own configuration
//! source and hands them to [`crate::estimation::Chain::from_config`].

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::frames::GeoPoint;

/// The ordered filter list. Order of the entries is the execution order,
/// and therefore decides which filter wins when two write the same field.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ChainConfig {
    #[serde(default)]
    pub filters: Vec<FilterEntry>,
}

/// One `[[filters]]` entry.
///
/// Unknown keys are rejected: a misspelled `enabled` or parameter name is a
/// parse error rather than a silently applied default.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(from = "RawEntry")]
pub struct FilterEntry {
    /// Unique name within the chain. Defaults to the lower-cased kind.
    pub name: Option<String>,
    pub enabled: bool,
    pub kind: FilterKind,
}

fn default_enabled() -> bool {
    true
}

// Wire form of a filter entry. Each variant repeats the common keys so that
// `deny_unknown_fields` sees the whole table.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "PascalCase", deny_unknown_fields)]
enum RawEntry {
    Stationary {
        #[serde(default)]
        name: Option<String>,
        #[serde(default = "default_enabled")]
        enabled: bool,
    },
    Barometric {
        #[serde(default)]
        name: Option<String>,
        #[serde(default = "default_enabled")]
        enabled: bool,
        #[serde(default = "default_settle_samples")]
        settle_samples: u32,
    },
    Gps {
        #[serde(default)]
        name: Option<String>,
        #[serde(default = "default_enabled")]
        enabled: bool,
        home: GeoPoint,
        #[serde(default = "default_min_satellites")]
        min_satellites: u8,
    },
    Complementary {
        #[serde(default)]
        name: Option<String>,
        #[serde(default = "default_enabled")]
        enabled: bool,
        #[serde(default = "default_accel_gain")]
        accel_gain: f64,
        #[serde(default = "default_bias_gain")]
        bias_gain: f64,
    },
    ExternalPose {
        #[serde(default)]
        name: Option<String>,
        #[serde(default = "default_enabled")]
        enabled: bool,
        #[serde(default = "default_max_age_s")]
        max_age_s: f64,
    },
    Custom {
        #[serde(default)]
        name: Option<String>,
        #[serde(default = "default_enabled")]
        enabled: bool,
        kind: String,
        #[serde(default)]
        params: BTreeMap<String, f64>,
    },
}

impl From<RawEntry> for FilterEntry {
    fn from(raw: RawEntry) -> Self {
        let (name, enabled, kind) = match raw {
            RawEntry::Stationary { name, enabled } => (name, enabled, FilterKind::Stationary),
            RawEntry::Barometric {
                name,
                enabled,
                settle_samples,
            } => (name, enabled, FilterKind::Barometric { settle_samples }),
            RawEntry::Gps {
                name,
                enabled,
                home,
                min_satellites,
            } => (
                name,
                enabled,
                FilterKind::Gps {
                    home,
                    min_satellites,
                },
            ),
            RawEntry::Complementary {
                name,
                enabled,
                accel_gain,
                bias_gain,
            } => (
                name,
                enabled,
                FilterKind::Complementary {
                    accel_gain,
                    bias_gain,
                },
            ),
            RawEntry::ExternalPose {
                name,
                enabled,
                max_age_s,
            } => (name, enabled, FilterKind::ExternalPose { max_age_s }),
            RawEntry::Custom {
                name,
                enabled,
                kind,
                params,
            } => (name, enabled, FilterKind::Custom { kind, params }),
        };
        Self {
            name,
            enabled,
            kind,
        }
    }
}

impl FilterEntry {
    pub fn new(kind: FilterKind) -> Self {
        Self {
            name: None,
            enabled: true,
            kind,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn resolved_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.kind.kind_str().to_lowercase())
    }
}

/// Which filter an entry builds, with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// Assumes the vehicle does not move (indoor / no-GPS mode).
    Stationary,
    Barometric {
        /// Number of samples averaged into the ground reference.
        settle_samples: u32,
    },
    Gps {
        /// Origin of the local NED frame.
        home: GeoPoint,
        min_satellites: u8,
    },
    Complementary {
        /// Proportional gain of the accelerometer tilt correction (1/s).
        accel_gain: f64,
        /// Integral gain of the gyro bias estimate (1/s^2).
        bias_gain: f64,
    },
    ExternalPose {
        /// Poses older than this are rejected as stale (seconds).
        max_age_s: f64,
    },
    /// A filter registered by the application under its own kind name.
    Custom {
        kind: String,
        params: BTreeMap<String, f64>,
    },
}

fn default_settle_samples() -> u32 {
    50
}

fn default_min_satellites() -> u8 {
    6
}

fn default_accel_gain() -> f64 {
    0.5
}

fn default_bias_gain() -> f64 {
    0.01
}

fn default_max_age_s() -> f64 {
    0.5
}

impl FilterKind {
    /// The registry key for this kind.
    pub fn kind_str(&self) -> &str {
        match self {
            FilterKind::Stationary => "Stationary",
            FilterKind::Barometric { .. } => "Barometric",
            FilterKind::Gps { .. } => "Gps",
            FilterKind::Complementary { .. } => "Complementary",
            FilterKind::ExternalPose { .. } => "ExternalPose",
            FilterKind::Custom { kind, .. } => kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ordered_chain_with_defaults() {
        let config: ChainConfig = toml::from_str(
            r#"
            [[filters]]
            type = "Gps"
            home = { latitude_deg = 47.0, longitude_deg = 8.0, altitude_m = 400.0 }

            [[filters]]
            name = "baro"
            type = "Barometric"
            settle_samples = 10

            [[filters]]
            type = "Stationary"
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.filters.len(), 3);
        assert_eq!(
            config.filters[0].kind,
            FilterKind::Gps {
                home: GeoPoint::new(47.0, 8.0, 400.0),
                min_satellites: 6,
            }
        );
        assert_eq!(config.filters[0].resolved_name(), "gps");
        assert!(config.filters[0].enabled);

        assert_eq!(config.filters[1].resolved_name(), "baro");
        assert_eq!(
            config.filters[1].kind,
            FilterKind::Barometric { settle_samples: 10 }
        );

        assert_eq!(config.filters[2].kind, FilterKind::Stationary);
        assert!(!config.filters[2].enabled);
    }

    #[test]
    fn custom_kind_keeps_its_parameters() {
        let config: ChainConfig = toml::from_str(
            r#"
            [[filters]]
            type = "Custom"
            kind = "OpticalFlow"
            params = { scale = 2.5 }
            "#,
        )
        .unwrap();

        let kind = &config.filters[0].kind;
        assert_eq!(kind.kind_str(), "OpticalFlow");
        match kind {
            FilterKind::Custom { params, .. } => assert_eq!(params.get("scale"), Some(&2.5)),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn misspelled_keys_are_rejected() {
        let parameter: Result<ChainConfig, _> = toml::from_str(
            r#"
            [[filters]]
            type = "Barometric"
            setle_samples = 3
            "#,
        );
        let err = parameter.unwrap_err().to_string();
        assert!(err.contains("`setle_samples`"), "{}", err);

        let switch: Result<ChainConfig, _> = toml::from_str(
            r#"
            [[filters]]
            type = "Stationary"
            enable = false
            "#,
        );
        let err = switch.unwrap_err().to_string();
        assert!(err.contains("`enable`"), "{}", err);
    }

    #[test]
    fn unknown_type_is_an_error() {
        let result: Result<ChainConfig, _> = toml::from_str(
            r#"
            [[filters]]
            type = "Kalman9000"
            "#,
        );
        assert!(result.is_err());
    }
}
