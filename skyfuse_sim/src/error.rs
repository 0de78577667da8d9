// skyfuse_sim/src/error.rs

use std::path::PathBuf;

use skyfuse_core::estimation::{ChainError, FatalPipelineError};
use thiserror::Error;

/// Loading or validating the host configuration failed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] Box<figment::Error>),

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Parse(Box::new(e))
    }
}

/// Everything that can stop a simulation run.
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build the filter chain: {0}")]
    Chain(#[from] ChainError),

    #[error("estimation pipeline cannot start: {0}")]
    Fatal(#[from] FatalPipelineError),

    #[error("invalid sensor model parameter `{name}`: {reason}")]
    SensorModel { name: &'static str, reason: String },

    #[error("failed to spawn task '{task}': {source}")]
    Spawn {
        task: String,
        #[source]
        source: std::io::Error,
    },

    #[error("task '{0}' panicked")]
    TaskPanicked(String),

    #[error("the estimation task is no longer accepting commands")]
    TaskGone,
}
