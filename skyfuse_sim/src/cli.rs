// skyfuse_sim/src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// SkyFuse: runs the state-estimation filter chain against a simulated
/// vehicle and reports how well it tracked the truth.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the host configuration TOML file.
    #[arg(short, long, default_value = "assets/config/indoor_stationary.toml")]
    pub config: PathBuf,

    /// Override `simulation.duration_s` (simulated seconds).
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Run cycles back to back instead of at the scheduler rate.
    #[arg(long, default_value_t = false)]
    pub fast: bool,

    /// Only log warnings and errors.
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Log filter directives, e.g. `info,skyfuse_core=debug`. Takes
    /// precedence over `--quiet` and `RUST_LOG`.
    #[arg(long)]
    pub log: Option<String>,
}

impl Cli {
    /// Directives for the tracing subscriber when `RUST_LOG` is not set.
    pub fn log_directives(&self) -> &str {
        match (&self.log, self.quiet) {
            (Some(directives), _) => directives,
            (None, true) => "warn",
            (None, false) => "info",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["skyfuse_sim"]);
        assert_eq!(
            cli.config,
            PathBuf::from("assets/config/indoor_stationary.toml")
        );
        assert_eq!(cli.duration, None);
        assert_eq!(cli.log_directives(), "info");
    }

    #[test]
    fn log_flag_wins_over_quiet() {
        let cli = Cli::parse_from(["skyfuse_sim", "-q", "--log", "debug", "-d", "3.5"]);
        assert_eq!(cli.log_directives(), "debug");
        assert_eq!(cli.duration, Some(3.5));

        let cli = Cli::parse_from(["skyfuse_sim", "--quiet"]);
        assert_eq!(cli.log_directives(), "warn");
    }
}
