// skyfuse_sim/src/main.rs

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use skyfuse_sim::cli::Cli;
use skyfuse_sim::config::load_config;
use skyfuse_sim::scheduler::Pacing;
use skyfuse_sim::{run, RunOptions, SimError};

fn init_tracing(cli: &Cli) {
    let filter = match &cli.log {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(cli.log_directives())),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .init();
}

fn try_main(cli: &Cli) -> Result<(), SimError> {
    let config = load_config(&cli.config)?;
    let options = RunOptions {
        pacing: if cli.fast {
            Pacing::AsFastAsPossible
        } else {
            Pacing::RealTime
        },
        duration_s: cli.duration,
    };
    let summary = run(&config, options)?;
    print!("{}", summary);
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match try_main(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
