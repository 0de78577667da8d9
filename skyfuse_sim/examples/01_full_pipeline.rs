// skyfuse_sim/examples/01_full_pipeline.rs

//! A full end-to-end example of driving the estimation pipeline by hand.
//!
//! This example demonstrates how to:
//! 1. Load a host configuration from a TOML file.
//! 2. Build the filter chain and start the pipeline.
//! 3. Run it on a periodic task and read the published estimates.
//! 4. Swap the filter chain while the task is running.
//!
//! To run this example:
//! `cargo run --example 01_full_pipeline`

use std::path::Path;
use std::thread;
use std::time::Duration;

use skyfuse_sim::prelude::*;
use skyfuse_sim::sensors::{SimClock, SimulatedSensors};
use tracing::info;

fn main() -> Result<(), SimError> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    // --- 1. Load Configuration ---
    let config = load_config(Path::new("assets/config/indoor_stationary.toml"))?;

    // --- 2. Build the Chain and Pipeline ---
    let registry = FilterRegistry::with_builtins();
    let build_ctx = BuildContext::default();
    let chain = Chain::from_config(&config.estimation, &registry, &build_ctx)?;
    let sensors = SimulatedSensors::new(
        &config.simulation,
        &config.sensors,
        config.scheduler.rate_hz,
        SimClock::default(),
    )?;
    let pipeline = Pipeline::start(chain, PipelineContext::new(Box::new(sensors)))?;

    // --- 3. Run it ---
    let spec = TaskSpec::new("estimation", config.scheduler.rate_hz);
    let task = EstimationTask::spawn(pipeline, spec, None, registry, build_ctx)?;
    let reader = task.reader();

    for _ in 0..4 {
        thread::sleep(Duration::from_millis(250));
        if let Some(latest) = reader.latest() {
            info!(
                "cycle {:>5}  t = {:6.3} s  fresh {}",
                latest.cycle,
                latest.timestamp,
                latest.state.updated()
            );
        }
    }

    // --- 4. Reconfigure: attitude only ---
    let mut attitude_only = config.estimation.clone();
    attitude_only
        .filters
        .retain(|entry| matches!(entry.kind, FilterKind::Complementary { .. }));
    task.reconfigure(attitude_only)?;

    thread::sleep(Duration::from_millis(250));
    if let Some(latest) = reader.latest() {
        info!("after reconfiguration: fresh {}", latest.state.updated());
    }

    let summary = task.stop()?;
    info!(
        "Stopped after {} cycles ({} reconfiguration).",
        summary.cycles, summary.reconfigurations
    );
    Ok(())
}
