// skyfuse_sim/tests/headless_run.rs

//! End-to-end runs of the simulator without real-time pacing.

use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use skyfuse_core::estimation::{ChainError, FatalPipelineError};
use skyfuse_core::state::{StateField, UpdatedFields};
use skyfuse_sim::config::{load_config, parse_config};
use skyfuse_sim::prelude::*;

fn asset(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../assets/config")
        .join(name)
}

fn fast(duration_s: f64) -> RunOptions {
    RunOptions {
        pacing: Pacing::AsFastAsPossible,
        duration_s: Some(duration_s),
    }
}

#[test]
fn indoor_bench_run() {
    let config = load_config(&asset("indoor_stationary.toml")).unwrap();
    let summary = run(&config, fast(2.0)).unwrap();
    let est = &summary.estimation;

    assert_eq!(est.cycles, 800);
    assert_eq!(est.tally.ok, 800);
    assert_eq!(est.tally.partial_failure, 0);

    let expected: UpdatedFields = [
        StateField::Position,
        StateField::Velocity,
        StateField::Attitude,
        StateField::AngularRate,
    ]
    .into_iter()
    .collect();
    // The barometer is slower than the cycle; it was silent on the last one.
    assert_eq!(est.final_state.updated(), expected);

    assert_eq!(summary.position_error(), Some(0.0));
    assert!(summary.attitude_error().unwrap() < 2f64.to_radians());
    assert_abs_diff_eq!(est.final_state.altitude, 0.0, epsilon = 0.5);
    assert!(summary.localization_poses.is_none());
}

#[test]
fn runs_are_deterministic() {
    let toml = r#"
        [scheduler]
        rate_hz = 100.0

        [simulation]
        seed = 99
        duration_s = 1.0

        [[estimation.filters]]
        type = "Complementary"

        [[estimation.filters]]
        type = "Barometric"
        settle_samples = 5
    "#;
    let config = parse_config(toml).unwrap();

    let a = run(&config, fast(1.0)).unwrap();
    let b = run(&config, fast(1.0)).unwrap();
    assert_eq!(a.estimation.final_state, b.estimation.final_state);
    assert_eq!(a.estimation.final_report, b.estimation.final_report);
}

#[test]
fn outdoor_run_without_localization_isolates_pose_filter() {
    let mut config = load_config(&asset("outdoor_gps.toml")).unwrap();
    config.localization.enabled = false;
    config.sensors.gps_position_noise_std = 0.0;

    // 1001 cycles at 200 Hz, so the last one receives a GPS fix (every 20th).
    let summary = run(&config, fast(5.005)).unwrap();
    let est = &summary.estimation;

    assert_eq!(est.cycles, 1001);
    // The pose filter failed init and is never stepped; nothing else fails.
    assert_eq!(est.tally.ok, 1001);
    assert_eq!(est.final_report.invoked, 3);
    assert!(est.final_report.contributions[3].is_empty());
    assert!(est.final_report.contributions[2].contains(StateField::Position));

    let error = summary.position_error().unwrap();
    assert!(error < 1e-3, "position error {} m", error);
}

#[test]
fn chain_without_functional_filters_refuses_to_run() {
    let toml = r#"
        [simulation]
        duration_s = 1.0

        [[estimation.filters]]
        type = "ExternalPose"
    "#;
    let config = parse_config(toml).unwrap();

    let err = run(&config, fast(1.0)).unwrap_err();
    assert!(matches!(
        err,
        SimError::Fatal(FatalPipelineError::NoFunctionalFilters { attempted: 1 })
    ));
}

#[test]
fn chain_build_errors_surface() {
    let disabled = r#"
        [simulation]
        duration_s = 1.0

        [[estimation.filters]]
        type = "Stationary"
        enabled = false
    "#;
    let err = run(&parse_config(disabled).unwrap(), fast(1.0)).unwrap_err();
    assert!(matches!(
        err,
        SimError::Chain(ChainError::Fatal(FatalPipelineError::NoEnabledFilters))
    ));

    let unknown = r#"
        [simulation]
        duration_s = 1.0

        [[estimation.filters]]
        type = "Custom"
        kind = "Kalman"
    "#;
    let err = run(&parse_config(unknown).unwrap(), fast(1.0)).unwrap_err();
    assert!(matches!(err, SimError::Chain(ChainError::UnknownKind(kind)) if kind == "Kalman"));
}

#[test]
fn duration_below_one_cycle_is_rejected() {
    let config = load_config(&asset("indoor_stationary.toml")).unwrap();

    let err = run(&config, fast(0.001)).unwrap_err();
    assert!(matches!(
        err,
        SimError::Config(ConfigError::Invalid {
            field: "duration",
            ..
        })
    ));
}
