use std::fs;

use cansat_core::config::{load_config, save_config, AnalysisConfig};
use cansat_core::error::ConfigError;
use cansat_core::models::SensorKind;
use cansat_core::refine::{GapPolicy, RefineParams};

#[test]
fn test_missing_config_gives_defaults() {
    let cfg = load_config("tests/no_such_config.json").unwrap();
    assert_eq!(cfg, AnalysisConfig::default());
    assert_eq!(cfg.gps.lacking_data_threshold, 500);
    assert_eq!(cfg.bmp280_descent.outlier_step_threshold, 11.0);
    assert_eq!(cfg.comparison_threshold_c, 3.0);
    assert_eq!(cfg.bulk_gap_policy, GapPolicy::MeanScaled(10.0));
}

#[test]
fn test_save_and_load_config() {
    let path = "tests/tmp_config.json";
    let mut cfg = AnalysisConfig::default();
    cfg.flight_label = "launch-2".to_string();
    cfg.dht11 = RefineParams::new(2.0, 5.0, 250);
    cfg.bulk_gap_policy = GapPolicy::Absolute(300);

    save_config(&cfg, path).expect("could not save config");
    let loaded = load_config(path).expect("could not load config");
    assert_eq!(loaded, cfg);
    assert_eq!(loaded.params_for(SensorKind::Dht11).lacking_data_threshold, 250);

    fs::remove_file(path).ok();
}

#[test]
fn test_partial_config_fills_defaults() {
    let path = "tests/tmp_partial_config.json";
    fs::write(
        path,
        r#"{ "flight_label": "f1", "bulk_gap_policy": { "mode": "absolute", "value": 250 } }"#,
    )
    .unwrap();

    let cfg = load_config(path).unwrap();
    assert_eq!(cfg.flight_label, "f1");
    assert_eq!(cfg.bulk_gap_policy, GapPolicy::Absolute(250));
    assert_eq!(cfg.gps, RefineParams::for_kind(SensorKind::Gps));

    fs::remove_file(path).ok();
}

#[test]
fn test_bad_config_reports_path() {
    let path = "tests/tmp_bad_config.json";
    fs::write(path, r#"{ "gps": { "outlier_step_threshold": "x" } }"#).unwrap();

    match load_config(path) {
        Err(ConfigError::Json { at, .. }) => assert_eq!(at, "gps.outlier_step_threshold"),
        other => panic!("expected a JSON error, got {other:?}"),
    }

    fs::remove_file(path).ok();
}
