use std::fs;
use std::path::Path;

use cansat_core::comparator::{ReferenceSeries, StaticReference};
use cansat_core::config::AnalysisConfig;
use cansat_core::generator::SyntheticPlan;
use cansat_core::metrics::Metrics;
use cansat_core::models::{Bmp280, Gps, SensorKind};
use cansat_core::pipeline::{run, Source};
use cansat_core::report::{load_view, ComparisonView, FlightReport, HeightView, SeriesView, TrackView};
use cansat_core::storage::TableStore;

const RAW: &str = "\
BMP280 20.0 101325 100 0
BMP280 20.5 101300 110 10
BMP280 21.0 101280 120 20
ERROR BMP280 read failed
BMP280 21.5 101290 115 30
GPS 47.0 19.0 100 0
GPS 47.0001 19.0001 110 10
GPS 47.0002 19.0002 120 20
DHT11 40 22.0 0
";

fn config_in(dir: &str) -> AnalysisConfig {
    let mut config = AnalysisConfig::default();
    config.flight_label = "test".to_string();
    config.paths.raw = Path::new(dir).join("raw_data.txt");
    config.paths.store = Path::new(dir).join("tables");
    config.paths.out = Path::new(dir).join("out");
    config
}

#[test]
fn raw_run_writes_tables_and_views() {
    let dir = "tests/tmp_pipeline_raw";
    fs::create_dir_all(dir).unwrap();
    let config = config_in(dir);
    fs::write(&config.paths.raw, RAW).unwrap();

    let metrics = Metrics::new().unwrap();
    let report = run(&config, &Source::Raw, None, Some(&metrics));

    assert_eq!(report.flight_label, "test");
    assert_eq!(report.kinds[&SensorKind::Bmp280].samples, 4);
    assert_eq!(report.kinds[&SensorKind::Gps].samples, 3);
    assert!(report.comparison.is_none());
    assert_eq!(metrics.skipped_total(Some(SensorKind::Bmp280), "sensor_error"), 1);

    let store = TableStore::open(&config.paths.store).expect("store");
    let stored: Vec<Bmp280> = store.read_all().unwrap();
    assert_eq!(stored.len(), 4);

    let out = &config.paths.out;
    for name in ["report.json", "vertical_bmp280.json", "vertical_gps.json", "wind_estimate.json", "wind_field.json"] {
        assert!(out.join(name).exists(), "{name} missing");
    }
    let saved: FlightReport = load_view(out.join("report.json")).unwrap();
    assert_eq!(saved.flight_label, report.flight_label);
    assert_eq!(saved.kinds, report.kinds);

    let views = out.join("views");
    let height: SeriesView = load_view(views.join("BMP280_height.json")).unwrap();
    assert_eq!(height.raw.len(), 4);
    let track: TrackView = load_view(views.join(TrackView::FILE_NAME)).unwrap();
    assert_eq!(track.raw.len(), 3);
    let heights: HeightView = load_view(views.join(HeightView::FILE_NAME)).unwrap();
    assert_eq!(heights.gps.len(), 3);
    // no reference, no comparison view
    assert!(!views.join(ComparisonView::FILE_NAME).exists());

    fs::remove_dir_all(dir).ok();
}

#[test]
fn second_run_replaces_tables() {
    let dir = "tests/tmp_pipeline_replace";
    fs::create_dir_all(dir).unwrap();
    let config = config_in(dir);
    fs::write(&config.paths.raw, RAW).unwrap();

    run(&config, &Source::Raw, None, None);
    run(&config, &Source::Raw, None, None);

    let store = TableStore::open(&config.paths.store).expect("store");
    assert_eq!(store.count(SensorKind::Bmp280).unwrap(), 4);
    assert_eq!(store.count(SensorKind::Dht11).unwrap(), 1);

    // reading the tables back gives the same flight
    let report = run(&config, &Source::Store(config.paths.store.clone()), None, None);
    assert_eq!(report.kinds[&SensorKind::Bmp280].samples, 4);
    assert_eq!(report.kinds[&SensorKind::Gps].samples, 3);
    assert_eq!(store.count(SensorKind::Bmp280).unwrap(), 4);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn unreadable_raw_file_still_reports() {
    let dir = "tests/tmp_pipeline_missing";
    let config = config_in(dir);

    let report = run(&config, &Source::Raw, None, None);

    assert_eq!(report.kinds[&SensorKind::Bmp280].samples, 0);
    assert!(report.barometric.is_none());
    assert!(report.wind.is_none());
    assert!(config.paths.out.join("report.json").exists());

    fs::remove_dir_all(dir).ok();
}

#[test]
fn unreachable_store_still_reports() {
    let dir = "tests/tmp_pipeline_blocked";
    fs::create_dir_all(dir).unwrap();
    let mut config = config_in(dir);
    fs::write(&config.paths.raw, RAW).unwrap();

    // a regular file where the store directory's parent should be
    let blocker = Path::new(dir).join("blocker");
    fs::write(&blocker, "not a directory").unwrap();
    config.paths.store = blocker.join("tables");

    let report = run(&config, &Source::Raw, None, None);
    assert_eq!(report.kinds[&SensorKind::Bmp280].samples, 4);
    assert!(!config.paths.store.exists());

    // the same path as an input source yields an empty flight
    let report = run(&config, &Source::Store(config.paths.store.clone()), None, None);
    assert_eq!(report.kinds[&SensorKind::Gps].samples, 0);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn synthetic_source_writes_raw_text() {
    let dir = "tests/tmp_pipeline_synthetic";
    let config = config_in(dir);
    let plan = SyntheticPlan {
        bmp280: 50,
        dht11: 20,
        gps: 10,
        mpu6050: 5,
    };

    let source = Source::Synthetic { seed: Some(7), plan };
    let report = run(&config, &source, None, None);

    assert_eq!(report.kinds[&SensorKind::Bmp280].samples, 50);
    assert_eq!(report.kinds[&SensorKind::Gps].samples, 10);
    assert!(config.paths.raw.exists());

    // the same seed reproduces the same flight
    let again = run(&config, &source, None, None);
    assert_eq!(again.kinds, report.kinds);
    assert_eq!(again.barometric, report.barometric);

    // and the written raw file reads back into it
    let from_raw = run(&config, &Source::Raw, None, None);
    assert_eq!(from_raw.kinds[&SensorKind::Mpu6050].samples, 5);

    fs::remove_dir_all(dir).ok();
}

#[test]
fn reference_is_rebased_before_comparison() {
    let dir = "tests/tmp_pipeline_reference";
    fs::create_dir_all(dir).unwrap();
    let mut config = config_in(dir);
    config.reference_step = 600;
    fs::write(&config.paths.raw, RAW).unwrap();

    let reference = StaticReference {
        series: ReferenceSeries::from_pairs(&[(3600, 17.0), (7200, 16.0), (10800, 15.0)]),
    };
    let report = run(&config, &Source::Raw, Some(&reference), None);

    let c = report.comparison.expect("comparison");
    assert_eq!(c.probe_time, 30);
    assert_eq!(c.probe_temperature, 21.5);
    assert_eq!(c.reference_temperature, 17.0);
    assert!(c.significant);

    let view: ComparisonView = load_view(config.paths.out.join("views").join(ComparisonView::FILE_NAME)).unwrap();
    assert_eq!(view.reference, vec![(30, 17.0), (630, 16.0), (1230, 15.0)]);
    assert_eq!(view.probe.len(), 4);
    assert_eq!(view.comparison, Some(c));

    // an empty reference leaves the run without a comparison
    let empty = StaticReference::default();
    let report = run(&config, &Source::Raw, Some(&empty), None);
    assert!(report.comparison.is_none());

    fs::remove_dir_all(dir).ok();
}

#[test]
fn gps_track_matches_input() {
    let dir = "tests/tmp_pipeline_track";
    fs::create_dir_all(dir).unwrap();
    let config = config_in(dir);
    fs::write(&config.paths.raw, RAW).unwrap();

    run(&config, &Source::Raw, None, None);
    let track: TrackView = load_view(config.paths.out.join("views").join(TrackView::FILE_NAME)).unwrap();
    let first = Gps::new(0, 47.0, 19.0, 100.0);
    assert_eq!((track.raw[0].time, track.raw[0].latitude), (first.time, first.latitude));
    assert_eq!(track.refined.len(), 3);
    assert!(track.gaps.is_empty());

    fs::remove_dir_all(dir).ok();
}
