// core/src/pipeline.rs
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::comparator::{compare, ReferenceProvider, ReferenceSeries};
use crate::config::AnalysisConfig;
use crate::derived::{vertical_profile, wind_estimate, wind_field};
use crate::generator::{synthetic_flight, SyntheticPlan};
use crate::metrics::Metrics;
use crate::models::{Bmp280, Dht11, Flight, Gps, Mpu6050, Reading};
use crate::parse::{read_raw_file, write_raw_file};
use crate::refine::{refine_flight, RefinedFlight};
use crate::report::{
    comparison_view, flight_views, height_view, track_view, write_view, write_views, ComparisonView, FlightReport,
    HeightView, TrackView,
};
use crate::storage::TableStore;

/// Where a run reads its flight from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Raw telemetry text at the config's raw path.
    Raw,
    /// Random flight, also written out as raw text to the config's raw path.
    Synthetic { seed: Option<u64>, plan: SyntheticPlan },
    /// Tables written by an earlier run.
    Store(PathBuf),
}

fn read_table<R: Reading>(store: &TableStore) -> Vec<R> {
    store.read_all::<R>().unwrap_or_else(|e| {
        error!("{e}");
        Vec::new()
    })
}

/// Flight from a table store. An unopenable store yields an empty flight.
pub fn load_from_store(dir: &Path) -> Flight {
    let store = match TableStore::open(dir) {
        Ok(store) => store,
        Err(e) => {
            error!("{e}");
            return Flight::default();
        }
    };
    Flight {
        bmp280: read_table::<Bmp280>(&store),
        dht11: read_table::<Dht11>(&store),
        gps: read_table::<Gps>(&store),
        mpu6050: read_table::<Mpu6050>(&store),
    }
}

pub fn load_flight(config: &AnalysisConfig, source: &Source, metrics: Option<&Metrics>) -> Flight {
    match source {
        Source::Raw => read_raw_file(&config.paths.raw, metrics),
        Source::Synthetic { seed, plan } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(*seed),
                None => StdRng::from_entropy(),
            };
            let flight = synthetic_flight(&mut rng, plan);
            let raw = &config.paths.raw;
            if let Some(parent) = raw.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            match write_raw_file(&flight, raw) {
                Ok(()) => info!("synthetic flight written to {}", raw.display()),
                Err(e) => error!("cannot write {}: {e}", raw.display()),
            }
            flight
        }
        Source::Store(dir) => load_from_store(dir),
    }
}

fn persist<R: Reading>(store: &TableStore, rows: &[R], metrics: Option<&Metrics>) {
    match store.replace_all(rows) {
        Ok(n) => {
            if let Some(m) = metrics {
                m.rows_written(R::KIND, n);
            }
        }
        Err(e) => error!("{e}"),
    }
}

/// Replace every table under the config's store path with the refined samples.
pub fn persist_flight(refined: &RefinedFlight, dir: &Path, metrics: Option<&Metrics>) {
    match TableStore::create(dir, false) {
        Ok(store) => {
            persist(&store, &refined.flight.bmp280, metrics);
            persist(&store, &refined.flight.dht11, metrics);
            persist(&store, &refined.flight.gps, metrics);
            persist(&store, &refined.flight.mpu6050, metrics);
        }
        Err(e) => error!("{e}"),
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) {
    match write_view(value, path) {
        Ok(()) => info!("wrote {}", path.display()),
        Err(e) => error!("cannot write {}: {e}", path.display()),
    }
}

/// Reference temperatures moved onto probe time, starting at the last BMP280 sample.
pub fn rebased_reference(provider: &dyn ReferenceProvider, bmp: &[Bmp280], step: i64) -> Option<ReferenceSeries> {
    match provider.reference_series() {
        Ok(mut series) => {
            if let Some(last) = bmp.last() {
                series.rebase(last.time, step);
            }
            Some(series)
        }
        Err(e) => {
            warn!("no reference temperatures: {e}");
            None
        }
    }
}

/// One full analysis run: load, refine, persist, derive, compare, report.
///
/// Every output is best effort. Failures are logged and the run carries on,
/// so a report is always produced (possibly of an empty flight).
pub fn run(
    config: &AnalysisConfig,
    source: &Source,
    reference: Option<&dyn ReferenceProvider>,
    metrics: Option<&Metrics>,
) -> FlightReport {
    let flight = load_flight(config, source, metrics);
    if flight.is_empty() {
        warn!("no samples to analyze");
    }

    let refined = refine_flight(&flight, config, metrics);
    persist_flight(&refined, &config.paths.store, metrics);
    let f = &refined.flight;

    let out = &config.paths.out;
    let views_dir = out.join("views");
    if let Err(e) = std::fs::create_dir_all(&views_dir) {
        error!("cannot create {}: {e}", views_dir.display());
    }
    write_json(&out.join("vertical_bmp280.json"), &vertical_profile(&f.bmp280));
    write_json(&out.join("vertical_gps.json"), &vertical_profile(&f.gps));
    if let Some(estimate) = wind_estimate(&f.gps, &config.probe) {
        write_json(&out.join("wind_estimate.json"), &estimate);
        write_json(
            &out.join("wind_field.json"),
            &wind_field(&estimate, &f.gps, config.wind_grid),
        );
    }

    let series = reference.and_then(|p| rebased_reference(p, &f.bmp280, config.reference_step));
    let comparison = series
        .as_ref()
        .and_then(|s| compare(&f.bmp280, s, config.comparison_threshold_c));

    let report = FlightReport::build(&config.flight_label, &refined, &config.probe, comparison);
    write_json(&out.join("report.json"), &report);

    match write_views(&flight_views(f), &views_dir) {
        Ok(paths) => info!("{} views written to {}", paths.len(), views_dir.display()),
        Err(e) => error!("cannot write views: {e}"),
    }
    write_json(&views_dir.join(TrackView::FILE_NAME), &track_view(&f.gps));
    write_json(&views_dir.join(HeightView::FILE_NAME), &height_view(&f.bmp280, &f.gps));
    if let Some(series) = &series {
        write_json(
            &views_dir.join(ComparisonView::FILE_NAME),
            &comparison_view(&f.bmp280, series, comparison),
        );
    }

    report
}
