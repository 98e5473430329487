use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::comparator::{Comparison, ReferenceSeries};
use crate::derived::{summarize, vertical_profile, wind_estimate, Altitude, ProbeProfile, VerticalSummary, WindEstimate};
use crate::logging::RunStats;
use crate::models::{Bmp280, Flight, Gps, Reading, SensorKind};
use crate::refine::RefinedFlight;

/// Data behind one raw-vs-refined view of a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesView {
    pub kind: SensorKind,
    pub field: String,
    pub unit: String,
    pub raw: Vec<(i64, f64)>,
    /// Points whose field is not flagged.
    pub refined: Vec<(i64, f64)>,
    /// (previous time, time) spans with likely data loss.
    pub gaps: Vec<(i64, i64)>,
    pub outliers: Vec<(i64, f64)>,
}

impl SeriesView {
    pub fn file_name(&self) -> String {
        format!("{}_{}.json", self.kind.label(), self.field)
    }
}

/// (previous time, time) for every sample flagged with missing data.
pub fn gap_spans<R: Reading>(seq: &[R]) -> Vec<(i64, i64)> {
    seq.windows(2)
        .filter(|w| w[1].missing_data())
        .map(|w| (w[0].time(), w[1].time()))
        .collect()
}

pub fn series_views<R: Reading>(seq: &[R]) -> Vec<SeriesView> {
    let gaps = gap_spans(seq);

    R::KIND
        .fields()
        .iter()
        .enumerate()
        .map(|(i, f)| {
            let mut view = SeriesView {
                kind: R::KIND,
                field: f.name.to_string(),
                unit: f.unit.to_string(),
                raw: Vec::with_capacity(seq.len()),
                refined: Vec::with_capacity(seq.len()),
                gaps: gaps.clone(),
                outliers: Vec::new(),
            };
            for s in seq {
                let Some(v) = s.value(i) else { continue };
                view.raw.push((s.time(), v));
                if s.is_field_outlier(i) {
                    view.outliers.push((s.time(), v));
                } else {
                    view.refined.push((s.time(), v));
                }
            }
            view
        })
        .collect()
}

pub fn flight_views(flight: &Flight) -> Vec<SeriesView> {
    let mut views = series_views(&flight.bmp280);
    views.extend(series_views(&flight.dht11));
    views.extend(series_views(&flight.gps));
    views.extend(series_views(&flight.mpu6050));
    views
}

/// Probe temperature against the reference series, re-based onto probe time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonView {
    /// (time, temperature) of BMP280 samples whose temperature is not flagged.
    pub probe: Vec<(i64, f64)>,
    pub reference: Vec<(i64, f64)>,
    pub gaps: Vec<(i64, i64)>,
    pub comparison: Option<Comparison>,
}

impl ComparisonView {
    pub const FILE_NAME: &'static str = "BMP280_vs_reference.json";
}

pub fn comparison_view(bmp: &[Bmp280], reference: &ReferenceSeries, comparison: Option<Comparison>) -> ComparisonView {
    ComparisonView {
        probe: bmp
            .iter()
            .filter(|s| !s.is_field_outlier(0))
            .filter_map(|s| s.value(0).map(|t| (s.time, t)))
            .collect(),
        reference: reference.pairs(),
        gaps: gap_spans(bmp),
        comparison,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub time: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
}

/// GPS path for the 3D (lat, lon, alt) and 2D (lat, lon) views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackView {
    pub raw: Vec<TrackPoint>,
    /// Fixes with no flagged field.
    pub refined: Vec<TrackPoint>,
    pub gaps: Vec<(i64, i64)>,
}

impl TrackView {
    pub const FILE_NAME: &'static str = "GPS_track.json";
}

pub fn track_view(gps: &[Gps]) -> TrackView {
    let point = |g: &Gps| TrackPoint {
        time: g.time,
        latitude: g.latitude,
        longitude: g.longitude,
        altitude: g.altitude,
    };
    let finite = |g: &&Gps| g.latitude.is_finite() && g.longitude.is_finite() && g.altitude.is_finite();

    TrackView {
        raw: gps.iter().filter(finite).map(point).collect(),
        refined: gps.iter().filter(finite).filter(|g| !g.is_outlier()).map(point).collect(),
        gaps: gap_spans(gps),
    }
}

/// Barometric height against GPS altitude, clean samples only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightView {
    pub barometric: Vec<(i64, f64)>,
    pub gps: Vec<(i64, f64)>,
}

impl HeightView {
    pub const FILE_NAME: &'static str = "height_BMP280_vs_GPS.json";
}

fn clean_heights<R: Altitude>(seq: &[R]) -> Vec<(i64, f64)> {
    seq.iter()
        .filter(|s| !s.is_outlier() && s.altitude_m().is_finite())
        .map(|s| (s.time(), s.altitude_m()))
        .collect()
}

pub fn height_view(bmp: &[Bmp280], gps: &[Gps]) -> HeightView {
    HeightView {
        barometric: clean_heights(bmp),
        gps: clean_heights(gps),
    }
}

/// Write one view as pretty JSON.
pub fn write_view<T: Serialize>(view: &T, path: impl AsRef<Path>) -> std::io::Result<()> {
    std::fs::write(path, serde_json::to_vec_pretty(view)?)
}

/// Write each view as `<KIND>_<field>.json` into `dir`.
pub fn write_views(views: &[SeriesView], dir: impl AsRef<Path>) -> std::io::Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::with_capacity(views.len());
    for v in views {
        let path = dir.join(v.file_name());
        write_view(v, &path)?;
        written.push(path);
    }
    Ok(written)
}

/// Load a previously exported view of any kind.
pub fn load_view<T: DeserializeOwned>(path: impl AsRef<Path>) -> std::io::Result<T> {
    let bytes = std::fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindSummary {
    pub samples: usize,
    pub missing_data: usize,
    /// Samples with at least one flagged field.
    pub outliers: usize,
}

pub fn summarize_kind<R: Reading>(seq: &[R]) -> KindSummary {
    KindSummary {
        samples: seq.len(),
        missing_data: seq.iter().filter(|s| s.missing_data()).count(),
        outliers: seq.iter().filter(|s| s.is_outlier()).count(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindSummary {
    pub average_speed: f64,
    pub average_direction_deg: f64,
    pub vectors: usize,
}

impl From<&WindEstimate> for WindSummary {
    fn from(w: &WindEstimate) -> Self {
        Self {
            average_speed: w.average_speed,
            average_direction_deg: w.average_direction_deg,
            vectors: w.vectors.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightReport {
    pub flight_label: String,
    pub generated_at: DateTime<Utc>,
    pub kinds: BTreeMap<SensorKind, KindSummary>,
    pub run_stats: BTreeMap<SensorKind, RunStats>,
    pub barometric: Option<VerticalSummary>,
    pub gps_vertical: Option<VerticalSummary>,
    pub wind: Option<WindSummary>,
    pub comparison: Option<Comparison>,
}

impl FlightReport {
    pub fn build(label: &str, refined: &RefinedFlight, probe: &ProbeProfile, comparison: Option<Comparison>) -> Self {
        let f = &refined.flight;
        let kinds = BTreeMap::from([
            (SensorKind::Bmp280, summarize_kind(&f.bmp280)),
            (SensorKind::Dht11, summarize_kind(&f.dht11)),
            (SensorKind::Gps, summarize_kind(&f.gps)),
            (SensorKind::Mpu6050, summarize_kind(&f.mpu6050)),
        ]);

        Self {
            flight_label: label.to_string(),
            generated_at: Utc::now(),
            kinds,
            run_stats: refined.stats.clone(),
            barometric: summarize(&vertical_profile(&f.bmp280)),
            gps_vertical: summarize(&vertical_profile(&f.gps)),
            wind: wind_estimate(&f.gps, probe).as_ref().map(WindSummary::from),
            comparison,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
