pub mod cli;
pub mod comparator;
pub mod config;
pub mod derived;
pub mod error;
pub mod generator;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod parse;
pub mod pipeline;
pub mod refine;
pub mod report;
pub mod storage;

#[cfg(feature = "python")]
mod py;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

pub use comparator::{compare, Comparison, ReferenceProvider, ReferenceSeries};
pub use config::{load_config, save_config, AnalysisConfig};
pub use derived::{acceleration, speed, vertical_profile, wind_estimate, wind_field, ProbeProfile, WindEstimate};
pub use error::{ConfigError, ParseError, ReferenceError, RefineError, StoreError};
pub use logging::{RunLog, RunStats};
pub use metrics::Metrics;
pub use models::{Bmp280, Dht11, Flight, Gps, Mpu6050, Reading, Record, SensorKind};
pub use refine::{refine, refine_flight, refine_step, GapPolicy, RefineParams, RefinedFlight};
pub use pipeline::Source;
pub use report::{ComparisonView, FlightReport, HeightView, SeriesView, TrackView};
pub use storage::TableStore;

fn from_json<T: DeserializeOwned>(what: &str, json_in: &str) -> Result<T, String> {
    let mut de = serde_json::Deserializer::from_str(json_in);
    serde_path_to_error::deserialize(&mut de).map_err(|e| format!("parse error ({what}) at {}: {}", e.path(), e.inner()))
}

fn refine_samples_json<R: Reading + Serialize + DeserializeOwned>(
    samples_json: &str,
    params: &RefineParams,
) -> Result<String, String> {
    let samples: Vec<R> = from_json(R::KIND.label(), samples_json)?;
    let mut log = RunLog::new("json", R::KIND);
    let refined = refine(&samples, params, &mut log);
    let stats = log.finish();
    Ok(json!({ "kind": R::KIND, "samples": refined, "stats": stats }).to_string())
}

/// Refine a JSON array of samples of one kind.
///
/// `params_json` falls back to the per-kind defaults. Output:
/// `{ "kind", "samples", "stats" }`.
pub fn refine_json(kind: &str, samples_json: &str, params_json: Option<&str>) -> Result<String, String> {
    let kind = SensorKind::from_label(kind).ok_or_else(|| format!("unknown sensor kind `{kind}`"))?;
    let params = match params_json {
        Some(p) => from_json("RefineParams", p)?,
        None => RefineParams::for_kind(kind),
    };

    match kind {
        SensorKind::Bmp280 => refine_samples_json::<Bmp280>(samples_json, &params),
        SensorKind::Dht11 => refine_samples_json::<Dht11>(samples_json, &params),
        SensorKind::Gps => refine_samples_json::<Gps>(samples_json, &params),
        SensorKind::Mpu6050 => refine_samples_json::<Mpu6050>(samples_json, &params),
    }
}

/// Wind estimate for a JSON array of GPS samples. `null` when no pair is usable.
pub fn wind_estimate_json(track_json: &str, profile_json: Option<&str>) -> Result<String, String> {
    let track: Vec<Gps> = from_json("GPS track", track_json)?;
    let profile = match profile_json {
        Some(p) => from_json("ProbeProfile", p)?,
        None => ProbeProfile::default(),
    };
    serde_json::to_string(&wind_estimate(&track, &profile)).map_err(|e| e.to_string())
}

/// Parse raw telemetry text and refine it with `config_json` (defaults when None).
/// Output is the refined flight as JSON.
pub fn analyze_raw_json(raw_text: &str, config_json: Option<&str>) -> Result<String, String> {
    let config: AnalysisConfig = match config_json {
        Some(c) => from_json("AnalysisConfig", c)?,
        None => AnalysisConfig::default(),
    };
    let flight = parse::parse_lines(raw_text.lines(), None);
    let refined = refine_flight(&flight, &config, None);
    serde_json::to_string(&refined).map_err(|e| e.to_string())
}
