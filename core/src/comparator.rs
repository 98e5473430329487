// core/src/comparator.rs
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, TimeZone, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use ureq::Agent;

use crate::error::ReferenceError;
use crate::models::{Bmp280, Reading};

/// Independent temperature series (forecast or ground station).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSeries {
    pub temperatures: Vec<f64>,
    pub times: Vec<i64>,
}

impl ReferenceSeries {
    pub fn from_pairs(pairs: &[(i64, f64)]) -> Self {
        Self {
            times: pairs.iter().map(|p| p.0).collect(),
            temperatures: pairs.iter().map(|p| p.1).collect(),
        }
    }

    /// (time, temperature) pairs, truncated to the shorter list.
    pub fn pairs(&self) -> Vec<(i64, f64)> {
        self.times
            .iter()
            .copied()
            .zip(self.temperatures.iter().copied())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.temperatures.is_empty()
    }

    /// Move the series onto probe time: first entry at `start`, then every `step`.
    pub fn rebase(&mut self, start: i64, step: i64) {
        self.times = (0..self.temperatures.len() as i64)
            .map(|i| start.saturating_add(i.saturating_mul(step)))
            .collect();
    }
}

pub trait ReferenceProvider {
    fn reference_series(&self) -> Result<ReferenceSeries, ReferenceError>;
}

/// Fixed series (tests, offline runs).
#[derive(Debug, Clone, Default)]
pub struct StaticReference {
    pub series: ReferenceSeries,
}

impl ReferenceProvider for StaticReference {
    fn reference_series(&self) -> Result<ReferenceSeries, ReferenceError> {
        if self.series.is_empty() {
            return Err(ReferenceError::Empty);
        }
        Ok(self.series.clone())
    }
}

/// Series saved as JSON `{ "temperatures": [...], "times": [...] }`.
#[derive(Debug, Clone)]
pub struct JsonFileReference {
    pub path: PathBuf,
}

impl JsonFileReference {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ReferenceProvider for JsonFileReference {
    fn reference_series(&self) -> Result<ReferenceSeries, ReferenceError> {
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| ReferenceError::Payload(format!("{}: {e}", self.path.display())))?;
        let series: ReferenceSeries =
            serde_json::from_str(&text).map_err(|e| ReferenceError::Payload(e.to_string()))?;
        if series.is_empty() {
            return Err(ReferenceError::Empty);
        }
        Ok(series)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OpenMeteoHourlyResp {
    hourly: Hourly,
}

#[derive(Debug, Clone, Deserialize)]
struct Hourly {
    time: Vec<String>,
    #[serde(alias = "temperature")]
    temperature_2m: Vec<Option<f64>>,
}

/// Open-Meteo hourly forecast, blocking (ureq).
pub struct OpenMeteoReference {
    agent: Agent,
    pub lat: f64,
    pub lon: f64,
}

impl OpenMeteoReference {
    pub fn new(lat: f64, lon: f64) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(std::time::Duration::from_secs(10))
            .build();
        Self { agent, lat, lon }
    }
}

fn parse_hour(s: &str) -> Option<i64> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").ok()?;
    Some(Utc.from_utc_datetime(&naive).timestamp())
}

impl ReferenceProvider for OpenMeteoReference {
    fn reference_series(&self) -> Result<ReferenceSeries, ReferenceError> {
        let url = format!(
            "https://api.open-meteo.com/v1/forecast?latitude={}&longitude={}&hourly=temperature_2m&forecast_days=1",
            self.lat, self.lon
        );

        let resp = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| ReferenceError::Http(e.to_string()))?;
        let body: OpenMeteoHourlyResp = resp
            .into_json()
            .map_err(|e| ReferenceError::Payload(e.to_string()))?;

        let mut series = ReferenceSeries::default();
        for (t, temp) in body.hourly.time.iter().zip(body.hourly.temperature_2m) {
            if let (Some(t), Some(temp)) = (parse_hour(t), temp) {
                series.times.push(t);
                series.temperatures.push(temp);
            }
        }

        info!(
            "[OpenMeteo] lat={:.3}, lon={:.3} => {} hourly temperatures",
            self.lat,
            self.lon,
            series.temperatures.len()
        );

        if series.is_empty() {
            return Err(ReferenceError::Empty);
        }
        Ok(series)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub probe_time: i64,
    pub probe_temperature: f64,
    pub reference_temperature: f64,
    /// probe − reference, °C
    pub difference: f64,
    pub significant: bool,
}

/// Last clean probe temperature against the first reference temperature.
pub fn compare(bmp: &[Bmp280], reference: &ReferenceSeries, threshold_c: f64) -> Option<Comparison> {
    let last = bmp
        .iter()
        .rev()
        .find(|s| !s.is_field_outlier(0) && s.temperature.is_finite())?;
    let first_ref = reference.temperatures.iter().copied().find(|t| t.is_finite())?;

    let difference = last.temperature - first_ref;
    Some(Comparison {
        probe_time: last.time,
        probe_temperature: last.temperature,
        reference_temperature: first_ref,
        difference,
        significant: difference.abs() > threshold_c,
    })
}
