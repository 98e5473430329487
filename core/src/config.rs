// core/src/config.rs
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::derived::ProbeProfile;
use crate::error::ConfigError;
use crate::models::SensorKind;
use crate::refine::{GapPolicy, RefineParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    /// Raw telemetry text, one reading per line.
    pub raw: PathBuf,
    /// Directory with one table per sensor kind.
    pub store: PathBuf,
    /// Report and view exports.
    pub out: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            raw: PathBuf::from("datas/raw_data.txt"),
            store: PathBuf::from("datas/tables"),
            out: PathBuf::from("graphs"),
        }
    }
}

/// Everything one analysis run needs besides the data itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub flight_label: String,
    pub bmp280_ascent: RefineParams,
    pub bmp280_descent: RefineParams,
    /// Refine BMP280 ascent and descent separately (split at max height).
    pub split_bmp280_phases: bool,
    pub dht11: RefineParams,
    pub gps: RefineParams,
    pub mpu6050: RefineParams,
    /// Gap policy for the bulk single-field views.
    pub bulk_gap_policy: GapPolicy,
    pub probe: ProbeProfile,
    /// |probe − reference| above this (°C) is reported as significant.
    pub comparison_threshold_c: f64,
    /// Spacing given to reference samples when re-based onto probe time.
    pub reference_step: i64,
    /// Grid points per axis of the exported wind field.
    pub wind_grid: usize,
    pub paths: DataPaths,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            flight_label: "flight".to_string(),
            bmp280_ascent: RefineParams::new(1.5, 18.0, 100),
            bmp280_descent: RefineParams::new(1.2, 11.0, 100),
            split_bmp280_phases: true,
            dht11: RefineParams::for_kind(SensorKind::Dht11),
            gps: RefineParams::for_kind(SensorKind::Gps),
            mpu6050: RefineParams::for_kind(SensorKind::Mpu6050),
            bulk_gap_policy: GapPolicy::default(),
            probe: ProbeProfile::default(),
            comparison_threshold_c: 3.0,
            reference_step: 1000,
            wind_grid: 10,
            paths: DataPaths::default(),
        }
    }
}

impl AnalysisConfig {
    /// Single-pass params for a kind (BMP280 uses its ascent params).
    pub fn params_for(&self, kind: SensorKind) -> &RefineParams {
        match kind {
            SensorKind::Bmp280 => &self.bmp280_ascent,
            SensorKind::Dht11 => &self.dht11,
            SensorKind::Gps => &self.gps,
            SensorKind::Mpu6050 => &self.mpu6050,
        }
    }
}

/// Read config from disk (JSON). A missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<AnalysisConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        warn!("no config at {}, using defaults", path.display());
        return Ok(AnalysisConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let de = &mut serde_json::Deserializer::from_str(&contents);
    let config: AnalysisConfig = serde_path_to_error::deserialize(de).map_err(|e| ConfigError::Json {
        path: path.to_path_buf(),
        at: e.path().to_string(),
        message: e.inner().to_string(),
    })?;

    info!("config loaded from {} (flight={})", path.display(), config.flight_label);
    Ok(config)
}

/// Write config to disk as pretty JSON.
pub fn save_config(config: &AnalysisConfig, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!("config saved to {}", path.display());
    Ok(())
}
