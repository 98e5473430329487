// core/src/error.rs
use std::path::PathBuf;

use thiserror::Error;

use crate::models::SensorKind;

/// A raw telemetry line that could not be turned into a record.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error("empty line")]
    Empty,

    #[error("sensor reported an error reading: {0}")]
    SensorError(String),

    #[error("unknown sensor label `{0}`")]
    UnknownSensor(String),

    #[error("{kind:?}: expected {expected} tokens, got {got}")]
    TokenCount {
        kind: SensorKind,
        expected: usize,
        got: usize,
    },

    #[error("{kind:?}: cannot parse `{token}` as a number")]
    Number { kind: SensorKind, token: String },
}

impl ParseError {
    /// Sensor kind of the rejected line, when its label (or the kind named
    /// after `ERROR`) was recognised.
    pub fn kind(&self) -> Option<SensorKind> {
        match self {
            ParseError::TokenCount { kind, .. } | ParseError::Number { kind, .. } => Some(*kind),
            ParseError::SensorError(rest) => rest.split_whitespace().next().and_then(SensorKind::from_label),
            ParseError::Empty | ParseError::UnknownSensor(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("table I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("table {table} has unexpected header: {found:?}")]
    Schema { table: String, found: Vec<String> },

    #[error("table {table}, row {row}: {reason}")]
    Row {
        table: String,
        row: usize,
        reason: String,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path} at `{at}`: {message}")]
    Json {
        path: PathBuf,
        at: String,
        message: String,
    },

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RefineError {
    #[error("{kind:?} sample at t={time} has no predecessor")]
    MissingPredecessor { kind: SensorKind, time: i64 },
}

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("reference request failed: {0}")]
    Http(String),

    #[error("reference payload invalid: {0}")]
    Payload(String),

    #[error("reference series is empty")]
    Empty,
}
