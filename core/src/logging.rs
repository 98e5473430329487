use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::RefineError;
use crate::metrics::Metrics;
use crate::models::{Field, SensorKind};

pub const LOG_TARGET: &str = "cansat::refine";

/// Why a field value was flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutlierReason {
    /// Jump from the predecessor larger than the step threshold.
    Step,
    /// Outside the whole-sequence IQR fence.
    Iqr,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub samples: usize,
    pub gaps: usize,
    pub outliers: usize,
    pub errors: usize,
}

/// Logging context for one refinement batch (one flight, one sensor kind).
///
/// Created once per run and handed to the refinement entry points; every
/// event goes out under [`LOG_TARGET`] prefixed with `flight/kind`.
pub struct RunLog<'a> {
    flight: &'a str,
    kind: SensorKind,
    stats: RunStats,
    metrics: Option<&'a Metrics>,
}

impl<'a> RunLog<'a> {
    pub fn new(flight: &'a str, kind: SensorKind) -> Self {
        debug!(target: LOG_TARGET, "[{flight}/{kind}] refinement run started");
        Self {
            flight,
            kind,
            stats: RunStats::default(),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: &'a Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn sample(&mut self) {
        self.stats.samples += 1;
    }

    pub fn gap(&mut self, time: i64, dt: u64, threshold: f64) {
        self.stats.gaps += 1;
        debug!(
            target: LOG_TARGET,
            "[{}/{}] likely data loss before t={time} (dt={dt} > {threshold})",
            self.flight, self.kind
        );
        if let Some(m) = self.metrics {
            m.gap_flagged(self.kind);
        }
    }

    pub fn outlier(&mut self, time: i64, field: &Field, value: f64, reason: OutlierReason) {
        self.stats.outliers += 1;
        debug!(
            target: LOG_TARGET,
            "[{}/{}] {} outlier at t={time}: {value} ({reason:?})",
            self.flight, self.kind, field.name
        );
        if let Some(m) = self.metrics {
            m.outlier_flagged(self.kind, field.name);
        }
    }

    pub fn warn(&self, message: &str) {
        warn!(target: LOG_TARGET, "[{}/{}] {message}", self.flight, self.kind);
    }

    pub fn error(&mut self, err: &RefineError) {
        self.stats.errors += 1;
        error!(target: LOG_TARGET, "[{}/{}] {err}", self.flight, self.kind);
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// Close the run and log its summary.
    pub fn finish(self) -> RunStats {
        info!(
            target: LOG_TARGET,
            "[{}/{}] {} samples, {} gaps, {} outlier values, {} errors",
            self.flight, self.kind, self.stats.samples, self.stats.gaps, self.stats.outliers, self.stats.errors
        );
        self.stats
    }
}
