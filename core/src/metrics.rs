use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use crate::models::SensorKind;

/// Run counters for one analysis process, labelled by sensor kind.
pub struct Metrics {
    registry: Registry,
    lines_parsed: IntCounterVec,
    lines_skipped: IntCounterVec,
    gaps_flagged: IntCounterVec,
    outliers_flagged: IntCounterVec,
    rows_written: IntCounterVec,
}

fn counter(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> prometheus::Result<IntCounterVec> {
    let c = IntCounterVec::new(Opts::new(name, help).namespace("cansat"), labels)?;
    registry.register(Box::new(c.clone()))?;
    Ok(c)
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();
        Ok(Self {
            lines_parsed: counter(&registry, "lines_parsed_total", "Raw lines turned into samples", &["kind"])?,
            lines_skipped: counter(&registry, "lines_skipped_total", "Raw lines discarded", &["kind", "reason"])?,
            gaps_flagged: counter(&registry, "gaps_flagged_total", "Samples flagged with missing data before them", &["kind"])?,
            outliers_flagged: counter(&registry, "outliers_flagged_total", "Field values flagged as outliers", &["kind", "field"])?,
            rows_written: counter(&registry, "rows_written_total", "Rows written to the table store", &["kind"])?,
            registry,
        })
    }

    /// Process-wide instance used by the CLI and the parse/store helpers.
    pub fn global() -> &'static Metrics {
        &GLOBAL
    }

    pub fn line_parsed(&self, kind: SensorKind) {
        self.lines_parsed.with_label_values(&[kind.label()]).inc();
    }

    /// `kind` is None when the line carried no recognised sensor label.
    pub fn line_skipped(&self, kind: Option<SensorKind>, reason: &str) {
        let kind = kind.map_or("unknown", SensorKind::label);
        self.lines_skipped.with_label_values(&[kind, reason]).inc();
    }

    pub fn gap_flagged(&self, kind: SensorKind) {
        self.gaps_flagged.with_label_values(&[kind.label()]).inc();
    }

    pub fn outlier_flagged(&self, kind: SensorKind, field: &str) {
        self.outliers_flagged.with_label_values(&[kind.label(), field]).inc();
    }

    pub fn rows_written(&self, kind: SensorKind, n: usize) {
        self.rows_written.with_label_values(&[kind.label()]).inc_by(n as u64);
    }

    pub fn gaps_total(&self, kind: SensorKind) -> u64 {
        self.gaps_flagged.with_label_values(&[kind.label()]).get()
    }

    pub fn skipped_total(&self, kind: Option<SensorKind>, reason: &str) -> u64 {
        let kind = kind.map_or("unknown", SensorKind::label);
        self.lines_skipped.with_label_values(&[kind, reason]).get()
    }

    pub fn parsed_total(&self, kind: SensorKind) -> u64 {
        self.lines_parsed.with_label_values(&[kind.label()]).get()
    }

    /// Prometheus text exposition of every counter.
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            log::warn!("metrics encoding failed: {e}");
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

static GLOBAL: Lazy<Metrics> =
    Lazy::new(|| Metrics::new().expect("static metric definitions are valid"));
