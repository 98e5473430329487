// core/src/refine.rs
//
// Gap and outlier flagging over one sensor kind's sequence.
//
// Policy: flag-and-keep. Samples are never dropped; every measured field
// gets its own outlier flag. Two tests mark a field:
//   * step test against the immediate predecessor (skipped across a gap)
//   * whole-sequence IQR fence on that field's values
// The first sample of a sequence is never flagged.
use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::error::RefineError;
use crate::logging::{OutlierReason, RunLog, RunStats};
use crate::metrics::Metrics;
use crate::models::{Bmp280, Flight, Reading, SensorKind};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefineParams {
    pub outlier_iqr_multiplier: f64,
    pub outlier_step_threshold: f64,
    /// Absolute inter-sample time delta above which data loss is assumed.
    pub lacking_data_threshold: i64,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            outlier_iqr_multiplier: 1.5,
            outlier_step_threshold: 10.0,
            lacking_data_threshold: 100,
        }
    }
}

impl RefineParams {
    pub fn new(outlier_iqr_multiplier: f64, outlier_step_threshold: f64, lacking_data_threshold: i64) -> Self {
        Self {
            outlier_iqr_multiplier,
            outlier_step_threshold,
            lacking_data_threshold,
        }
    }

    /// Defaults per kind, from the probe's reporting cadence.
    pub fn for_kind(kind: SensorKind) -> Self {
        match kind {
            SensorKind::Bmp280 => Self::new(1.5, 18.0, 100),
            SensorKind::Gps => Self::new(1.5, 10.0, 500),
            SensorKind::Dht11 | SensorKind::Mpu6050 => Self::default(),
        }
    }
}

/// How a bulk pass decides that data is missing before a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum GapPolicy {
    /// Δt above this value.
    Absolute(i64),
    /// Δt above `factor × mean(Δt)` over the whole sequence.
    MeanScaled(f64),
}

impl Default for GapPolicy {
    fn default() -> Self {
        GapPolicy::MeanScaled(10.0)
    }
}

impl GapPolicy {
    /// Resolved threshold for this sequence of timestamps. None below two samples.
    pub fn threshold(&self, times: &[i64]) -> Option<f64> {
        if times.len() < 2 {
            return None;
        }
        match *self {
            GapPolicy::Absolute(t) => Some(t as f64),
            GapPolicy::MeanScaled(factor) => {
                let sum: f64 = times.windows(2).map(|w| time_delta(w[0], w[1]) as f64).sum();
                let mean = sum / (times.len() - 1) as f64;
                Some(factor * mean)
            }
        }
    }
}

/// `b - a` without overflow.
pub(crate) fn time_delta(a: i64, b: i64) -> i128 {
    b as i128 - a as i128
}

/// Quartile fence for one field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Inclusive: a constant series keeps all of its values.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.lower && x <= self.upper
    }

    /// Strict interior, used by the bulk field pass. A value on the fence is dropped.
    pub fn strictly_contains(&self, x: f64) -> bool {
        x > self.lower && x < self.upper
    }
}

/// Linear-interpolated percentile (`p` in 0..=100) of an ascending slice.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() || !p.is_finite() {
        return None;
    }
    let p = p.clamp(0.0, 100.0);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// IQR fence over the finite values, `[q1 - m·iqr, q3 + m·iqr]`.
pub fn iqr_bounds(values: &[f64], multiplier: f64) -> Option<IqrBounds> {
    let mut xs: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if xs.is_empty() {
        return None;
    }
    xs.sort_by_key(|v| OrderedFloat(*v));

    let q1 = percentile(&xs, 25.0)?;
    let q3 = percentile(&xs, 75.0)?;
    let iqr = q3 - q1;
    Some(IqrBounds {
        q1,
        q3,
        iqr,
        lower: q1 - multiplier * iqr,
        upper: q3 + multiplier * iqr,
    })
}

/// One fence per field of `R`, None where a field has no finite values.
pub fn field_bounds<R: Reading>(seq: &[R], multiplier: f64) -> Vec<Option<IqrBounds>> {
    (0..R::KIND.fields().len())
        .map(|i| {
            let values: Vec<f64> = seq.iter().filter_map(|s| s.value(i)).collect();
            iqr_bounds(&values, multiplier)
        })
        .collect()
}

/// Flag one sample against its predecessor and the per-field fences.
///
/// Without a predecessor nothing is touched and the failure is logged.
pub fn refine_step<R: Reading>(
    current: &mut R,
    previous: Option<&R>,
    params: &RefineParams,
    bounds: &[Option<IqrBounds>],
    log: &mut RunLog<'_>,
) -> Result<(), RefineError> {
    let Some(prev) = previous else {
        let err = RefineError::MissingPredecessor {
            kind: R::KIND,
            time: current.time(),
        };
        log.error(&err);
        return Err(err);
    };

    log.sample();
    current.clear_flags();

    if current.time() < prev.time() {
        log.warn(&format!("time goes backwards at t={} (prev t={})", current.time(), prev.time()));
    }

    let dt = current.time().abs_diff(prev.time());
    if dt as f64 > params.lacking_data_threshold as f64 {
        current.set_missing_data(true);
        log.gap(current.time(), dt, params.lacking_data_threshold as f64);
    }

    let step = params.outlier_step_threshold;
    for (i, field) in R::KIND.fields().iter().enumerate() {
        let Some(v) = current.value(i) else {
            continue;
        };

        let mut reason = None;
        if !current.missing_data() {
            if let Some(p) = prev.value(i) {
                if v < p - step || v > p + step {
                    reason = Some(OutlierReason::Step);
                }
            }
        }
        if reason.is_none() {
            if let Some(Some(b)) = bounds.get(i) {
                if !b.contains(v) {
                    reason = Some(OutlierReason::Iqr);
                }
            }
        }

        if let Some(reason) = reason {
            current.outliers_mut()[i] = true;
            log.outlier(current.time(), field, v, reason);
        }
    }

    Ok(())
}

/// Refined copy of `seq`: gap and outlier flags set, values untouched.
///
/// Strictly sequential; each sample is compared with its immediate predecessor.
pub fn refine<R: Reading>(seq: &[R], params: &RefineParams, log: &mut RunLog<'_>) -> Vec<R> {
    let bounds = field_bounds(seq, params.outlier_iqr_multiplier);
    refine_with_bounds(seq, |_| (params, bounds.as_slice()), log)
}

fn refine_with_bounds<'p, R, F>(seq: &[R], mut select: F, log: &mut RunLog<'_>) -> Vec<R>
where
    R: Reading,
    F: FnMut(usize) -> (&'p RefineParams, &'p [Option<IqrBounds>]),
{
    let mut out = seq.to_vec();
    if let Some(first) = out.first_mut() {
        first.clear_flags();
        log.sample();
    }

    for i in 1..out.len() {
        let (params, bounds) = select(i);
        let (head, tail) = out.split_at_mut(i);
        if let Err(e) = refine_step(&mut tail[0], head.last(), params, bounds, log) {
            debug_assert!(false, "predecessor exists for i >= 1: {e}");
        }
    }

    out
}

/// Index of the first sample at maximum height.
pub fn apex_index(seq: &[Bmp280]) -> Option<usize> {
    seq.iter()
        .enumerate()
        .filter(|(_, s)| s.height.is_finite())
        .max_by_key(|(i, s)| (OrderedFloat(s.height), std::cmp::Reverse(*i)))
        .map(|(i, _)| i)
}

/// Refine a barometric sequence with separate ascent and descent params.
///
/// The apex sample opens the descent phase. Each phase gets its own IQR fences.
pub fn refine_by_phase(
    seq: &[Bmp280],
    ascent: &RefineParams,
    descent: &RefineParams,
    log: &mut RunLog<'_>,
) -> Vec<Bmp280> {
    let Some(apex) = apex_index(seq) else {
        return refine(seq, descent, log);
    };

    let ascent_bounds = field_bounds(&seq[..apex], ascent.outlier_iqr_multiplier);
    let descent_bounds = field_bounds(&seq[apex..], descent.outlier_iqr_multiplier);

    refine_with_bounds(
        seq,
        |i| {
            if i < apex {
                (ascent, ascent_bounds.as_slice())
            } else {
                (descent, descent_bounds.as_slice())
            }
        },
        log,
    )
}

/// Bulk single-field refinement for analysis views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRefinement {
    pub kind: SensorKind,
    pub field: usize,
    pub values: Vec<f64>,
    /// True where the value is absent or not strictly inside the fence.
    pub outliers: Vec<bool>,
    /// Indices `i` with data loss between `i - 1` and `i`.
    pub lacking_data_indices: Vec<usize>,
    pub bounds: Option<IqrBounds>,
}

impl FieldRefinement {
    /// Values that survive the fence, in sequence order.
    pub fn retained(&self) -> Vec<f64> {
        self.values
            .iter()
            .zip(&self.outliers)
            .filter(|(_, out)| !**out)
            .map(|(v, _)| *v)
            .collect()
    }
}

pub fn refine_field<R: Reading>(
    seq: &[R],
    field: usize,
    outlier_iqr_multiplier: f64,
    gap_policy: GapPolicy,
) -> FieldRefinement {
    let values: Vec<f64> = seq.iter().map(|s| s.raw_value(field)).collect();
    let times: Vec<i64> = seq.iter().map(|s| s.time()).collect();

    let bounds = iqr_bounds(&values, outlier_iqr_multiplier);
    let outliers = values
        .iter()
        .map(|v| match bounds {
            Some(b) => !v.is_finite() || !b.strictly_contains(*v),
            None => true,
        })
        .collect();

    let lacking_data_indices = match gap_policy.threshold(&times) {
        Some(threshold) => (1..times.len())
            .filter(|&i| time_delta(times[i - 1], times[i]) as f64 > threshold)
            .collect(),
        None => Vec::new(),
    };

    FieldRefinement {
        kind: R::KIND,
        field,
        values,
        outliers,
        lacking_data_indices,
        bounds,
    }
}

/// Refined flight plus one stats entry per sensor kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefinedFlight {
    pub flight: Flight,
    pub stats: BTreeMap<SensorKind, RunStats>,
}

/// Refine every kind of a flight, one `RunLog` per kind.
pub fn refine_flight(flight: &Flight, config: &AnalysisConfig, metrics: Option<&Metrics>) -> RefinedFlight {
    let label = config.flight_label.as_str();
    let mut stats = BTreeMap::new();
    let start = |kind| {
        let log = RunLog::new(label, kind);
        match metrics {
            Some(m) => log.with_metrics(m),
            None => log,
        }
    };

    let mut log = start(SensorKind::Bmp280);
    let bmp280 = if config.split_bmp280_phases {
        refine_by_phase(&flight.bmp280, &config.bmp280_ascent, &config.bmp280_descent, &mut log)
    } else {
        refine(&flight.bmp280, &config.bmp280_ascent, &mut log)
    };
    stats.insert(SensorKind::Bmp280, log.finish());

    let mut log = start(SensorKind::Dht11);
    let dht11 = refine(&flight.dht11, &config.dht11, &mut log);
    stats.insert(SensorKind::Dht11, log.finish());

    let mut log = start(SensorKind::Gps);
    let gps = refine(&flight.gps, &config.gps, &mut log);
    stats.insert(SensorKind::Gps, log.finish());

    let mut log = start(SensorKind::Mpu6050);
    let mpu6050 = refine(&flight.mpu6050, &config.mpu6050, &mut log);
    stats.insert(SensorKind::Mpu6050, log.finish());

    RefinedFlight {
        flight: Flight {
            bmp280,
            dht11,
            gps,
            mpu6050,
        },
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_matches_linear_interpolation() {
        let xs = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        assert!((percentile(&xs, 25.0).unwrap() - 2.25).abs() < 1e-12);
        assert!((percentile(&xs, 75.0).unwrap() - 4.75).abs() < 1e-12);
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn apex_is_first_maximum() {
        let seq = vec![
            Bmp280::new(0, 20.0, 1000.0, 10.0),
            Bmp280::new(1, 20.0, 1000.0, 50.0),
            Bmp280::new(2, 20.0, 1000.0, 50.0),
            Bmp280::new(3, 20.0, 1000.0, 5.0),
        ];
        assert_eq!(apex_index(&seq), Some(1));
        assert_eq!(apex_index(&[]), None);
    }

    #[test]
    fn mean_scaled_gap_threshold() {
        let times = [0, 10, 20, 30];
        assert_eq!(GapPolicy::MeanScaled(2.0).threshold(&times), Some(20.0));
        assert_eq!(GapPolicy::Absolute(7).threshold(&times), Some(7.0));
        assert_eq!(GapPolicy::Absolute(7).threshold(&[0]), None);
    }
}
