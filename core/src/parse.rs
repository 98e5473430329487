// core/src/parse.rs
//
// Raw line format, whitespace separated:
//   <LABEL> <field1> ... <fieldN> <timestamp>
// e.g. `BMP280 21.4 101325.0 112.5 48210`. A leading `ERROR` marks a
// failed reading on the probe side.
use std::path::Path;

use log::{debug, error, info};

use crate::error::ParseError;
use crate::metrics::Metrics;
use crate::models::{Bmp280, Dht11, Flight, Gps, Mpu6050, Reading, Record, SensorKind};

pub const ERROR_LABEL: &str = "ERROR";

fn parse_time(kind: SensorKind, token: &str) -> Result<i64, ParseError> {
    if let Ok(t) = token.parse::<i64>() {
        return Ok(t);
    }
    // tolerate "1200.0" from loggers that print every number as float
    match token.parse::<f64>() {
        Ok(t) if t.is_finite() && t.fract() == 0.0 && t.abs() < i64::MAX as f64 => Ok(t as i64),
        _ => Err(ParseError::Number {
            kind,
            token: token.to_string(),
        }),
    }
}

fn build<R: Reading>(time: i64, values: &[f64]) -> Result<R, ParseError> {
    R::from_values(time, values).ok_or(ParseError::TokenCount {
        kind: R::KIND,
        expected: R::KIND.fields().len() + 2,
        got: values.len() + 2,
    })
}

/// Parse one raw telemetry line.
pub fn parse_line(line: &str) -> Result<Record, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&label, rest)) = tokens.split_first() else {
        return Err(ParseError::Empty);
    };

    if label.eq_ignore_ascii_case(ERROR_LABEL) {
        return Err(ParseError::SensorError(rest.join(" ")));
    }
    let kind = SensorKind::from_label(label).ok_or_else(|| ParseError::UnknownSensor(label.to_string()))?;

    let expected = kind.fields().len() + 2;
    if tokens.len() != expected {
        return Err(ParseError::TokenCount {
            kind,
            expected,
            got: tokens.len(),
        });
    }

    let (value_tokens, time_token) = rest.split_at(rest.len() - 1);
    let values = value_tokens
        .iter()
        .map(|t| {
            t.parse::<f64>().map_err(|_| ParseError::Number {
                kind,
                token: t.to_string(),
            })
        })
        .collect::<Result<Vec<f64>, _>>()?;
    let time = parse_time(kind, time_token[0])?;

    Ok(match kind {
        SensorKind::Bmp280 => Record::Bmp280(build::<Bmp280>(time, &values)?),
        SensorKind::Dht11 => Record::Dht11(build::<Dht11>(time, &values)?),
        SensorKind::Gps => Record::Gps(build::<Gps>(time, &values)?),
        SensorKind::Mpu6050 => Record::Mpu6050(build::<Mpu6050>(time, &values)?),
    })
}

/// Render a record back into its raw line form.
pub fn format_line(record: &Record) -> String {
    let mut parts = vec![record.kind().label().to_string()];
    parts.extend(record.values().iter().map(|v| v.to_string()));
    parts.push(record.time().to_string());
    parts.join(" ")
}

fn skip_reason(err: &ParseError) -> &'static str {
    match err {
        ParseError::Empty => "empty",
        ParseError::SensorError(_) => "sensor_error",
        ParseError::UnknownSensor(_) => "unknown_sensor",
        ParseError::TokenCount { .. } => "token_count",
        ParseError::Number { .. } => "number",
    }
}

/// Split raw lines into per-kind sequences. Malformed lines are skipped.
pub fn parse_lines<I, S>(lines: I, metrics: Option<&Metrics>) -> Flight
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut flight = Flight::default();
    let mut skipped = 0usize;

    for (n, line) in lines.into_iter().enumerate() {
        let line = line.as_ref();
        match parse_line(line) {
            Ok(record) => {
                if let Some(m) = metrics {
                    m.line_parsed(record.kind());
                }
                flight.push(record);
            }
            Err(ParseError::Empty) => {}
            Err(e) => {
                skipped += 1;
                debug!("line {}: skipped ({e})", n + 1);
                if let Some(m) = metrics {
                    m.line_skipped(e.kind(), skip_reason(&e));
                }
            }
        }
    }

    info!("parsed {} samples, skipped {} lines", flight.total(), skipped);
    flight
}

/// Read and parse a raw telemetry file. An unreadable file yields an empty flight.
pub fn read_raw_file(path: impl AsRef<Path>, metrics: Option<&Metrics>) -> Flight {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
        Ok(text) => parse_lines(text.lines(), metrics),
        Err(e) => {
            error!("cannot read raw telemetry {}: {e}", path.display());
            Flight::default()
        }
    }
}

/// Write a flight out as raw lines, kinds grouped in label order.
pub fn write_raw_file(flight: &Flight, path: impl AsRef<Path>) -> std::io::Result<()> {
    let mut out = String::new();
    let records = flight
        .bmp280
        .iter()
        .cloned()
        .map(Record::Bmp280)
        .chain(flight.dht11.iter().cloned().map(Record::Dht11))
        .chain(flight.gps.iter().cloned().map(Record::Gps))
        .chain(flight.mpu6050.iter().cloned().map(Record::Mpu6050));
    for r in records {
        out.push_str(&format_line(&r));
        out.push('\n');
    }
    std::fs::write(path, out)
}
