// core/src/storage.rs
//
// One table per sensor kind, stored as `<LABEL>.csv` inside a directory.
// Columns come from `SensorKind::columns()`; booleans are written as 0/1.
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::error::StoreError;
use crate::models::{Reading, SensorKind};

#[derive(Debug, Clone)]
pub struct TableStore {
    dir: PathBuf,
}

fn flag(b: bool) -> &'static str {
    if b {
        "1"
    } else {
        "0"
    }
}

fn parse_flag(table: &str, row: usize, s: &str) -> Result<bool, StoreError> {
    match s.trim() {
        "1" => Ok(true),
        "0" => Ok(false),
        other => Err(StoreError::Row {
            table: table.to_string(),
            row,
            reason: format!("expected 0/1 flag, got `{other}`"),
        }),
    }
}

fn encode_row<R: Reading>(id: usize, sample: &R) -> Vec<String> {
    let mut row = Vec::with_capacity(R::KIND.columns().len());
    row.push(id.to_string());
    row.push(sample.time().to_string());
    row.extend(sample.values().iter().map(|v| v.to_string()));
    row.push(flag(sample.missing_data()).to_string());
    row.extend(sample.outliers().iter().map(|b| flag(*b).to_string()));
    row
}

fn decode_row<R: Reading>(row_no: usize, record: &csv::StringRecord) -> Result<R, StoreError> {
    let kind = R::KIND;
    let table = kind.label();
    let n = kind.fields().len();
    let row_err = |reason: String| StoreError::Row {
        table: table.to_string(),
        row: row_no,
        reason,
    };

    if record.len() != 3 + 2 * n {
        return Err(row_err(format!("expected {} columns, got {}", 3 + 2 * n, record.len())));
    }

    let time = record[1]
        .trim()
        .parse::<i64>()
        .map_err(|e| row_err(format!("Time: {e}")))?;
    let values = (0..n)
        .map(|i| {
            record[2 + i]
                .trim()
                .parse::<f64>()
                .map_err(|e| row_err(format!("{}: {e}", kind.fields()[i].column)))
        })
        .collect::<Result<Vec<f64>, _>>()?;

    let mut sample = R::from_values(time, &values).ok_or_else(|| row_err("field count mismatch".to_string()))?;
    sample.set_missing_data(parse_flag(table, row_no, &record[2 + n])?);
    for i in 0..n {
        sample.outliers_mut()[i] = parse_flag(table, row_no, &record[3 + n + i])?;
    }
    Ok(sample)
}

impl TableStore {
    /// Open (and create if needed) a store directory without touching its tables.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// Open a store and make sure every table exists. `replace` empties them first.
    pub fn create(dir: impl AsRef<Path>, replace: bool) -> Result<Self, StoreError> {
        let store = Self::open(dir)?;
        for kind in SensorKind::ALL {
            let path = store.table_path(kind);
            if replace || !path.exists() {
                store.write_header(kind)?;
            }
        }
        info!("table store ready at {} (replace={replace})", store.dir.display());
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn table_path(&self, kind: SensorKind) -> PathBuf {
        self.dir.join(format!("{}.csv", kind.label()))
    }

    fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> StoreError + '_ {
        move |source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    fn write_header(&self, kind: SensorKind) -> Result<(), StoreError> {
        let path = self.table_path(kind);
        let mut wtr = csv::Writer::from_path(&path).map_err(Self::csv_err(&path))?;
        wtr.write_record(kind.columns()).map_err(Self::csv_err(&path))?;
        wtr.flush().map_err(Self::io_err(&path))
    }

    /// Number of rows in a table; zero when the table does not exist.
    pub fn count(&self, kind: SensorKind) -> Result<usize, StoreError> {
        let path = self.table_path(kind);
        if !path.exists() {
            return Ok(0);
        }
        let mut rdr = csv::Reader::from_path(&path).map_err(Self::csv_err(&path))?;
        let mut n = 0;
        for rec in rdr.records() {
            rec.map_err(Self::csv_err(&path))?;
            n += 1;
        }
        Ok(n)
    }

    /// Append a batch. Rows are encoded up front and written in one go;
    /// any failure aborts the whole batch.
    pub fn write_all<R: Reading>(&self, rows: &[R]) -> Result<usize, StoreError> {
        let kind = R::KIND;
        let path = self.table_path(kind);
        if !path.exists() {
            self.write_header(kind)?;
        }
        let first_id = self.count(kind)? + 1;

        let mut buf = csv::WriterBuilder::new().has_headers(false).from_writer(Vec::new());
        for (i, sample) in rows.iter().enumerate() {
            buf.write_record(encode_row(first_id + i, sample))
                .map_err(Self::csv_err(&path))?;
        }
        let bytes = buf.into_inner().map_err(|e| StoreError::Io {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?;

        use std::io::Write;
        let mut file = OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(Self::io_err(&path))?;
        file.write_all(&bytes).map_err(Self::io_err(&path))?;

        debug!("{}: appended {} rows from id {first_id}", kind, rows.len());
        Ok(rows.len())
    }

    /// Replace a table's contents with `rows` (ids restart at 1).
    pub fn replace_all<R: Reading>(&self, rows: &[R]) -> Result<usize, StoreError> {
        self.write_header(R::KIND)?;
        self.write_all(rows)
    }

    /// Every row of a table in id order. A missing table reads as empty.
    pub fn read_all<R: Reading>(&self) -> Result<Vec<R>, StoreError> {
        let kind = R::KIND;
        let path = self.table_path(kind);
        if !path.exists() {
            debug!("{}: no table at {}", kind, path.display());
            return Ok(Vec::new());
        }

        let mut rdr = csv::Reader::from_path(&path).map_err(Self::csv_err(&path))?;
        let headers: Vec<String> = rdr
            .headers()
            .map_err(Self::csv_err(&path))?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        if headers != kind.columns() {
            return Err(StoreError::Schema {
                table: kind.label().to_string(),
                found: headers,
            });
        }

        let mut out = Vec::new();
        for (i, rec) in rdr.records().enumerate() {
            let rec = rec.map_err(Self::csv_err(&path))?;
            out.push(decode_row::<R>(i + 1, &rec)?);
        }
        Ok(out)
    }
}
