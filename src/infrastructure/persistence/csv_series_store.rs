//! CSV-backed series store.
//!
//! One row per sample with the header `timestamp,price`. Every append
//! rewrites the whole file through a temp file and a rename, so a reader
//! never sees a partially written series.
//!
//! Files written by earlier tooling use `hora,precio` headers and naive
//! `YYYY-MM-DD HH:MM:SS.ffffff` timestamps in UTC; both are accepted on load.
//! Rows that cannot be loaded are not carried into the rewritten file, so the
//! original file is copied to `<file>.bak` before the first rewrite.

use crate::domain::errors::PersistenceError;
use crate::domain::market::series::{Sample, Series};
use crate::domain::ports::SeriesStore;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
struct SampleRecord {
    timestamp: String,
    price: String,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(alias = "hora")]
    timestamp: String,
    #[serde(alias = "precio")]
    price: String,
}

pub struct CsvSeriesStore {
    file_path: PathBuf,
    series: Series,
    /// Rows dropped by the last `load`
    skipped_rows: usize,
    backup_path: Option<PathBuf>,
}

impl CsvSeriesStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            series: Series::new(),
            skipped_rows: 0,
            backup_path: None,
        }
    }

    /// Copy of the file as it was before rows skipped at load were dropped.
    pub fn backup_path(&self) -> Option<&Path> {
        self.backup_path.as_deref()
    }

    pub fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .file_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.file_path.with_file_name(name)
    }

    /// First of `<file>.bak`, `<file>.bak.1`, ... that does not exist yet.
    fn free_backup_path(&self) -> PathBuf {
        let name = self
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut candidate = self.file_path.with_file_name(format!("{}.bak", name));
        let mut n = 1;
        while candidate.exists() {
            candidate = self.file_path.with_file_name(format!("{}.bak.{}", name, n));
            n += 1;
        }
        candidate
    }

    fn back_up(&mut self) -> Result<(), PersistenceError> {
        let backup = self.free_backup_path();
        fs::copy(&self.file_path, &backup).map_err(|e| self.io_error(&backup, e))?;
        warn!(
            "{} unreadable rows of {:?} kept in {:?} before rewrite",
            self.skipped_rows, self.file_path, backup
        );
        self.backup_path = Some(backup);
        Ok(())
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    fn csv_error(&self, path: &Path, source: csv::Error) -> PersistenceError {
        PersistenceError::Csv {
            path: path.display().to_string(),
            source,
        }
    }

    /// Writes `series` to the temp file and renames it over the store file.
    fn persist(&self, series: &Series) -> Result<(), PersistenceError> {
        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(parent, e))?;
            }
        }

        let temp_path = self.temp_path();
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&temp_path)
            .map_err(|e| self.csv_error(&temp_path, e))?;
        // Header is written even for an empty series
        writer
            .write_record(["timestamp", "price"])
            .map_err(|e| self.csv_error(&temp_path, e))?;
        for sample in series {
            let record = SampleRecord {
                timestamp: format_timestamp(&sample.timestamp),
                price: sample.price.to_string(),
            };
            writer
                .serialize(record)
                .map_err(|e| self.csv_error(&temp_path, e))?;
        }
        writer
            .into_inner()
            .map_err(|e| self.io_error(&temp_path, e.into_error()))?
            .sync_all()
            .map_err(|e| self.io_error(&temp_path, e))?;

        fs::rename(&temp_path, &self.file_path).map_err(|e| self.io_error(&self.file_path, e))
    }
}

impl SeriesStore for CsvSeriesStore {
    fn load(&mut self) -> Result<Series, PersistenceError> {
        if !self.file_path.exists() {
            info!("No history at {:?}; starting with an empty series", self.file_path);
            self.series = Series::new();
            self.skipped_rows = 0;
            self.backup_path = None;
            return Ok(self.series.clone());
        }

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&self.file_path)
            .map_err(|e| self.csv_error(&self.file_path, e))?;

        let mut series = Series::new();
        let mut skipped = 0usize;
        for (index, result) in reader.deserialize::<RawRecord>().enumerate() {
            // Header is line 1
            let line = index + 2;
            let sample = result
                .map_err(|e| e.to_string())
                .and_then(|raw| parse_record(&raw));
            let pushed = sample.and_then(|s| series.push(s).map_err(|e| e.to_string()));
            if let Err(reason) = pushed {
                warn!("Skipping row {} of {:?}: {}", line, self.file_path, reason);
                skipped += 1;
            }
        }

        info!(
            "Loaded {} samples from {:?} ({} skipped)",
            series.len(),
            self.file_path,
            skipped
        );
        self.series = series;
        self.skipped_rows = skipped;
        self.backup_path = None;
        Ok(self.series.clone())
    }

    fn append(&mut self, sample: Sample) -> Result<(), PersistenceError> {
        let next = self.series.with_sample(sample)?;
        if self.skipped_rows > 0 && self.backup_path.is_none() {
            self.back_up()?;
        }
        self.persist(&next)?;
        self.series = next;
        Ok(())
    }

    fn series(&self) -> &Series {
        &self.series
    }
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_record(raw: &RawRecord) -> Result<Sample, String> {
    let timestamp = parse_timestamp(&raw.timestamp)?;
    let price = Decimal::from_str(&raw.price)
        .or_else(|_| Decimal::from_scientific(&raw.price))
        .map_err(|e| format!("invalid price {:?}: {}", raw.price, e))?;
    Ok(Sample::new(timestamp, price))
}

/// Accepts RFC 3339, offset-qualified and naive (UTC) timestamps.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(format!("unrecognised timestamp {:?}", raw))
}
