//! In-Memory Series Store
//!
//! A `SeriesStore` that keeps the series in RAM only. Useful for tests and
//! dry runs; data is lost on restart.
//!
//! Writes can be made to fail on demand to exercise the persistence-failure
//! path of the pipeline.

use crate::domain::errors::PersistenceError;
use crate::domain::market::series::{Sample, Series};
use crate::domain::ports::SeriesStore;

#[derive(Debug, Default)]
pub struct InMemorySeriesStore {
    series: Series,
    fail_writes: bool,
    writes: usize,
}

impl InMemorySeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated as if loaded from disk.
    pub fn with_series(series: Series) -> Self {
        Self {
            series,
            ..Self::default()
        }
    }

    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful appends.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl SeriesStore for InMemorySeriesStore {
    fn load(&mut self) -> Result<Series, PersistenceError> {
        Ok(self.series.clone())
    }

    fn append(&mut self, sample: Sample) -> Result<(), PersistenceError> {
        let next = self.series.with_sample(sample)?;
        if self.fail_writes {
            return Err(PersistenceError::Rejected {
                reason: "writes disabled".to_string(),
            });
        }
        self.series = next;
        self.writes += 1;
        Ok(())
    }

    fn series(&self) -> &Series {
        &self.series
    }
}
