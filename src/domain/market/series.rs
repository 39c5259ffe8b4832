use crate::domain::errors::SeriesError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One (timestamp, price) observation of the tracked pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, price: Decimal) -> Self {
        Self { timestamp, price }
    }
}

/// Chronological, append-only sequence of samples.
///
/// Timestamps are strictly increasing and every price is positive; `push`
/// is the only way in, so both hold for any `Series` value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Series {
    samples: Vec<Sample>,
}

impl Series {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a series from samples, failing on the first invariant violation.
    pub fn from_samples(samples: impl IntoIterator<Item = Sample>) -> Result<Self, SeriesError> {
        let mut series = Self::new();
        for sample in samples {
            series.push(sample)?;
        }
        Ok(series)
    }

    pub fn push(&mut self, sample: Sample) -> Result<(), SeriesError> {
        self.check(&sample)?;
        self.samples.push(sample);
        Ok(())
    }

    /// Validates a candidate sample against the current tail without storing it.
    pub fn check(&self, sample: &Sample) -> Result<(), SeriesError> {
        if sample.price <= Decimal::ZERO {
            return Err(SeriesError::NonPositivePrice {
                price: sample.price.to_string(),
            });
        }
        if let Some(last) = self.last() {
            if sample.timestamp <= last.timestamp {
                return Err(SeriesError::NonIncreasingTimestamp {
                    timestamp: sample.timestamp.to_rfc3339(),
                    last: last.timestamp.to_rfc3339(),
                });
            }
        }
        Ok(())
    }

    /// Copy of this series with `sample` appended.
    pub fn with_sample(&self, sample: Sample) -> Result<Self, SeriesError> {
        let mut next = self.clone();
        next.push(sample)?;
        Ok(next)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn last(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.last().map(|s| s.timestamp)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
