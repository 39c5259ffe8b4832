//! Return and rolling-mean features derived from the sample series.
//!
//! Every derived row keeps the timestamp of the sample it belongs to, so
//! feature rows, label rows and the series line up by position.

use crate::domain::market::series::Series;
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

/// Reference window set: 5, 15 and 30 samples.
pub const DEFAULT_WINDOWS: &[usize] = &[5, 15, 30];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReturnRow {
    pub timestamp: DateTime<Utc>,
    /// `price_t / price_{t-1} - 1`, absent on the first row
    pub ret: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub timestamp: DateTime<Utc>,
    /// One mean per configured window, in window order
    pub means: Vec<Option<f64>>,
}

impl FeatureRow {
    /// The feature vector when every window mean is defined.
    pub fn vector(&self) -> Option<Vec<f64>> {
        self.means.iter().copied().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.means.iter().all(Option::is_some)
    }
}

/// Percentage returns between consecutive samples.
pub fn compute_returns(series: &Series) -> Vec<ReturnRow> {
    let samples = series.samples();
    samples
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            let ret = if i == 0 {
                None
            } else {
                let prev = samples[i - 1].price.to_f64();
                let curr = sample.price.to_f64();
                match (prev, curr) {
                    (Some(p), Some(c)) if p > 0.0 => Some(c / p - 1.0),
                    _ => None,
                }
            };
            ReturnRow {
                timestamp: sample.timestamp,
                ret,
            }
        })
        .collect()
}

/// Simple moving average over exactly `window` trailing values.
///
/// Position `i` is defined only when all of `values[i + 1 - window..=i]`
/// are defined, so an undefined input propagates instead of being zero-filled.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    (0..values.len())
        .map(|i| {
            if i + 1 < window {
                return None;
            }
            let slice = &values[i + 1 - window..=i];
            let sum = slice.iter().copied().try_fold(0.0, |acc, v| v.map(|x| acc + x))?;
            Some(sum / window as f64)
        })
        .collect()
}

/// Builds rolling-mean feature rows for a configured set of windows.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureBuilder {
    windows: Vec<usize>,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOWS.to_vec())
    }
}

impl FeatureBuilder {
    pub fn new(windows: Vec<usize>) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> &[usize] {
        &self.windows
    }

    /// Column names in feature-vector order, e.g. `ma5`, `ma15`, `ma30`.
    pub fn feature_names(&self) -> Vec<String> {
        self.windows.iter().map(|w| format!("ma{}", w)).collect()
    }

    pub fn build(&self, series: &Series) -> Vec<FeatureRow> {
        let returns = compute_returns(series);
        let ret_values: Vec<Option<f64>> = returns.iter().map(|r| r.ret).collect();
        let columns: Vec<Vec<Option<f64>>> = self
            .windows
            .iter()
            .map(|&w| rolling_mean(&ret_values, w))
            .collect();

        returns
            .iter()
            .enumerate()
            .map(|(i, row)| FeatureRow {
                timestamp: row.timestamp,
                means: columns.iter().map(|col| col[i]).collect(),
            })
            .collect()
    }
}
