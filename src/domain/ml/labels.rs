//! Forward-looking targets and the aligned training set.

use super::features::{FeatureRow, compute_returns};
use crate::domain::market::series::Series;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LabelRow {
    pub timestamp: DateTime<Utc>,
    /// 1 when the next sample's return is strictly positive; absent on the last row
    pub target: Option<u8>,
}

/// Labels each row with whether the price rose on the following step.
pub fn build_labels(series: &Series) -> Vec<LabelRow> {
    let returns = compute_returns(series);
    returns
        .iter()
        .enumerate()
        .map(|(i, row)| LabelRow {
            timestamp: row.timestamp,
            target: returns
                .get(i + 1)
                .and_then(|next| next.ret)
                .map(|ret| u8::from(ret > 0.0)),
        })
        .collect()
}

/// Fully-defined (features, label) pairs in chronological order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    timestamps: Vec<DateTime<Utc>>,
    x: Vec<Vec<f64>>,
    y: Vec<i32>,
}

impl TrainingSet {
    /// Inner join of feature and label rows on timestamp, dropping any row
    /// with an undefined feature or label.
    pub fn assemble(features: &[FeatureRow], labels: &[LabelRow]) -> Self {
        let mut set = Self::default();
        let mut label_iter = labels.iter().peekable();

        for feature in features {
            while label_iter
                .peek()
                .is_some_and(|label| label.timestamp < feature.timestamp)
            {
                label_iter.next();
            }
            let Some(label) = label_iter.peek() else {
                break;
            };
            if label.timestamp != feature.timestamp {
                continue;
            }
            if let (Some(vector), Some(target)) = (feature.vector(), label.target) {
                set.timestamps.push(feature.timestamp);
                set.x.push(vector);
                set.y.push(i32::from(target));
            }
        }

        set
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn x(&self) -> &[Vec<f64>] {
        &self.x
    }

    pub fn y(&self) -> &[i32] {
        &self.y
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Share of positive labels, `None` on an empty set.
    pub fn positive_rate(&self) -> Option<f64> {
        if self.y.is_empty() {
            return None;
        }
        let positives = self.y.iter().filter(|&&t| t == 1).count();
        Some(positives as f64 / self.y.len() as f64)
    }
}
