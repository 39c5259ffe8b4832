use super::predictor::{Prediction, Predictor};
use crate::domain::errors::PredictorError;
use crate::domain::ml::labels::TrainingSet;
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::{LogisticRegression, LogisticRegressionParameters};
use tracing::{debug, warn};

type Model = LogisticRegression<f64, i32, DenseMatrix<f64>, Vec<i32>>;

/// Logistic regression refitted from scratch on every call.
///
/// No weights survive between calls, so identical history always yields
/// the identical probability.
pub struct LogisticPredictor {
    min_training_rows: usize,
    alpha: f64,
}

impl LogisticPredictor {
    pub fn new(min_training_rows: usize, alpha: f64) -> Self {
        Self {
            min_training_rows,
            alpha,
        }
    }

    fn fit(&self, training: &TrainingSet) -> Result<Model, PredictorError> {
        let x = DenseMatrix::from_2d_vec(&training.x().to_vec()).map_err(|e| {
            PredictorError::Matrix {
                reason: e.to_string(),
            }
        })?;
        let y = training.y().to_vec();
        let params = LogisticRegressionParameters::default().with_alpha(self.alpha);

        LogisticRegression::fit(&x, &y, params).map_err(|e| PredictorError::Fit {
            reason: e.to_string(),
        })
    }

    /// P(class 1) = sigmoid(intercept + coefficients . x)
    fn positive_probability(model: &Model, latest: &[f64]) -> Result<f64, PredictorError> {
        let coefficients = model.coefficients();
        let (_, width) = coefficients.shape();
        if width != latest.len() {
            return Err(PredictorError::FeatureWidth {
                expected: width,
                actual: latest.len(),
            });
        }

        let z = latest
            .iter()
            .enumerate()
            .fold(*model.intercept().get((0, 0)), |acc, (j, v)| {
                acc + coefficients.get((0, j)) * v
            });
        Ok(sigmoid(z))
    }
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

impl Predictor for LogisticPredictor {
    fn predict(&self, training: &TrainingSet, latest: &[f64]) -> Result<Prediction, PredictorError> {
        let rows = training.len();
        if rows < self.min_training_rows {
            debug!(
                "Training set has {} rows, {} required; skipping fit",
                rows, self.min_training_rows
            );
            return Ok(Prediction::insufficient(rows, self.min_training_rows));
        }

        // A single-class set cannot be fitted; its base rate is the only estimate.
        if let Some(rate) = training.positive_rate() {
            if rate == 0.0 || rate == 1.0 {
                warn!(
                    "All {} training labels are {}; returning base rate",
                    rows, rate as u8
                );
                return Ok(Prediction::Probability {
                    p_up: rate,
                    training_rows: rows,
                });
            }
        }

        let model = self.fit(training)?;
        let p_up = Self::positive_probability(&model, latest)?.clamp(0.0, 1.0);
        debug!("Logistic model fitted on {} rows: p_up={:.4}", rows, p_up);

        Ok(Prediction::Probability {
            p_up,
            training_rows: rows,
        })
    }

    fn min_training_rows(&self) -> usize {
        self.min_training_rows
    }

    fn name(&self) -> &str {
        "SmartCore Logistic Regression"
    }
}
