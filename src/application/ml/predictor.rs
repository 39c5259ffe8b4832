use crate::domain::errors::PredictorError;
use crate::domain::ml::labels::TrainingSet;
use serde::Serialize;

/// Result of one prediction attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Prediction {
    /// Probability (0.0 to 1.0) that the next sample's price is higher
    Probability { p_up: f64, training_rows: usize },
    /// Not enough labelled rows yet; a normal state, not an error
    InsufficientData {
        rows: usize,
        required: usize,
        missing: usize,
    },
    /// The classifier could not be fitted or scored this cycle
    Failed { reason: String },
}

impl Prediction {
    pub fn insufficient(rows: usize, required: usize) -> Self {
        Prediction::InsufficientData {
            rows,
            required,
            missing: required.saturating_sub(rows),
        }
    }

    pub fn probability(&self) -> Option<f64> {
        match self {
            Prediction::Probability { p_up, .. } => Some(*p_up),
            Prediction::InsufficientData { .. } | Prediction::Failed { .. } => None,
        }
    }
}

/// Interface for the up-move classifier
pub trait Predictor: Send + Sync {
    /// Fits on `training` and scores `latest`, the feature vector of the
    /// newest observation.
    fn predict(&self, training: &TrainingSet, latest: &[f64]) -> Result<Prediction, PredictorError>;

    /// Labelled rows needed before a probability is emitted
    fn min_training_rows(&self) -> usize;

    /// Get model name/type
    fn name(&self) -> &str;
}
