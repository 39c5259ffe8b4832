pub mod logistic_predictor;
pub mod predictor;

pub use logistic_predictor::LogisticPredictor;
pub use predictor::{Prediction, Predictor};
