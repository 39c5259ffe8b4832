use thiserror::Error;

/// Errors raised while resolving a quote from the remote source
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("Request to {url} timed out after {duration_ms}ms")]
    Timeout { url: String, duration_ms: u64 },

    #[error("Transport error calling {url}: {reason}")]
    Transport { url: String, reason: String },

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    #[error("Order book for {side} side is empty")]
    EmptyOrderBook { side: String },

    #[error("Quote price must be positive, got {price}")]
    NonPositivePrice { price: String },

    #[error("All {attempts} quote endpoints failed")]
    SourceUnavailable { attempts: usize },
}

impl QuoteError {
    /// True when the failure was already exhausted over every endpoint.
    pub fn is_source_unavailable(&self) -> bool {
        matches!(self, QuoteError::SourceUnavailable { .. })
    }
}

/// Errors raised by the series store
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error("Write rejected by store: {reason}")]
    Rejected { reason: String },
}

/// Invariant violations on the sample series
#[derive(Debug, Error, PartialEq)]
pub enum SeriesError {
    #[error("Sample at {timestamp} is not after the last sample at {last}")]
    NonIncreasingTimestamp { timestamp: String, last: String },

    #[error("Sample price must be positive, got {price}")]
    NonPositivePrice { price: String },
}

/// Errors raised while fitting or querying the classifier
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("Failed to build feature matrix: {reason}")]
    Matrix { reason: String },

    #[error("Classifier fit failed: {reason}")]
    Fit { reason: String },

    #[error("Feature vector has {actual} values, model expects {expected}")]
    FeatureWidth { expected: usize, actual: usize },
}

/// Errors that end one pipeline execution early.
///
/// A classifier failure does not end the cycle; it is reported as
/// `Prediction::Failed`.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] QuoteError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

}
