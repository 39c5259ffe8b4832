use crate::domain::errors::{PersistenceError, QuoteError};
use crate::domain::market::quote::Quote;
use crate::domain::market::series::{Sample, Series};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

// Need async_trait for async functions in traits
#[async_trait]
pub trait JsonTransport: Send + Sync {
    /// GET `url` and parse the body as JSON.
    async fn get_json(&self, url: &str) -> Result<Value, QuoteError>;

    /// POST `body` as JSON to `url` and parse the response body as JSON.
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, QuoteError>;
}

/// Resolves a quote from a single endpoint base URL.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_from(&self, base_url: &str) -> Result<Quote, QuoteError>;

    fn name(&self) -> &str;
}

/// Durable, append-only home of the sample series.
pub trait SeriesStore: Send {
    /// Reads the persisted series, replacing the in-memory copy.
    fn load(&mut self) -> Result<Series, PersistenceError>;

    /// Appends one sample and persists the whole series before returning.
    /// On error the in-memory series is left unchanged.
    fn append(&mut self, sample: Sample) -> Result<(), PersistenceError>;

    /// The durable series as of the last successful load or append.
    fn series(&self) -> &Series;

    fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.series().last_timestamp()
    }
}
