//! Ordered endpoint failover for quote retrieval.
//!
//! Each endpoint is tried in preference order; a failing endpoint is logged,
//! recorded and skipped. Only when the whole list is exhausted does the fetch
//! fail with `QuoteError::SourceUnavailable`.

use crate::domain::errors::QuoteError;
use crate::domain::market::quote::Quote;
use crate::domain::ports::QuoteSource;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// One endpoint that was tried and skipped.
#[derive(Debug)]
pub struct EndpointFailure {
    pub endpoint: String,
    pub error: QuoteError,
}

#[derive(Debug)]
pub struct FetchOutcome {
    pub quote: Quote,
    /// Failures on endpoints tried before the one that answered
    pub warnings: Vec<EndpointFailure>,
}

/// Error of a fetch where every endpoint failed, with the per-endpoint causes.
#[derive(Debug)]
pub struct FetchFailure {
    pub error: QuoteError,
    pub warnings: Vec<EndpointFailure>,
}

pub struct QuoteFetcher {
    source: Arc<dyn QuoteSource>,
    endpoints: Vec<String>,
    attempt_timeout: Duration,
}

impl QuoteFetcher {
    pub fn new(source: Arc<dyn QuoteSource>, endpoints: Vec<String>, attempt_timeout: Duration) -> Self {
        Self {
            source,
            endpoints,
            attempt_timeout,
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    pub async fn fetch(&self) -> Result<FetchOutcome, FetchFailure> {
        let mut warnings = Vec::new();

        for endpoint in &self.endpoints {
            let attempt = tokio::time::timeout(self.attempt_timeout, self.source.fetch_from(endpoint));
            let error = match attempt.await {
                Ok(Ok(quote)) => {
                    if !warnings.is_empty() {
                        info!(
                            "{}: quote served by {} after {} failed endpoint(s)",
                            self.source.name(),
                            endpoint,
                            warnings.len()
                        );
                    }
                    return Ok(FetchOutcome { quote, warnings });
                }
                Ok(Err(e)) => e,
                Err(_) => QuoteError::Timeout {
                    url: endpoint.clone(),
                    duration_ms: self.attempt_timeout.as_millis() as u64,
                },
            };

            warn!("{}: endpoint {} failed: {}", self.source.name(), endpoint, error);
            warnings.push(EndpointFailure {
                endpoint: endpoint.clone(),
                error,
            });
        }

        Err(FetchFailure {
            error: QuoteError::SourceUnavailable {
                attempts: warnings.len(),
            },
            warnings,
        })
    }
}
