//! Configuration module for pricecast.
//!
//! This module provides structured configuration loading from environment variables,
//! organized by concern: Quote source, Pipeline (sampling, features, model), and Observability.

mod observability_config;
mod pipeline_config;
mod quote_config;

pub use observability_config::ObservabilityEnvConfig;
pub use pipeline_config::{PipelineEnvConfig, parse_windows};
pub use quote_config::{
    DEFAULT_P2P_ENDPOINTS, DEFAULT_SPOT_ENDPOINTS, P2pConfig, QuoteEnvConfig, QuoteSourceKind,
};

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Source of raw configuration values, keyed by variable name.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub(crate) fn parse_or<T>(lookup: Lookup<'_>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse {}={:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}

/// Main application configuration.
///
/// Flattens the sub-configs into the fields the pipeline and the runner read.
#[derive(Debug, Clone)]
pub struct Config {
    // Quote source (from QuoteEnvConfig)
    pub quote_source: QuoteSourceKind,
    pub endpoints: Vec<String>,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub p2p: P2pConfig,
    pub spot_symbol: String,

    // Pipeline (from PipelineEnvConfig)
    pub poll_interval: Duration,
    pub min_sample_spacing: Duration,
    pub windows: Vec<usize>,
    pub min_training_rows: usize,
    pub logistic_alpha: f64,
    pub history_file: PathBuf,

    // Observability (from ObservabilityEnvConfig)
    pub observability_enabled: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(&|key: &str| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key/value source.
    ///
    /// This orchestrates loading from all sub-config modules and composes
    /// them into a unified Config struct.
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let quote = QuoteEnvConfig::from_lookup(lookup).context("Failed to load quote config")?;
        let pipeline =
            PipelineEnvConfig::from_lookup(lookup).context("Failed to load pipeline config")?;
        let observability = ObservabilityEnvConfig::from_lookup(lookup)
            .context("Failed to load observability config")?;

        Ok(Self {
            // Quote source
            quote_source: quote.source,
            endpoints: quote.endpoints,
            request_timeout: quote.request_timeout,
            max_retries: quote.max_retries,
            p2p: quote.p2p,
            spot_symbol: quote.spot_symbol,

            // Pipeline
            poll_interval: pipeline.poll_interval,
            min_sample_spacing: pipeline.min_sample_spacing,
            windows: pipeline.windows,
            min_training_rows: pipeline.min_training_rows,
            logistic_alpha: pipeline.logistic_alpha,
            history_file: pipeline.history_file,

            // Observability
            observability_enabled: observability.enabled,
        })
    }

    /// Upper bound for one endpoint attempt, covering the configured retries.
    pub fn attempt_timeout(&self) -> Duration {
        self.request_timeout * (self.max_retries + 1)
    }
}
