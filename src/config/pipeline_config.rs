//! Sampling, feature and model parameters parsed from environment variables.

use super::{Lookup, parse_or};
use crate::domain::ml::features::DEFAULT_WINDOWS;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Seconds subtracted from the polling interval to get the default spacing,
/// so a tick that fires slightly early still records a sample.
const SPACING_JITTER_SECS: u64 = 5;

#[derive(Debug, Clone)]
pub struct PipelineEnvConfig {
    pub poll_interval: Duration,
    pub min_sample_spacing: Duration,
    pub windows: Vec<usize>,
    pub min_training_rows: usize,
    pub logistic_alpha: f64,
    pub history_file: PathBuf,
}

impl PipelineEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let interval_secs: u64 = parse_or(lookup, "POLL_INTERVAL_SECS", 60)?;
        if interval_secs == 0 {
            anyhow::bail!("POLL_INTERVAL_SECS must be greater than zero");
        }

        let spacing_secs: u64 = parse_or(
            lookup,
            "MIN_SAMPLE_SPACING_SECS",
            interval_secs.saturating_sub(SPACING_JITTER_SECS),
        )?;

        let windows = match lookup("ROLLING_WINDOWS") {
            Some(raw) => parse_windows(&raw)?,
            None => DEFAULT_WINDOWS.to_vec(),
        };

        let logistic_alpha: f64 = parse_or(lookup, "LOGISTIC_ALPHA", 1.0)?;
        if !logistic_alpha.is_finite() || logistic_alpha < 0.0 {
            anyhow::bail!("LOGISTIC_ALPHA must be a finite, non-negative number");
        }

        Ok(Self {
            poll_interval: Duration::from_secs(interval_secs),
            min_sample_spacing: Duration::from_secs(spacing_secs),
            windows,
            min_training_rows: parse_or(lookup, "MIN_TRAINING_ROWS", 200)?,
            logistic_alpha,
            history_file: PathBuf::from(
                lookup("HISTORY_FILE").unwrap_or_else(|| "hist_p2p_usdt_bob.csv".to_string()),
            ),
        })
    }
}

/// Parses a comma-separated window list such as `5,15,30`.
pub fn parse_windows(raw: &str) -> Result<Vec<usize>> {
    let windows = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .context("Failed to parse ROLLING_WINDOWS")?;

    if windows.is_empty() {
        anyhow::bail!("ROLLING_WINDOWS must list at least one window");
    }
    if windows.contains(&0) {
        anyhow::bail!("ROLLING_WINDOWS entries must be at least 1");
    }
    Ok(windows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_pipeline_config_defaults() {
        let config = PipelineEnvConfig::from_lookup(&empty).unwrap();
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.min_sample_spacing, Duration::from_secs(55));
        assert_eq!(config.windows, vec![5, 15, 30]);
        assert_eq!(config.min_training_rows, 200);
        assert_eq!(config.history_file, PathBuf::from("hist_p2p_usdt_bob.csv"));
    }

    #[test]
    fn test_spacing_follows_interval() {
        let lookup = |key: &str| (key == "POLL_INTERVAL_SECS").then(|| "30".to_string());
        let config = PipelineEnvConfig::from_lookup(&lookup).unwrap();
        assert_eq!(config.min_sample_spacing, Duration::from_secs(25));
    }

    #[test]
    fn test_parse_windows() {
        assert_eq!(parse_windows("1, 2,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_windows("").is_err());
        assert!(parse_windows("5,0").is_err());
        assert!(parse_windows("5,x").is_err());
    }
}
