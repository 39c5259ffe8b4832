//! Quote source configuration parsing from environment variables.
//!
//! This module handles loading the endpoint list and request parameters for
//! the supported quote sources:
//! - Binance P2P order book (USDT/BOB by default)
//! - Binance spot ticker

use super::{Lookup, parse_or};
use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_P2P_ENDPOINTS: &[&str] = &["https://p2p.binance.com", "https://c2c.binance.com"];

pub const DEFAULT_SPOT_ENDPOINTS: &[&str] = &[
    "https://api.binance.com",
    "https://api1.binance.com",
    "https://api2.binance.com",
    "https://api3.binance.com",
];

/// Which remote book the price is sampled from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSourceKind {
    P2p,
    Spot,
}

impl FromStr for QuoteSourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "p2p" => Ok(QuoteSourceKind::P2p),
            "spot" => Ok(QuoteSourceKind::Spot),
            _ => anyhow::bail!("Invalid QUOTE_SOURCE: {}. Must be 'p2p' or 'spot'", s),
        }
    }
}

/// Binance P2P search parameters
#[derive(Debug, Clone, PartialEq)]
pub struct P2pConfig {
    pub asset: String,
    pub fiat: String,
    /// Offers requested per side
    pub rows: usize,
    /// Best offers averaged per side
    pub top_n: usize,
}

impl Default for P2pConfig {
    fn default() -> Self {
        Self {
            asset: "USDT".to_string(),
            fiat: "BOB".to_string(),
            rows: 10,
            top_n: 5,
        }
    }
}

/// Quote source environment configuration
#[derive(Debug, Clone)]
pub struct QuoteEnvConfig {
    pub source: QuoteSourceKind,
    /// Endpoint base URLs in order of preference
    pub endpoints: Vec<String>,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub p2p: P2pConfig,
    pub spot_symbol: String,
}

impl QuoteEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let source = lookup("QUOTE_SOURCE")
            .unwrap_or_else(|| "p2p".to_string())
            .parse::<QuoteSourceKind>()?;

        let defaults = match source {
            QuoteSourceKind::P2p => DEFAULT_P2P_ENDPOINTS,
            QuoteSourceKind::Spot => DEFAULT_SPOT_ENDPOINTS,
        };
        let endpoints: Vec<String> = match lookup("QUOTE_ENDPOINTS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.iter().map(|s| s.to_string()).collect(),
        };
        if endpoints.is_empty() {
            anyhow::bail!("QUOTE_ENDPOINTS must list at least one endpoint");
        }

        let timeout_secs: u64 = parse_or(lookup, "REQUEST_TIMEOUT_SECS", 10)?;
        if timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }

        let p2p = P2pConfig {
            asset: lookup("P2P_ASSET").unwrap_or_else(|| "USDT".to_string()),
            fiat: lookup("P2P_FIAT").unwrap_or_else(|| "BOB".to_string()),
            rows: parse_or(lookup, "P2P_ROWS", 10)?,
            top_n: parse_or(lookup, "P2P_TOP_N", 5)?,
        };
        if p2p.top_n == 0 {
            anyhow::bail!("P2P_TOP_N must be greater than zero");
        }

        Ok(Self {
            source,
            endpoints,
            request_timeout: Duration::from_secs(timeout_secs),
            max_retries: parse_or(lookup, "HTTP_MAX_RETRIES", 0)
                .context("HTTP_MAX_RETRIES must be a non-negative integer")?,
            p2p,
            spot_symbol: lookup("SPOT_SYMBOL").unwrap_or_else(|| "BTCUSDT".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_quote_config_defaults() {
        let config = QuoteEnvConfig::from_lookup(&lookup_from(&[])).unwrap();
        assert_eq!(config.source, QuoteSourceKind::P2p);
        assert_eq!(config.endpoints[0], "https://p2p.binance.com");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.p2p, P2pConfig::default());
    }

    #[test]
    fn test_spot_defaults_to_binance_mirrors() {
        let config = QuoteEnvConfig::from_lookup(&lookup_from(&[("QUOTE_SOURCE", "SPOT")])).unwrap();
        assert_eq!(config.source, QuoteSourceKind::Spot);
        assert_eq!(config.endpoints.len(), 4);
        assert!(config.endpoints.iter().all(|e| e.contains("binance.com")));
    }

    #[test]
    fn test_endpoint_list_is_trimmed() {
        let config = QuoteEnvConfig::from_lookup(&lookup_from(&[(
            "QUOTE_ENDPOINTS",
            " http://a.local/ , http://b.local ,",
        )]))
        .unwrap();
        assert_eq!(config.endpoints, vec!["http://a.local", "http://b.local"]);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(QuoteEnvConfig::from_lookup(&lookup_from(&[("QUOTE_SOURCE", "futures")])).is_err());
        assert!(QuoteEnvConfig::from_lookup(&lookup_from(&[("QUOTE_ENDPOINTS", " , ")])).is_err());
        assert!(
            QuoteEnvConfig::from_lookup(&lookup_from(&[("REQUEST_TIMEOUT_SECS", "0")])).is_err()
        );
    }
}
