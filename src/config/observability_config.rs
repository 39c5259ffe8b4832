//! Observability configuration parsing from environment variables.
//!
//! This module handles loading the metrics snapshot settings.

use super::{Lookup, parse_or};
use anyhow::Result;

/// Observability environment configuration
#[derive(Debug, Clone)]
pub struct ObservabilityEnvConfig {
    pub enabled: bool,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        Ok(Self {
            enabled: parse_or(lookup, "OBSERVABILITY_ENABLED", true)?,
        })
    }
}
