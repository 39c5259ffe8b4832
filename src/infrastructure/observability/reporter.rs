//! Per-cycle report output for pricecast
//!
//! Each finished cycle is written as one structured JSON line to stdout,
//! prefixed so log shippers can filter it. Nothing is served or listened on.

use crate::application::pipeline::CycleReport;
use crate::infrastructure::observability::metrics::Metrics;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use std::time::Instant;
use tracing::{info, warn};

/// Compact snapshot of one cycle for JSON output
#[derive(Debug, Serialize)]
pub struct CycleSnapshot {
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub price: f64,
    pub buy: Option<f64>,
    pub sell: Option<f64>,
    pub endpoint: String,
    pub admitted: bool,
    pub persisted: bool,
    pub series_length: usize,
    pub p_up: Option<f64>,
    pub endpoint_warnings: usize,
}

/// Writes cycle snapshots and the Prometheus text dump
pub struct MetricsReporter {
    metrics: Metrics,
    start_time: Instant,
}

impl MetricsReporter {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            metrics,
            start_time: Instant::now(),
        }
    }

    pub fn snapshot(&self, report: &CycleReport) -> CycleSnapshot {
        CycleSnapshot {
            timestamp: report.timestamp.to_rfc3339(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            price: report.quote.price.to_f64().unwrap_or(0.0),
            buy: report.quote.buy.and_then(|p| p.to_f64()),
            sell: report.quote.sell.and_then(|p| p.to_f64()),
            endpoint: report.quote.endpoint.clone(),
            admitted: report.admission.is_admitted(),
            persisted: report.persisted,
            series_length: report.series_length,
            p_up: report.prediction.probability(),
            endpoint_warnings: report.warnings.len(),
        }
    }

    /// Emit one `METRICS_JSON:` line for a finished cycle
    pub fn report(&self, report: &CycleReport) {
        let snapshot = self.snapshot(report);
        match serde_json::to_string(&snapshot) {
            Ok(json) => {
                println!("METRICS_JSON:{}", json);
                info!(
                    "Series: {} samples | Uptime: {}s",
                    snapshot.series_length, snapshot.uptime_seconds
                );
            }
            Err(e) => warn!("Failed to serialize metrics: {}", e),
        }
    }

    /// Prometheus text exposition, logged at shutdown
    pub fn dump(&self) -> String {
        self.metrics.export_text()
    }
}
