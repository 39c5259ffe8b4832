//! Prometheus metrics definitions for pricecast
//!
//! All metrics use the `pricecast_` prefix.

use prometheus::{
    Counter, CounterVec, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Prometheus metrics for the sampling pipeline
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Pipeline executions by outcome
    pub cycles_total: CounterVec,
    /// Failed endpoint attempts by endpoint
    pub endpoint_failures_total: CounterVec,
    /// Fetched prices by admission decision
    pub samples_total: CounterVec,
    /// Appends the store could not persist
    pub persist_failures_total: Counter,
    /// Durable series length
    pub series_length: Gauge,
    /// Last emitted probability of an up move (-1 when none)
    pub probability_up: Gauge,
    /// Quote fetch latency in seconds
    pub fetch_latency_seconds: HistogramVec,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let cycles_total = CounterVec::new(
            Opts::new("pricecast_cycles_total", "Pipeline executions by outcome"),
            &["outcome"],
        )?;
        registry.register(Box::new(cycles_total.clone()))?;

        let endpoint_failures_total = CounterVec::new(
            Opts::new(
                "pricecast_endpoint_failures_total",
                "Failed quote endpoint attempts",
            ),
            &["endpoint"],
        )?;
        registry.register(Box::new(endpoint_failures_total.clone()))?;

        let samples_total = CounterVec::new(
            Opts::new("pricecast_samples_total", "Fetched prices by admission decision"),
            &["decision"],
        )?;
        registry.register(Box::new(samples_total.clone()))?;

        let persist_failures_total = Counter::with_opts(Opts::new(
            "pricecast_persist_failures_total",
            "Samples that could not be persisted",
        ))?;
        registry.register(Box::new(persist_failures_total.clone()))?;

        let series_length = Gauge::with_opts(Opts::new(
            "pricecast_series_length",
            "Number of durably stored samples",
        ))?;
        registry.register(Box::new(series_length.clone()))?;

        let probability_up = Gauge::with_opts(Opts::new(
            "pricecast_probability_up",
            "Last probability of an up move (-1 when no prediction)",
        ))?;
        probability_up.set(-1.0);
        registry.register(Box::new(probability_up.clone()))?;

        let fetch_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "pricecast_fetch_latency_seconds",
                "Quote fetch latency in seconds",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
            &["source"],
        )?;
        registry.register(Box::new(fetch_latency_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            cycles_total,
            endpoint_failures_total,
            samples_total,
            persist_failures_total,
            series_length,
            probability_up,
            fetch_latency_seconds,
        })
    }

    /// Prometheus text exposition of every registered metric
    pub fn export_text(&self) -> String {
        let encoder = TextEncoder::new();
        encoder
            .encode_to_string(&self.registry.gather())
            .unwrap_or_default()
    }
}
