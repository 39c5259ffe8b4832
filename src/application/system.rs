use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::application::market_data::QuoteFetcher;
use crate::application::ml::LogisticPredictor;
use crate::application::pipeline::{CycleReport, Pipeline, PipelineState};
use crate::application::sampler::AdmissionGate;
use crate::config::{Config, QuoteSourceKind};
use crate::domain::errors::PipelineError;
use crate::domain::ml::features::FeatureBuilder;
use crate::domain::ports::{JsonTransport, QuoteSource, SeriesStore};
use crate::infrastructure::binance::{BinanceP2pQuoteSource, BinanceSpotQuoteSource};
use crate::infrastructure::core::HttpJsonTransport;
use crate::infrastructure::observability::{Metrics, MetricsReporter};
use crate::infrastructure::persistence::CsvSeriesStore;

pub struct Application {
    pub config: Config,
    pub pipeline: Pipeline,
    pub state: PipelineState,
    pub metrics: Metrics,
    pub reporter: Option<MetricsReporter>,
}

impl Application {
    /// Wires the configured source, the CSV store and the predictor.
    pub fn build(config: Config) -> Result<Self> {
        info!(
            "Building pricecast (source: {:?}, {} endpoints)...",
            config.quote_source,
            config.endpoints.len()
        );

        let transport: Arc<dyn JsonTransport> = Arc::new(HttpJsonTransport::new(
            config.request_timeout,
            config.max_retries,
        ));
        let store: Box<dyn SeriesStore> = Box::new(CsvSeriesStore::new(&config.history_file));
        Self::build_with(config, transport, store)
    }

    /// Same wiring over an arbitrary transport and store.
    pub fn build_with(
        config: Config,
        transport: Arc<dyn JsonTransport>,
        store: Box<dyn SeriesStore>,
    ) -> Result<Self> {
        let source: Arc<dyn QuoteSource> = match config.quote_source {
            QuoteSourceKind::P2p => {
                info!(
                    "Using Binance P2P ({}/{}, top {} of {} offers)",
                    config.p2p.asset, config.p2p.fiat, config.p2p.top_n, config.p2p.rows
                );
                Arc::new(BinanceP2pQuoteSource::new(transport, config.p2p.clone()))
            }
            QuoteSourceKind::Spot => {
                info!("Using Binance spot ticker ({})", config.spot_symbol);
                Arc::new(BinanceSpotQuoteSource::new(transport, config.spot_symbol.clone()))
            }
        };

        let fetcher = QuoteFetcher::new(source, config.endpoints.clone(), config.attempt_timeout());
        let metrics = Metrics::new().context("Failed to register metrics")?;
        let mut pipeline = Pipeline::new(
            fetcher,
            store,
            AdmissionGate::new(config.min_sample_spacing),
            FeatureBuilder::new(config.windows.clone()),
            Box::new(LogisticPredictor::new(
                config.min_training_rows,
                config.logistic_alpha,
            )),
        )
        .with_metrics(metrics.clone());

        let state = pipeline
            .initialize()
            .with_context(|| format!("Failed to load history from {:?}", config.history_file))?;

        let reporter = config
            .observability_enabled
            .then(|| MetricsReporter::new(metrics.clone()));

        Ok(Self {
            config,
            pipeline,
            state,
            metrics,
            reporter,
        })
    }

    /// One cycle; errors are logged and leave the previous state in place.
    pub async fn tick(&mut self) -> Option<CycleReport> {
        match self.pipeline.run_cycle(&mut self.state).await {
            Ok(report) => {
                for warning in &report.warnings {
                    warn!("Endpoint skipped: {}", warning);
                }
                if !report.persisted && report.admission.is_admitted() {
                    warn!("Latest sample kept in memory only; it will be lost on restart");
                }
                if let Some(reporter) = &self.reporter {
                    reporter.report(&report);
                }
                Some(report)
            }
            Err(PipelineError::Source(e)) => {
                error!("Cycle failed: {}", e);
                match self.state.last_prediction() {
                    Some(previous) => info!("Price unavailable; last prediction: {:?}", previous),
                    None => info!("Price unavailable; no prediction yet"),
                }
                None
            }
            Err(e) => {
                error!("Cycle failed: {}", e);
                None
            }
        }
    }

    /// Runs a cycle at every poll interval until `shutdown` resolves.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let period = self.config.poll_interval.max(Duration::from_secs(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Sampling every {:?}", period);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = &mut shutdown => {
                    info!(
                        "Shutdown after {} cycles ({} failed)",
                        self.state.cycles, self.state.failed_cycles
                    );
                    return Ok(());
                }
            }
        }
    }
}
