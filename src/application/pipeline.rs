//! One end-to-end sampling and prediction pass.
//!
//! `FETCH -> ADMIT/REJECT -> STORE -> FEATURES/LABELS -> TRAIN -> PREDICT`.
//! A failed fetch stops the cycle. A failed write keeps the sample for this
//! pass only. Too little history, or a model that cannot be fitted, ends
//! with a report that carries no probability.

use crate::application::market_data::quote_fetcher::QuoteFetcher;
use crate::application::ml::predictor::{Prediction, Predictor};
use crate::application::sampler::{Admission, AdmissionGate};
use crate::domain::errors::PipelineError;
use crate::domain::market::quote::Quote;
use crate::domain::market::series::{Sample, Series};
use crate::domain::ml::features::{FeatureBuilder, compute_returns};
use crate::domain::ml::labels::{TrainingSet, build_labels};
use crate::domain::ports::SeriesStore;
use crate::infrastructure::observability::Metrics;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Source of the sample timestamp, read once per cycle after the fetch.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// One chart point: a stored price and the return into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotPoint {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    /// Return from the previous sample, in percent
    pub return_pct: Option<f64>,
}

/// Everything the presentation layer needs after one execution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub timestamp: DateTime<Utc>,
    pub quote: Quote,
    pub admission: Admission,
    /// False when the sample was admitted but could not be written
    pub persisted: bool,
    /// Endpoint failures recovered by failover
    pub warnings: Vec<String>,
    pub series_length: usize,
    pub points: Vec<PlotPoint>,
    pub prediction: Prediction,
}

impl CycleReport {
    pub fn current_price(&self) -> Decimal {
        self.quote.price
    }
}

/// State carried from one execution to the next.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    pub last_report: Option<CycleReport>,
    pub cycles: u64,
    pub failed_cycles: u64,
}

impl PipelineState {
    pub fn last_prediction(&self) -> Option<&Prediction> {
        self.last_report.as_ref().map(|r| &r.prediction)
    }

    pub fn last_quote(&self) -> Option<&Quote> {
        self.last_report.as_ref().map(|r| &r.quote)
    }
}

pub struct Pipeline {
    fetcher: QuoteFetcher,
    store: Box<dyn SeriesStore>,
    gate: AdmissionGate,
    features: FeatureBuilder,
    predictor: Box<dyn Predictor>,
    clock: Clock,
    metrics: Option<Metrics>,
}

impl Pipeline {
    pub fn new(
        fetcher: QuoteFetcher,
        store: Box<dyn SeriesStore>,
        gate: AdmissionGate,
        features: FeatureBuilder,
        predictor: Box<dyn Predictor>,
    ) -> Self {
        Self {
            fetcher,
            store,
            gate,
            features,
            predictor,
            clock: Arc::new(Utc::now),
            metrics: None,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Loads the persisted series. Call once before the first cycle.
    pub fn initialize(&mut self) -> Result<PipelineState, PipelineError> {
        let series = self.store.load()?;
        info!(
            "Pipeline ready: {} stored samples, source={}, windows={:?}, predictor={}",
            series.len(),
            self.fetcher.source_name(),
            self.features.windows(),
            self.predictor.name()
        );
        if let Some(metrics) = &self.metrics {
            metrics.series_length.set(series.len() as f64);
        }
        Ok(PipelineState::default())
    }

    pub fn series(&self) -> &Series {
        self.store.series()
    }

    /// Runs one execution. `&mut self` keeps executions from overlapping.
    pub async fn run_cycle(&mut self, state: &mut PipelineState) -> Result<CycleReport, PipelineError> {
        state.cycles += 1;

        // FETCH
        let started = Instant::now();
        let fetched = self.fetcher.fetch().await;
        let warnings = match &fetched {
            Ok(outcome) => &outcome.warnings,
            Err(failure) => &failure.warnings,
        };
        if let Some(metrics) = &self.metrics {
            metrics
                .fetch_latency_seconds
                .with_label_values(&[self.fetcher.source_name()])
                .observe(started.elapsed().as_secs_f64());
            for warning in warnings {
                metrics
                    .endpoint_failures_total
                    .with_label_values(&[warning.endpoint.as_str()])
                    .inc();
            }
        }
        let outcome = match fetched {
            Ok(outcome) => outcome,
            Err(failure) => {
                state.failed_cycles += 1;
                self.count_cycle("source_unavailable");
                warn!(
                    "Cycle {} skipped: {}; keeping {} stored samples",
                    state.cycles,
                    failure.error,
                    self.store.series().len()
                );
                return Err(failure.error.into());
            }
        };
        let quote = outcome.quote;
        let warnings: Vec<String> = outcome
            .warnings
            .iter()
            .map(|w| format!("{}: {}", w.endpoint, w.error))
            .collect();

        // ADMIT / REJECT
        let now = (self.clock)();
        let admission = self.gate.decide(now, self.store.last_timestamp());
        if let Some(metrics) = &self.metrics {
            let label = if admission.is_admitted() { "admitted" } else { "rejected" };
            metrics.samples_total.with_label_values(&[label]).inc();
        }

        // STORE
        let mut persisted = false;
        let working: Cow<'_, Series> = if admission.is_admitted() {
            let sample = Sample::new(now, quote.price);
            match self.store.append(sample) {
                Ok(()) => {
                    persisted = true;
                    Cow::Borrowed(self.store.series())
                }
                Err(e) => {
                    warn!("Sample {} @ {} not persisted: {}", sample.price, now, e);
                    if let Some(metrics) = &self.metrics {
                        metrics.persist_failures_total.inc();
                    }
                    match self.store.series().with_sample(sample) {
                        Ok(series) => Cow::Owned(series),
                        Err(_) => Cow::Borrowed(self.store.series()),
                    }
                }
            }
        } else {
            debug!("Price {} not stored: {:?}", quote.price, admission);
            Cow::Borrowed(self.store.series())
        };

        // FEATURES / LABELS
        let feature_rows = self.features.build(&working);
        let labels = build_labels(&working);
        let training = TrainingSet::assemble(&feature_rows, &labels);
        let latest = feature_rows.last().and_then(|row| row.vector());

        // TRAIN / PREDICT
        let prediction = match latest {
            Some(latest) => match self.predictor.predict(&training, &latest) {
                Ok(prediction) => prediction,
                Err(e) => {
                    warn!("{} failed on {} rows: {}", self.predictor.name(), training.len(), e);
                    Prediction::Failed {
                        reason: e.to_string(),
                    }
                }
            },
            None => Prediction::insufficient(training.len(), self.predictor.min_training_rows()),
        };

        let report = CycleReport {
            timestamp: now,
            quote,
            admission,
            persisted,
            warnings,
            series_length: working.len(),
            points: plot_points(&working),
            prediction,
        };

        match &report.prediction {
            Prediction::Probability { p_up, training_rows } => info!(
                "Cycle {}: price {} | P(up) {:.1}% from {} rows",
                state.cycles,
                report.quote.price,
                p_up * 100.0,
                training_rows
            ),
            Prediction::InsufficientData { rows, missing, .. } => info!(
                "Cycle {}: price {} | waiting for {} more training rows ({} so far)",
                state.cycles, report.quote.price, missing, rows
            ),
            Prediction::Failed { reason } => info!(
                "Cycle {}: price {} | no prediction: {}",
                state.cycles, report.quote.price, reason
            ),
        }

        if let Some(metrics) = &self.metrics {
            metrics.series_length.set(self.store.series().len() as f64);
            metrics
                .probability_up
                .set(report.prediction.probability().unwrap_or(-1.0));
        }
        self.count_cycle(match report.prediction {
            Prediction::Probability { .. } => "emitted",
            Prediction::InsufficientData { .. } => "no_prediction",
            Prediction::Failed { .. } => "predictor_error",
        });

        state.last_report = Some(report.clone());
        Ok(report)
    }

    fn count_cycle(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.cycles_total.with_label_values(&[outcome]).inc();
        }
    }
}

fn plot_points(series: &Series) -> Vec<PlotPoint> {
    series
        .iter()
        .zip(compute_returns(series))
        .map(|(sample, row)| PlotPoint {
            timestamp: sample.timestamp,
            price: sample.price,
            return_pct: row.ret.map(|r| r * 100.0),
        })
        .collect()
}
