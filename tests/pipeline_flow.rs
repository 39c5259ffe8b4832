use chrono::{DateTime, Duration, TimeZone, Utc};
use pricecast::application::market_data::QuoteFetcher;
use pricecast::application::ml::{LogisticPredictor, Prediction, Predictor};
use pricecast::application::pipeline::{Clock, Pipeline, PipelineState};
use pricecast::application::sampler::{Admission, AdmissionGate};
use pricecast::domain::errors::{PipelineError, PredictorError, QuoteError};
use pricecast::domain::market::series::{Sample, Series};
use pricecast::domain::ml::features::FeatureBuilder;
use pricecast::domain::ml::labels::TrainingSet;
use pricecast::domain::ports::{QuoteSource, SeriesStore};
use pricecast::infrastructure::binance::BinanceSpotQuoteSource;
use pricecast::infrastructure::mock::MockJsonTransport;
use pricecast::infrastructure::repositories::InMemorySeriesStore;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::{Arc, Mutex};

const ENDPOINT_A: &str = "http://spot-a.local";
const ENDPOINT_B: &str = "http://spot-b.local";
const ENDPOINT_C: &str = "http://spot-c.local";

/// Test clock advanced by hand between cycles.
#[derive(Clone)]
struct ManualClock(Arc<Mutex<DateTime<Utc>>>);

impl ManualClock {
    fn starting_at(start: DateTime<Utc>) -> Self {
        Self(Arc::new(Mutex::new(start)))
    }

    fn advance(&self, seconds: i64) {
        let mut now = self.0.lock().unwrap();
        *now += Duration::seconds(seconds);
    }

    fn clock(&self) -> Clock {
        let inner = self.0.clone();
        Arc::new(move || *inner.lock().unwrap())
    }
}

struct Harness {
    transport: Arc<MockJsonTransport>,
    source: BinanceSpotQuoteSource,
    clock: ManualClock,
}

impl Harness {
    fn new() -> Self {
        let transport = Arc::new(MockJsonTransport::new());
        let source = BinanceSpotQuoteSource::new(transport.clone(), "BTCUSDT");
        Self {
            transport,
            source,
            clock: ManualClock::starting_at(start()),
        }
    }

    fn quote(&self, endpoint: &str, price: &str) {
        self.transport
            .push_ok(&self.source.ticker_url(endpoint), json!({"symbol": "BTCUSDT", "price": price}));
    }

    fn fail(&self, endpoint: &str) {
        let url = self.source.ticker_url(endpoint);
        self.transport.push_err(
            &url,
            QuoteError::Status {
                url: url.clone(),
                status: 503,
            },
        );
    }

    fn pipeline(
        &self,
        endpoints: &[&str],
        store: InMemorySeriesStore,
        windows: Vec<usize>,
        min_training_rows: usize,
    ) -> Pipeline {
        self.pipeline_with(
            endpoints,
            store,
            windows,
            Box::new(LogisticPredictor::new(min_training_rows, 1.0)),
        )
    }

    fn pipeline_with(
        &self,
        endpoints: &[&str],
        store: InMemorySeriesStore,
        windows: Vec<usize>,
        predictor: Box<dyn Predictor>,
    ) -> Pipeline {
        let source: Arc<dyn QuoteSource> = Arc::new(BinanceSpotQuoteSource::new(
            self.transport.clone(),
            "BTCUSDT",
        ));
        let fetcher = QuoteFetcher::new(
            source,
            endpoints.iter().map(|e| e.to_string()).collect(),
            std::time::Duration::from_secs(2),
        );
        Pipeline::new(
            fetcher,
            Box::new(store),
            AdmissionGate::new(std::time::Duration::from_secs(55)),
            FeatureBuilder::new(windows),
            predictor,
        )
        .with_clock(self.clock.clock())
    }
}

/// Classifier whose fit always fails.
struct FailingPredictor;

impl Predictor for FailingPredictor {
    fn predict(&self, _training: &TrainingSet, _latest: &[f64]) -> Result<Prediction, PredictorError> {
        Err(PredictorError::Fit {
            reason: "line search failed".to_string(),
        })
    }

    fn min_training_rows(&self) -> usize {
        0
    }

    fn name(&self) -> &str {
        "failing"
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// Irregular zig-zag history ending one minute before `start()`.
fn history(len: usize) -> Series {
    let first = start() - Duration::seconds(60 * len as i64);
    Series::from_samples((0..len).map(|i| {
        let swing = ((i * 37) % 11) as i64 - 5;
        Sample::new(
            first + Duration::seconds(60 * i as i64),
            Decimal::new(69_000 + swing * 3, 4),
        )
    }))
    .unwrap()
}

#[tokio::test]
async fn test_gate_admits_rejects_then_admits() {
    let harness = Harness::new();
    let mut pipeline = harness.pipeline(&[ENDPOINT_A], InMemorySeriesStore::new(), vec![5, 15, 30], 200);
    let mut state = pipeline.initialize().unwrap();

    harness.quote(ENDPOINT_A, "67000.00");
    let first = pipeline.run_cycle(&mut state).await.unwrap();
    assert_eq!(first.admission, Admission::FirstSample);
    assert!(first.persisted);

    harness.clock.advance(30);
    harness.quote(ENDPOINT_A, "67010.00");
    let second = pipeline.run_cycle(&mut state).await.unwrap();
    assert_eq!(
        second.admission,
        Admission::TooSoon {
            elapsed_secs: 30,
            required_secs: 55
        }
    );
    assert!(!second.persisted);
    assert_eq!(second.current_price(), dec!(67010.00));
    assert_eq!(pipeline.series().len(), 1);

    harness.clock.advance(25);
    harness.quote(ENDPOINT_A, "67020.00");
    let third = pipeline.run_cycle(&mut state).await.unwrap();
    assert_eq!(third.admission, Admission::Admitted { elapsed_secs: 55 });
    assert_eq!(pipeline.series().len(), 2);
    assert_eq!(third.points.len(), 2);
    assert_eq!(third.points[0].return_pct, None);
    assert!(third.points[1].return_pct.unwrap() > 0.0);
    assert_eq!(state.cycles, 3);
}

#[tokio::test]
async fn test_prediction_appears_at_threshold() {
    let harness = Harness::new();
    // Windows {1}: labelled rows = samples - 2
    let store = InMemorySeriesStore::with_series(history(20));
    let mut pipeline = harness.pipeline(&[ENDPOINT_A], store, vec![1], 20);
    let mut state = pipeline.initialize().unwrap();

    harness.quote(ENDPOINT_A, "6.9012");
    let report = pipeline.run_cycle(&mut state).await.unwrap();
    assert_eq!(report.series_length, 21);
    assert_eq!(
        report.prediction,
        Prediction::InsufficientData {
            rows: 19,
            required: 20,
            missing: 1
        }
    );

    harness.clock.advance(60);
    harness.quote(ENDPOINT_A, "6.8991");
    let report = pipeline.run_cycle(&mut state).await.unwrap();
    let p_up = report.prediction.probability().expect("probability at 20 rows");
    assert!((0.0..=1.0).contains(&p_up));
    assert_eq!(state.last_prediction(), Some(&report.prediction));
}

#[tokio::test]
async fn test_empty_history_reports_rows_needed() {
    let harness = Harness::new();
    let mut pipeline = harness.pipeline(&[ENDPOINT_A], InMemorySeriesStore::new(), vec![5, 15, 30], 200);
    let mut state = pipeline.initialize().unwrap();

    harness.quote(ENDPOINT_A, "67000.00");
    let report = pipeline.run_cycle(&mut state).await.unwrap();
    assert_eq!(report.prediction, Prediction::insufficient(0, 200));
}

#[tokio::test]
async fn test_failover_reports_skipped_endpoints() {
    let harness = Harness::new();
    let mut pipeline = harness.pipeline(
        &[ENDPOINT_A, ENDPOINT_B, ENDPOINT_C],
        InMemorySeriesStore::new(),
        vec![5, 15, 30],
        200,
    );
    let mut state = pipeline.initialize().unwrap();

    harness.fail(ENDPOINT_A);
    harness.fail(ENDPOINT_B);
    harness.quote(ENDPOINT_C, "67000.00");
    let report = pipeline.run_cycle(&mut state).await.unwrap();

    assert_eq!(report.quote.endpoint, ENDPOINT_C);
    assert_eq!(report.warnings.len(), 2);
    assert!(report.warnings[0].starts_with(ENDPOINT_A));
    assert!(report.warnings[1].contains("503"));
    assert_eq!(pipeline.series().len(), 1);
}

#[tokio::test]
async fn test_source_unavailable_keeps_previous_state() {
    let harness = Harness::new();
    let mut pipeline = harness.pipeline(
        &[ENDPOINT_A, ENDPOINT_B],
        InMemorySeriesStore::new(),
        vec![5, 15, 30],
        200,
    );
    let mut state = pipeline.initialize().unwrap();

    harness.quote(ENDPOINT_A, "67000.00");
    let first = pipeline.run_cycle(&mut state).await.unwrap();

    harness.clock.advance(60);
    harness.fail(ENDPOINT_A);
    harness.fail(ENDPOINT_B);
    let err = pipeline.run_cycle(&mut state).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Source(QuoteError::SourceUnavailable { attempts: 2 })
    ));
    assert_eq!(pipeline.series().len(), 1);
    assert_eq!(state.last_report.as_ref(), Some(&first));
    assert_eq!(state.last_quote().map(|q| q.price), Some(dec!(67000.00)));
    assert_eq!(state.failed_cycles, 1);
    assert_eq!(state.cycles, 2);
}

#[tokio::test]
async fn test_persistence_failure_uses_working_copy() {
    let harness = Harness::new();
    let mut store = InMemorySeriesStore::with_series(history(3));
    store.set_fail_writes(true);
    let mut pipeline = harness.pipeline(&[ENDPOINT_A], store, vec![1], 200);
    let mut state = pipeline.initialize().unwrap();

    harness.quote(ENDPOINT_A, "6.9100");
    let report = pipeline.run_cycle(&mut state).await.unwrap();
    assert!(report.admission.is_admitted());
    assert!(!report.persisted);
    assert_eq!(report.series_length, 4);
    assert_eq!(report.points.last().map(|p| p.price), Some(dec!(6.9100)));
    assert_eq!(pipeline.series().len(), 3);

    // Gate still measures from the last durable sample
    harness.clock.advance(30);
    harness.quote(ENDPOINT_A, "6.9200");
    let report = pipeline.run_cycle(&mut state).await.unwrap();
    assert_eq!(report.admission, Admission::Admitted { elapsed_secs: 90 });
    assert!(!report.persisted);
}

#[tokio::test]
async fn test_store_rejects_non_increasing_sample() {
    let mut store = InMemorySeriesStore::with_series(history(2));
    let last = store.last_timestamp().unwrap();

    let result = store.append(Sample::new(last, dec!(7)));
    assert!(result.is_err());
    assert_eq!(store.series().len(), 2);
}

#[tokio::test]
async fn test_fit_failure_still_reports_fresh_price() {
    let harness = Harness::new();
    let mut pipeline = harness.pipeline_with(
        &[ENDPOINT_A],
        InMemorySeriesStore::with_series(history(5)),
        vec![1],
        Box::new(FailingPredictor),
    );
    let mut state = pipeline.initialize().unwrap();

    harness.quote(ENDPOINT_A, "6.9120");
    let report = pipeline.run_cycle(&mut state).await.unwrap();

    assert!(report.persisted);
    assert_eq!(report.current_price(), dec!(6.9120));
    assert_eq!(report.series_length, 6);
    assert_eq!(
        report.prediction,
        Prediction::Failed {
            reason: "Classifier fit failed: line search failed".to_string()
        }
    );
    assert_eq!(report.prediction.probability(), None);
    assert_eq!(pipeline.series().len(), 6);
    assert_eq!(state.last_quote().map(|q| q.price), Some(dec!(6.9120)));
    assert_eq!(state.failed_cycles, 0);
}

#[tokio::test]
async fn test_unchanged_quote_across_cycles() {
    let harness = Harness::new();
    harness.transport.always(
        &harness.source.ticker_url(ENDPOINT_A),
        json!({"symbol": "BTCUSDT", "price": "67000.00"}),
    );
    let mut pipeline = harness.pipeline(&[ENDPOINT_A], InMemorySeriesStore::new(), vec![1], 200);
    let mut state = pipeline.initialize().unwrap();

    for _ in 0..3 {
        let report = pipeline.run_cycle(&mut state).await.unwrap();
        assert!(report.admission.is_admitted());
        harness.clock.advance(60);
    }

    let report = pipeline.run_cycle(&mut state).await.unwrap();
    assert_eq!(report.series_length, 4);
    // Flat prices: every return after the first is zero
    assert!(report.points.iter().skip(1).all(|p| p.return_pct == Some(0.0)));
    assert_eq!(harness.transport.calls().len(), 4);
}
