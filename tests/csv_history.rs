use chrono::{Duration, TimeZone, Utc};
use pricecast::domain::market::series::Sample;
use pricecast::domain::ml::features::FeatureBuilder;
use pricecast::domain::ml::labels::build_labels;
use pricecast::domain::ports::SeriesStore;
use pricecast::infrastructure::persistence::CsvSeriesStore;
use rust_decimal_macros::dec;
use std::fs;
use std::path::PathBuf;

fn temp_file(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pricecast-it-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = fs::remove_file(&path);
    path
}

#[test]
fn test_restart_resumes_identical_series() {
    let path = temp_file("restart.csv");
    let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap() + Duration::microseconds(123_456);

    let mut store = CsvSeriesStore::new(&path);
    store.load().unwrap();
    store.append(Sample::new(t0, dec!(100))).unwrap();
    store.append(Sample::new(t0 + Duration::seconds(60), dec!(101))).unwrap();
    store.append(Sample::new(t0 + Duration::seconds(120), dec!(100))).unwrap();
    let written = store.series().clone();

    let mut reopened = CsvSeriesStore::new(&path);
    let loaded = reopened.load().unwrap();
    assert_eq!(loaded, written);

    // Same history, same features
    let builder = FeatureBuilder::default();
    let before = builder.build(&written);
    let after = builder.build(&loaded);
    assert_eq!(before.len(), after.len());
    for (a, b) in before.iter().zip(&after) {
        assert_eq!(a.timestamp, b.timestamp);
        assert_eq!(a.means, b.means);
    }

    let targets: Vec<Option<u8>> = build_labels(&loaded).iter().map(|l| l.target).collect();
    assert_eq!(targets, vec![Some(1), Some(0), None]);
}

#[test]
fn test_append_after_reload_extends_file() {
    let path = temp_file("extend.csv");
    let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

    let mut store = CsvSeriesStore::new(&path);
    store.load().unwrap();
    store.append(Sample::new(t0, dec!(6.95))).unwrap();

    let mut reopened = CsvSeriesStore::new(&path);
    reopened.load().unwrap();
    reopened.append(Sample::new(t0 + Duration::seconds(60), dec!(6.97))).unwrap();
    assert!(reopened.append(Sample::new(t0, dec!(6.99))).is_err());

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(
        content.lines().collect::<Vec<_>>(),
        vec!["timestamp,price", "2025-06-01T12:00:00Z,6.95", "2025-06-01T12:01:00Z,6.97"]
    );
}
