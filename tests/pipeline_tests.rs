mod common;

use std::sync::Arc;

use common::{MemoryCache, MemoryStore};
use pricing_pipeline::detector::AnomalyDetector;
use pricing_pipeline::error::DecodeError;
use pricing_pipeline::pipeline::{DualWriter, Processor};

fn processor(store: &Arc<MemoryStore>, cache: &Arc<MemoryCache>) -> Processor {
    Processor::new(
        AnomalyDetector::new(0.02),
        DualWriter::new(store.clone(), cache.clone()),
    )
}

fn payload(symbol: &str, price: f64, ts: &str) -> Vec<u8> {
    format!(
        r#"{{"symbol":"{}","price":{},"volume":0.5,"ts":"{}"}}"#,
        symbol, price, ts
    )
    .into_bytes()
}

#[tokio::test]
async fn valid_payload_flows_to_both_stores() {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::new());
    let mut processor = processor(&store, &cache);

    let outcome = processor
        .process_message(&payload("BTC-USD", 50000.0, "2026-01-01T00:00:00Z"))
        .await
        .unwrap();

    assert!(outcome.fully_persisted());
    let rows = store.rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].symbol, "BTC-USD");
    assert!(!rows[0].is_anomaly);
    assert_eq!(rows[0].ma_1m, None);
    assert_eq!(rows[0].ma_5m, None);
    assert_eq!(rows[0].vol_1m, None);
    assert!(cache.entry("BTC-USD").is_some());
}

#[tokio::test]
async fn malformed_json_is_dropped_without_side_effects() {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::new());
    let mut processor = processor(&store, &cache);

    let result = processor.process_message(b"not a tick").await;
    assert!(matches!(result, Err(DecodeError::Json(_))));

    assert_eq!(store.row_count(), 0);
    assert_eq!(cache.entry("BTC-USD"), None);
    assert_eq!(processor.detector().last_price("BTC-USD"), None);
}

#[tokio::test]
async fn contract_violations_are_dropped() {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::new());
    let mut processor = processor(&store, &cache);

    let cases: [&[u8]; 4] = [
        br#"{"symbol":"","price":1.0,"volume":0.5,"ts":"2026-01-01T00:00:00Z"}"#,
        br#"{"symbol":"BTC-USD","price":0.0,"volume":0.5,"ts":"2026-01-01T00:00:00Z"}"#,
        br#"{"symbol":"BTC-USD","price":-5.0,"volume":0.5,"ts":"2026-01-01T00:00:00Z"}"#,
        br#"{"symbol":"BTC-USD","price":1.0,"volume":-0.5,"ts":"2026-01-01T00:00:00Z"}"#,
    ];
    for case in cases {
        let result = processor.process_message(case).await;
        assert!(
            matches!(result, Err(DecodeError::Invalid(_))),
            "payload should be rejected: {}",
            String::from_utf8_lossy(case)
        );
    }

    assert_eq!(store.row_count(), 0);
    // Rejected ticks never touch detector state.
    assert_eq!(processor.detector().last_price("BTC-USD"), None);
}

#[tokio::test]
async fn anomaly_flag_reaches_both_stores() {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::new());
    let mut processor = processor(&store, &cache);

    processor
        .process_message(&payload("BTC-USD", 50000.0, "2026-01-01T00:00:00Z"))
        .await
        .unwrap();
    processor
        .process_message(&payload("BTC-USD", 53000.0, "2026-01-01T00:00:01Z"))
        .await
        .unwrap();

    let rows = store.rows();
    assert!(!rows[0].is_anomaly);
    assert!(rows[1].is_anomaly, "6% move must be flagged");
    assert_eq!(cache.entry("BTC-USD").unwrap().is_anomaly, "1");
}

#[tokio::test]
async fn duplicate_delivery_appends_twice_and_overwrites_latest() {
    // At-least-once delivery: a redelivered message is simply processed
    // again. The duplicate shows a 0% change, so it is never anomalous.
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::new());
    let mut processor = processor(&store, &cache);

    let msg = payload("BTC-USD", 53000.0, "2026-01-01T00:00:00Z");
    processor.process_message(&msg).await.unwrap();
    processor.process_message(&msg).await.unwrap();

    assert_eq!(store.row_count(), 2);
    let rows = store.rows();
    assert!(!rows[1].is_anomaly);
    assert_eq!(cache.entry("BTC-USD").unwrap().price, "53000");
}

#[tokio::test]
async fn store_failures_do_not_stop_processing() {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(MemoryCache::new());
    let mut processor = processor(&store, &cache);

    store.fail_inserts(true);
    let outcome = processor
        .process_message(&payload("BTC-USD", 50000.0, "2026-01-01T00:00:00Z"))
        .await
        .unwrap();
    assert!(outcome.durable.is_err());

    // Detector state advanced anyway; the next tick compares against the
    // failed one, and processing continues.
    assert_eq!(processor.detector().last_price("BTC-USD"), Some(50000.0));

    store.fail_inserts(false);
    let outcome = processor
        .process_message(&payload("BTC-USD", 50500.0, "2026-01-01T00:00:01Z"))
        .await
        .unwrap();
    assert!(outcome.fully_persisted());
    assert_eq!(store.row_count(), 1);
}
