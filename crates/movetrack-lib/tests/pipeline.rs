//! End-to-end batch processing over the in-memory cache and a recording sink.

mod common;

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;

use common::{ping_record, raw_record, RecordingForwarder};
use movetrack_lib::{
    DeliveryPolicy, LocationCache, MemoryLocationCache, PingProcessor, StreamRecord,
};

const THRESHOLD_M: f64 = 100.0;

fn processor(
    cache: Arc<MemoryLocationCache>,
    sink: Arc<RecordingForwarder>,
) -> PingProcessor<Arc<MemoryLocationCache>, Arc<RecordingForwarder>> {
    PingProcessor::new(cache, sink, THRESHOLD_M, DeliveryPolicy::BestEffort)
}

#[tokio::test]
async fn batch_of_distinct_new_users_fills_cache_and_sink() {
    let cache = Arc::new(MemoryLocationCache::new());
    let sink = RecordingForwarder::new();
    let processor = processor(Arc::clone(&cache), Arc::clone(&sink));

    let records: Vec<StreamRecord> = (0..5)
        .map(|i| ping_record(&format!("user-{i}"), 10.0 + i as f64, 20.0))
        .collect();

    let summary = processor.process_batch(&records).await.unwrap();

    assert_eq!(summary.processed, 5);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.forwarded, 5);
    assert_eq!(cache.len().await, 5);
    assert_eq!(sink.events().await.len(), 5);
}

#[tokio::test]
async fn malformed_record_is_skipped_without_aborting_the_batch() {
    let cache = Arc::new(MemoryLocationCache::new());
    let sink = RecordingForwarder::new();
    let processor = processor(Arc::clone(&cache), Arc::clone(&sink));

    let records = vec![
        ping_record("abc", 10.0, 10.0),
        // Missing lat: validation failure, not a decode failure.
        raw_record("def", &json!({ "userID": "def", "lng": 20.0 })),
        ping_record("ghi", 30.0, 30.0),
    ];

    let summary = processor.process_batch(&records).await.unwrap();

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.forwarded, 2);

    // The invalid record must not touch the cache.
    assert!(cache.get("def").await.unwrap().is_none());
    assert!(cache.get("abc").await.unwrap().is_some());
    assert!(cache.get("ghi").await.unwrap().is_some());
}

#[tokio::test]
async fn wrong_typed_field_is_skipped_and_later_records_still_process() {
    let cache = Arc::new(MemoryLocationCache::new());
    let sink = RecordingForwarder::new();
    let processor = processor(Arc::clone(&cache), Arc::clone(&sink));

    // Valid JSON with a wrong-typed lat must not abort the batch: it is a
    // validation failure, and the valid record behind it still processes.
    let records = vec![
        raw_record("bad", &json!({ "userID": "bad", "lat": "oops", "lng": 1.0 })),
        ping_record("good", 10.0, 10.0),
    ];

    let summary = processor.process_batch(&records).await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.processed, 1);
    assert!(cache.get("bad").await.unwrap().is_none());
    assert!(cache.get("good").await.unwrap().is_some());
    assert_eq!(sink.events().await.len(), 1);
}

#[tokio::test]
async fn undecodable_payload_fails_the_whole_batch() {
    let cache = Arc::new(MemoryLocationCache::new());
    let sink = RecordingForwarder::new();
    let processor = processor(Arc::clone(&cache), Arc::clone(&sink));

    let records = vec![StreamRecord {
        partition_key: "abc".to_string(),
        data: BASE64.encode("not json at all"),
    }];

    assert!(processor.process_batch(&records).await.is_err());
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn out_of_range_coordinates_are_skipped() {
    let cache = Arc::new(MemoryLocationCache::new());
    let sink = RecordingForwarder::new();
    let processor = processor(Arc::clone(&cache), Arc::clone(&sink));

    let records = vec![raw_record(
        "abc",
        &json!({ "userID": "abc", "lat": 95.0, "lng": 10.0 }),
    )];

    let summary = processor.process_batch(&records).await.unwrap();
    assert_eq!(summary.skipped, 1);
    assert!(cache.is_empty().await);
}

#[tokio::test]
async fn three_ping_scenario_new_unchanged_moved() {
    let cache = Arc::new(MemoryLocationCache::new());
    let sink = RecordingForwarder::new();
    let processor = processor(Arc::clone(&cache), Arc::clone(&sink));

    // ping1: cache empty, classify NEW.
    processor
        .process_batch(&[ping_record("abc", 10.0, 10.0)])
        .await
        .unwrap();
    assert_eq!(sink.events().await.len(), 1);
    let cached = cache.get("abc").await.unwrap().unwrap();
    assert_eq!((cached.lat, cached.lng), (10.0, 10.0));

    // ping2: identical coordinates, classify UNCHANGED; sink untouched.
    processor
        .process_batch(&[ping_record("abc", 10.0, 10.0)])
        .await
        .unwrap();
    assert_eq!(sink.events().await.len(), 1);
    let cached = cache.get("abc").await.unwrap().unwrap();
    assert_eq!((cached.lat, cached.lng), (10.0, 10.0));

    // ping3: ~1.1 km away with a 100 m threshold, classify MOVED.
    processor
        .process_batch(&[ping_record("abc", 10.01, 10.0)])
        .await
        .unwrap();
    let events = sink.events().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].lat, 10.01);
    let cached = cache.get("abc").await.unwrap().unwrap();
    assert_eq!((cached.lat, cached.lng), (10.01, 10.0));
}

#[tokio::test]
async fn cache_is_refreshed_even_when_unchanged() {
    let cache = Arc::new(MemoryLocationCache::new());
    let sink = RecordingForwarder::new();
    let processor = processor(Arc::clone(&cache), Arc::clone(&sink));

    processor
        .process_batch(&[ping_record("abc", 10.0, 10.0)])
        .await
        .unwrap();
    let first = cache.get("abc").await.unwrap().unwrap();

    // A small drift below the threshold still overwrites the entry.
    processor
        .process_batch(&[ping_record("abc", 10.0001, 10.0)])
        .await
        .unwrap();
    let second = cache.get("abc").await.unwrap().unwrap();

    assert_eq!(sink.events().await.len(), 1);
    assert_ne!(first.lat, second.lat);
    assert_eq!(second.lat, 10.0001);
}

#[tokio::test]
async fn redelivered_batch_converges_to_the_same_cache_state() {
    let cache = Arc::new(MemoryLocationCache::new());
    let sink = RecordingForwarder::new();
    let processor = processor(Arc::clone(&cache), Arc::clone(&sink));

    let batch = vec![
        ping_record("abc", 10.0, 10.0),
        ping_record("def", 20.0, 20.0),
        ping_record("abc", 10.01, 10.0),
    ];

    processor.process_batch(&batch).await.unwrap();
    let abc_once = cache.get("abc").await.unwrap().unwrap();
    let def_once = cache.get("def").await.unwrap().unwrap();

    // Simulate the runtime retrying the whole batch after a crash. Duplicate
    // sink events are allowed; the cache must converge.
    processor.process_batch(&batch).await.unwrap();
    let abc_twice = cache.get("abc").await.unwrap().unwrap();
    let def_twice = cache.get("def").await.unwrap().unwrap();

    assert_eq!(cache.len().await, 2);
    assert_eq!((abc_once.lat, abc_once.lng), (abc_twice.lat, abc_twice.lng));
    assert_eq!((def_once.lat, def_once.lng), (def_twice.lat, def_twice.lng));
}

#[tokio::test]
async fn interleaved_users_are_classified_independently() {
    let cache = Arc::new(MemoryLocationCache::new());
    let sink = RecordingForwarder::new();
    let processor = processor(Arc::clone(&cache), Arc::clone(&sink));

    let batch = vec![
        ping_record("abc", 10.0, 10.0),  // NEW
        ping_record("def", 50.0, 50.0),  // NEW
        ping_record("abc", 10.0, 10.0),  // UNCHANGED
        ping_record("def", 50.01, 50.0), // MOVED
    ];

    let summary = processor.process_batch(&batch).await.unwrap();
    assert_eq!(summary.processed, 4);
    assert_eq!(summary.forwarded, 3);
    assert_eq!(cache.len().await, 2);
}
