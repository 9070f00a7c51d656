//! End-to-end pipeline tests against injected events.
//!
//! These drive `Gateway::ingest`, the same chain the live stream runs,
//! with a deterministic clock, a recording verifier, and an inspectable
//! sink.

use std::sync::Arc;

use tagwatch::FixedClock;
use tagwatch::verifier::Verdict;

use super::helpers::{
    RecordingVerifier, event_empty_response, event_missing_payload, event_with_payload_tid,
    gateway_offline, heartbeat_event, valid_event,
};

const TTL_MILLIS: u64 = 24 * 3600 * 1000;

#[tokio::test]
async fn first_observation_verifies_then_cache_hit() {
    let clock = Arc::new(FixedClock::new(0));
    let verifier = RecordingVerifier::authentic();
    let (gateway, sink) = gateway_offline(clock.clone(), verifier.clone());

    let event = valid_event("T1", "EPC1", "AABB", "CCDD");
    gateway.ingest(&event).await.unwrap();

    // One entry, first and last seen at t=0; verifier consulted once.
    let active = gateway.active_tags();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].first_seen, 0);
    assert_eq!(active[0].last_seen, 0);
    assert_eq!(verifier.call_count(), 1);
    assert_eq!(
        gateway.cache().get("T1"),
        Some((true, Some("verified".to_string())))
    );

    let record = sink.get("T1").unwrap();
    assert!(record.authentic);
    assert_eq!(record.epc_hex.as_deref(), Some("EPC1"));

    // Re-observation within the TTL: cache hit, verifier untouched,
    // presence refreshed.
    clock.set(1000);
    gateway.ingest(&event).await.unwrap();

    assert_eq!(verifier.call_count(), 1);
    assert_eq!(sink.len(), 1);
    let active = gateway.active_tags();
    assert_eq!(active[0].first_seen, 0);
    assert_eq!(active[0].last_seen, 1000);
}

#[tokio::test]
async fn unobserved_tag_leaves_active_set_after_grace() {
    let clock = Arc::new(FixedClock::new(0));
    let (gateway, _sink) = gateway_offline(clock.clone(), RecordingVerifier::authentic());

    gateway
        .ingest(&valid_event("T2", "EPC2", "AABB", "CCDD"))
        .await
        .unwrap();

    clock.set(2000);
    assert_eq!(gateway.active_tags().len(), 1);

    clock.set(4000);
    assert!(gateway.active_tags().is_empty());
    // The verdict outlives presence.
    assert!(gateway.cache().get("T2").is_some());
}

#[tokio::test]
async fn missing_payload_never_reaches_verifier() {
    let clock = Arc::new(FixedClock::new(0));
    let verifier = RecordingVerifier::authentic();
    let (gateway, sink) = gateway_offline(clock, verifier.clone());

    gateway
        .ingest(&event_missing_payload("T3", "EPC3"))
        .await
        .unwrap();

    assert_eq!(verifier.call_count(), 0);
    // Presence is tracked regardless of authentication outcome.
    assert_eq!(gateway.active_tags().len(), 1);
    assert_eq!(
        gateway.cache().get("T3"),
        Some((false, Some("missing authentication response".to_string())))
    );

    let record = sink.get("T3").unwrap();
    assert!(!record.authentic);
    assert_eq!(
        record.detail.as_deref(),
        Some("missing authentication response")
    );
}

#[tokio::test]
async fn empty_response_never_reaches_verifier() {
    let clock = Arc::new(FixedClock::new(0));
    let verifier = RecordingVerifier::authentic();
    let (gateway, sink) = gateway_offline(clock, verifier.clone());

    gateway.ingest(&event_empty_response("T4")).await.unwrap();

    assert_eq!(verifier.call_count(), 0);
    assert_eq!(
        gateway.cache().get("T4"),
        Some((false, Some("empty response".to_string())))
    );
    assert_eq!(sink.get("T4").unwrap().detail.as_deref(), Some("empty response"));
}

#[tokio::test]
async fn payload_without_tid_falls_back_to_envelope() {
    let clock = Arc::new(FixedClock::new(0));
    let verifier = RecordingVerifier::authentic();
    let (gateway, sink) = gateway_offline(clock, verifier.clone());

    let event = event_with_payload_tid("OUTER", "EPC", "AABB", "CCDD", None);
    gateway.ingest(&event).await.unwrap();

    let calls = verifier.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].tid_hex, "OUTER");
    assert!(sink.get("OUTER").is_some());
}

#[tokio::test]
async fn verdict_is_recomputed_after_ttl() {
    let clock = Arc::new(FixedClock::new(0));
    let verifier = RecordingVerifier::authentic();
    let (gateway, _sink) = gateway_offline(clock.clone(), verifier.clone());

    let event = valid_event("T5", "EPC5", "AABB", "CCDD");
    gateway.ingest(&event).await.unwrap();
    assert_eq!(verifier.call_count(), 1);

    clock.set(TTL_MILLIS + 1);
    gateway.ingest(&event).await.unwrap();
    assert_eq!(verifier.call_count(), 2);
    assert!(gateway.cache().get("T5").is_some());
}

#[tokio::test]
async fn ignored_events_touch_nothing() {
    let clock = Arc::new(FixedClock::new(0));
    let verifier = RecordingVerifier::authentic();
    let (gateway, sink) = gateway_offline(clock, verifier.clone());

    gateway.ingest(&heartbeat_event()).await.unwrap();

    let no_tid: tagwatch::event::ReaderEvent = serde_json::from_str(
        r#"{"eventType": "tagInventory", "tagInventoryEvent": {"tidHex": ""}}"#,
    )
    .unwrap();
    gateway.ingest(&no_tid).await.unwrap();

    assert!(gateway.active_tags().is_empty());
    assert_eq!(gateway.cache_snapshot().count, 0);
    assert!(sink.is_empty());
    assert_eq!(verifier.call_count(), 0);
}

#[tokio::test]
async fn verifier_failure_detail_is_cached_and_persisted() {
    let clock = Arc::new(FixedClock::new(0));
    let verifier = RecordingVerifier::rejecting("verification service unreachable");
    let (gateway, sink) = gateway_offline(clock, verifier);

    gateway
        .ingest(&valid_event("T6", "EPC6", "AABB", "CCDD"))
        .await
        .unwrap();

    assert_eq!(
        gateway.cache().get("T6"),
        Some((
            false,
            Some("verification service unreachable".to_string())
        ))
    );
    assert!(!sink.get("T6").unwrap().authentic);
}

#[tokio::test]
async fn cached_negative_verdict_suppresses_reverification() {
    let clock = Arc::new(FixedClock::new(0));
    let verifier = RecordingVerifier::authentic();
    let (gateway, _sink) = gateway_offline(clock, verifier.clone());

    // The invalid cycle caches a deterministic failure...
    gateway.ingest(&event_missing_payload("T7", "EPC")).await.unwrap();
    // ...which a later complete payload hits instead of the verifier, until
    // the TTL rolls over.
    gateway
        .ingest(&valid_event("T7", "EPC", "AABB", "CCDD"))
        .await
        .unwrap();

    assert_eq!(verifier.call_count(), 0);
    let (authentic, _) = gateway.cache().get("T7").unwrap();
    assert!(!authentic);
}

#[tokio::test]
async fn scan_results_join_presence_with_verdicts() {
    let clock = Arc::new(FixedClock::new(0));
    let verifier = RecordingVerifier::with_verdict(Verdict::authentic("verified"));
    let (gateway, _sink) = gateway_offline(clock.clone(), verifier);

    gateway
        .ingest(&valid_event("GOOD", "EPC-G", "AABB", "CCDD"))
        .await
        .unwrap();
    clock.set(100);
    gateway.ingest(&event_missing_payload("BAD", "EPC-B")).await.unwrap();

    // Present but never authenticated: registry only, no cache entry.
    clock.set(200);
    gateway
        .registry()
        .observe("PENDING", None, None, None, 200)
        .unwrap();

    let results = gateway.scan_results();
    // PENDING is excluded; newest discovery first.
    let ids: Vec<&str> = results.iter().map(|r| r.tag_id.as_str()).collect();
    assert_eq!(ids, ["BAD", "GOOD"]);
    assert!(!results[0].authentic);
    assert!(results[1].authentic);
    assert_eq!(results[1].detail.as_deref(), Some("verified"));
}

#[tokio::test]
async fn snapshots_report_both_views() {
    let clock = Arc::new(FixedClock::new(0));
    let (gateway, _sink) = gateway_offline(clock, RecordingVerifier::authentic());

    gateway
        .ingest(&valid_event("B", "EPC", "AABB", "CCDD"))
        .await
        .unwrap();
    gateway.ingest(&event_missing_payload("A", "EPC")).await.unwrap();

    let registry = gateway.registry_snapshot();
    assert_eq!(registry.count, 2);

    let cache = gateway.cache_snapshot();
    assert_eq!(cache.count, 2);
    let ids: Vec<&str> = cache.entries.iter().map(|e| e.tag_id.as_str()).collect();
    assert_eq!(ids, ["A", "B"]);
}
