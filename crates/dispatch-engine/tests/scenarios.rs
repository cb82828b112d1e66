//! End-to-end scenarios S1-S6 from spec §8, exercised against a bare
//! [`Engine`] with no HTTP layer involved.

use std::collections::HashMap;
use std::time::Duration;

use dispatch_engine::assignment::ClaimOutcome;
use dispatch_engine::engine::{Engine, EngineConfig};
use dispatch_engine::error::EngineError;

fn engine() -> Engine {
    Engine::new(EngineConfig::default())
}

/// S1: happy path, two workers, no dataset, no requirement.
#[test]
fn s1_happy_path() {
    let engine = engine();
    let submitted = engine
        .submit_job("acme".into(), b"print(1)".to_vec(), None, None, 2)
        .unwrap();

    let claim1 = engine.claim("W1".into()).unwrap();
    let claim2 = engine.claim("W2".into()).unwrap();
    assert_ne!(claim1.worker_index, claim2.worker_index);
    assert_eq!(claim1.total_workers, 2);

    engine
        .submit_result(
            "W1".into(),
            submitted.customer_id,
            b"ok from W1".to_vec(),
            b"{}".to_vec(),
            HashMap::new(),
        )
        .unwrap();
    let outcome = engine
        .submit_result(
            "W2".into(),
            submitted.customer_id,
            b"ok from W2".to_vec(),
            b"{}".to_vec(),
            HashMap::new(),
        )
        .unwrap();
    assert!(outcome.is_completed);

    let status = engine.status(submitted.customer_id).unwrap();
    assert_eq!(
        (status.submitted, status.total, status.percentage),
        (2, 2, 100)
    );
    assert!(status.is_completed);
    assert!(!status.is_cancelled);
    assert!(status.can_download);

    let view = engine.poll_updates(submitted.customer_id).unwrap();
    assert!(view.updates.iter().any(|u| u.is_completion));

    let snapshot = engine.snapshot_for_download(submitted.customer_id).unwrap();
    assert_eq!(snapshot.results.len(), 2);
    assert_eq!(snapshot.usage.len(), 2);
}

/// S2: heartbeat timeout, single worker, no submission, then rescue.
///
/// Uses a near-zero configured timeout rather than the 30s default so the
/// test can observe a real stall without sleeping for 31 seconds; the
/// sweep logic itself is identical regardless of the configured duration.
#[test]
fn s2_heartbeat_timeout_and_rescue() {
    let engine = Engine::new(EngineConfig {
        heartbeat_timeout: Duration::from_millis(1),
        sweep_interval: Duration::from_millis(1),
    });
    let submitted = engine
        .submit_job("acme".into(), b"code".to_vec(), None, None, 1)
        .unwrap();

    engine.claim("W1".into()).unwrap();
    std::thread::sleep(Duration::from_millis(5));
    engine.run_fault_sweep();

    let view = engine.poll_updates(submitted.customer_id).unwrap();
    assert!(view.updates.iter().any(|u| u.text.contains("timed out")));

    let claim2 = engine.claim("W2".into()).unwrap();
    assert_eq!(claim2.worker_index, 0);

    let outcome = engine
        .submit_result(
            "W2".into(),
            submitted.customer_id,
            b"ok".to_vec(),
            b"{}".to_vec(),
            HashMap::new(),
        )
        .unwrap();
    assert!(outcome.is_completed);
}

/// S3: cancellation mid-flight with three requested workers.
#[test]
fn s3_cancellation_mid_flight() {
    let engine = engine();
    let submitted = engine
        .submit_job("acme".into(), b"code".to_vec(), None, None, 3)
        .unwrap();

    engine.claim("W1".into()).unwrap();
    engine.claim("W2".into()).unwrap();

    engine
        .submit_result(
            "W1".into(),
            submitted.customer_id,
            b"ok".to_vec(),
            b"{}".to_vec(),
            HashMap::new(),
        )
        .unwrap();

    engine.cancel(submitted.customer_id).unwrap();

    let status = engine.status(submitted.customer_id).unwrap();
    assert!(status.is_cancelled);
    assert!(!status.is_completed);

    let result = engine.submit_result(
        "W2".into(),
        submitted.customer_id,
        b"late".to_vec(),
        b"{}".to_vec(),
        HashMap::new(),
    );
    assert_eq!(result, Err(EngineError::Cancelled(submitted.customer_id)));

    let download = engine.snapshot_for_download(submitted.customer_id);
    assert_eq!(download, Err(EngineError::Cancelled(submitted.customer_id)));
}

/// S4: duplicate submission from the same worker.
#[test]
fn s4_duplicate_submission_rejected() {
    let engine = engine();
    let submitted = engine
        .submit_job("acme".into(), b"code".to_vec(), None, None, 1)
        .unwrap();
    engine.claim("W1".into()).unwrap();

    engine
        .submit_result(
            "W1".into(),
            submitted.customer_id,
            b"first".to_vec(),
            b"{}".to_vec(),
            HashMap::new(),
        )
        .unwrap();

    let second = engine.submit_result(
        "W1".into(),
        submitted.customer_id,
        b"second".to_vec(),
        b"{}".to_vec(),
        HashMap::new(),
    );
    assert_eq!(
        second,
        Err(EngineError::Duplicate {
            worker: "W1".into(),
            customer: submitted.customer_id
        })
    );

    let snapshot = engine.snapshot_for_download(submitted.customer_id).unwrap();
    assert_eq!(
        snapshot.results.get(&dispatch_engine::WorkerId::from("W1")),
        Some(&b"first".to_vec())
    );
}

/// S5: uneven shard split across three workers.
#[test]
fn s5_uneven_shard_split_reproduces_original_bytes() {
    let engine = engine();
    let dataset = b"0123456789".to_vec();
    let submitted = engine
        .submit_job(
            "acme".into(),
            b"code".to_vec(),
            None,
            Some(dataset.clone()),
            3,
        )
        .unwrap();

    let mut shards_in_claim_order = Vec::new();
    for worker in ["W1", "W2", "W3"] {
        let claimed = engine.claim(worker.into()).unwrap();
        shards_in_claim_order.push(claimed.dataset_shard);
    }

    assert_eq!(
        shards_in_claim_order.iter().map(Vec::len).collect::<Vec<_>>(),
        vec![4, 4, 2]
    );
    let rejoined: Vec<u8> = shards_in_claim_order.into_iter().flatten().collect();
    assert_eq!(rejoined, dataset);
    let _ = submitted;
}

/// S6: claiming against a deleted job doesn't crash and drops the unit.
#[test]
fn s6_claim_against_deleted_job() {
    let engine = engine();
    let submitted = engine
        .submit_job("acme".into(), b"code".to_vec(), None, None, 2)
        .unwrap();

    engine.delete_job(submitted.customer_id);

    let result = engine.claim("W1".into());
    assert_eq!(result, Err(ClaimOutcome::NoWork));

    // The second unit for the deleted job is still queued; one more claim
    // drains it without panicking.
    let result2 = engine.claim("W2".into());
    assert_eq!(result2, Err(ClaimOutcome::NoWork));
}
