use crate::fixtures::payloads::{decision, proposal_bytes, vote_bytes, CHAIN_ID};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vigil_core::domain::coordinate::{HrsKey, HrstKey};
use vigil_core::domain::watermark::{
    load_or_create_sign_state, ChainSignStateConsensus, SignState,
};
use vigil_core::foundation::util::time::now_nanos;
use vigil_core::foundation::{ChainId, ErrorCode, STEP_PREVOTE, STEP_PROPOSE};

fn fresh_state(dir: &TempDir, name: &str) -> SignState {
    load_or_create_sign_state(dir.path().join(name)).expect("load or create sign state")
}

#[test]
fn test_monotonic_advance() {
    let dir = TempDir::new().expect("temp dir");
    let state = fresh_state(&dir, "state.json");

    let b1 = proposal_bytes(1, 0, 0xAA, 100);
    state
        .save(decision(1, 0, STEP_PROPOSE, 0xA1, b1), None)
        .expect("first save");
    assert_eq!(state.hrs_key(), HrsKey::new(1, 0, 1));

    let b2 = vote_bytes(STEP_PREVOTE, 1, 0, Some(0xAA), 100);
    state
        .save(decision(1, 0, 2, 0xB2, b2), None)
        .expect("second save");
    assert_eq!(state.hrs_key(), HrsKey::new(1, 0, 2));

    let err = state
        .save(decision(1, 0, 1, 0xC3, vec![1]), None)
        .unwrap_err();
    assert!(err.is_regression());
    assert_eq!(state.hrs_key(), HrsKey::new(1, 0, 2));
}

#[test]
fn test_equal_hrs_replay_returns_existing_signature() {
    let dir = TempDir::new().expect("temp dir");
    let state = fresh_state(&dir, "state.json");

    let b2 = vote_bytes(STEP_PREVOTE, 1, 0, Some(0xAA), 100);
    state
        .save(decision(1, 0, 2, 0xB2, b2.clone()), None)
        .expect("save");

    let existing = state
        .existing_signature_or_error_if_regression(HrstKey::new(1, 0, 2, now_nanos()), &b2)
        .expect("replay permitted");
    assert_eq!(existing, Some(vec![0xB2; 64]));
}

#[test]
fn test_save_at_same_hrs_is_rejected_with_same_hrs() {
    let dir = TempDir::new().expect("temp dir");
    let state = fresh_state(&dir, "state.json");

    let bytes = vote_bytes(STEP_PREVOTE, 2, 0, Some(0xAA), 100);
    state
        .save(decision(2, 0, 2, 0x01, bytes.clone()), None)
        .expect("save");

    let err = state
        .save(decision(2, 0, 2, 0x02, bytes), None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::SameHrs);
    assert!(!err.is_regression());
}

#[test]
fn test_timestamp_only_vote_difference_permits_resign() {
    let dir = TempDir::new().expect("temp dir");
    let state = fresh_state(&dir, "state.json");

    let signed = vote_bytes(STEP_PREVOTE, 2, 0, Some(0xAA), 100);
    state
        .save(decision(2, 0, 2, 0x01, signed), None)
        .expect("save");

    // Identical vote, refreshed timestamp: permission to re-sign, no
    // stored signature handed back.
    let refreshed = vote_bytes(STEP_PREVOTE, 2, 0, Some(0xAA), 250);
    let existing = state
        .existing_signature_or_error_if_regression(HrstKey::new(2, 0, 2, 555), &refreshed)
        .expect("re-sign permitted");
    assert_eq!(existing, None);

    // The watermark still refuses to move for an equal coordinate; callers
    // treat SameHrs as non-fatal and release the fresh signature.
    let err = state
        .save(decision(2, 0, 2, 0x02, refreshed), None)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::SameHrs);
}

#[test]
fn test_timestamp_only_proposal_difference_permits_resign() {
    let dir = TempDir::new().expect("temp dir");
    let state = fresh_state(&dir, "state.json");

    let signed = proposal_bytes(2, 0, 0xAA, 100);
    state
        .save(decision(2, 0, STEP_PROPOSE, 0x01, signed), None)
        .expect("save");

    let refreshed = proposal_bytes(2, 0, 0xAA, 250);
    let existing = state
        .existing_signature_or_error_if_regression(HrstKey::new(2, 0, STEP_PROPOSE, 555), &refreshed)
        .expect("re-sign permitted");
    assert_eq!(existing, None);
}

#[test]
fn test_conflicting_block_id_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let state = fresh_state(&dir, "state.json");

    let signed = vote_bytes(STEP_PREVOTE, 3, 0, Some(0xAA), 100);
    state
        .save(decision(3, 0, 2, 0x01, signed), None)
        .expect("save");

    let conflicting = vote_bytes(STEP_PREVOTE, 3, 0, Some(0xBB), 100);
    let err = state
        .existing_signature_or_error_if_regression(HrstKey::new(3, 0, 2, 555), &conflicting)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DifferingBlockIds);
}

#[test]
fn test_nil_block_id_after_non_nil_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let state = fresh_state(&dir, "state.json");

    let signed = vote_bytes(STEP_PREVOTE, 3, 0, Some(0xAA), 100);
    state
        .save(decision(3, 0, 2, 0x01, signed), None)
        .expect("save");

    let nil_vote = vote_bytes(STEP_PREVOTE, 3, 0, None, 100);
    let err = state
        .existing_signature_or_error_if_regression(HrstKey::new(3, 0, 2, 555), &nil_vote)
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::NilBlockId);
    assert!(err.to_string().contains("refusing to sign vote on nil block ID"));
}

#[test]
fn test_conflicting_proposal_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let state = fresh_state(&dir, "state.json");

    let signed = proposal_bytes(4, 0, 0xAA, 100);
    state
        .save(decision(4, 0, STEP_PROPOSE, 0x01, signed), None)
        .expect("save");

    let conflicting = proposal_bytes(4, 0, 0xBB, 100);
    let err = state
        .existing_signature_or_error_if_regression(
            HrstKey::new(4, 0, STEP_PROPOSE, 555),
            &conflicting,
        )
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConflictingData);
}

#[test]
fn test_greater_coordinate_always_permits_signing() {
    let dir = TempDir::new().expect("temp dir");
    let state = fresh_state(&dir, "state.json");

    let signed = vote_bytes(STEP_PREVOTE, 3, 0, Some(0xAA), 100);
    state
        .save(decision(3, 0, 2, 0x01, signed), None)
        .expect("save");

    // A strictly greater coordinate needs no payload comparison at all.
    let unrelated = vote_bytes(STEP_PREVOTE, 4, 0, Some(0xBB), 100);
    let existing = state
        .existing_signature_or_error_if_regression(HrstKey::new(4, 0, 2, 555), &unrelated)
        .expect("okay to sign");
    assert_eq!(existing, None);
}

#[test]
fn test_lower_coordinate_is_regression() {
    let dir = TempDir::new().expect("temp dir");
    let state = fresh_state(&dir, "state.json");

    let signed = vote_bytes(STEP_PREVOTE, 3, 1, Some(0xAA), 100);
    state
        .save(decision(3, 1, 2, 0x01, signed), None)
        .expect("save");

    let stale = vote_bytes(STEP_PREVOTE, 3, 0, Some(0xAA), 100);
    let err = state
        .existing_signature_or_error_if_regression(HrstKey::new(3, 0, 2, 555), &stale)
        .unwrap_err();
    assert!(err.is_regression());
}

#[test]
fn test_cache_retention_window() {
    let dir = TempDir::new().expect("temp dir");
    let state = fresh_state(&dir, "state.json");

    for height in 1..=6 {
        let bytes = vote_bytes(STEP_PREVOTE, height, 0, Some(0xAA), 100);
        state
            .save(decision(height, 0, 2, height as u8, bytes), None)
            .expect("save");
    }

    // Heights below hwm - 3 are evicted; the rest are retained.
    let (latest, entry) = state.get_from_cache(HrsKey::new(1, 0, 2));
    assert_eq!(latest, HrsKey::new(6, 0, 2));
    assert!(entry.is_none());
    let (_, entry) = state.get_from_cache(HrsKey::new(2, 0, 2));
    assert!(entry.is_none());
    for height in 3..=6 {
        let (_, entry) = state.get_from_cache(HrsKey::new(height, 0, 2));
        let entry = entry.expect("retained entry");
        assert_eq!(entry.signature, vec![height as u8; 64]);
    }
}

#[test]
fn test_get_from_cache_returns_exact_saved_entry() {
    let dir = TempDir::new().expect("temp dir");
    let state = fresh_state(&dir, "state.json");

    let bytes = vote_bytes(STEP_PREVOTE, 7, 2, Some(0xCC), 100);
    let ssc = decision(7, 2, 2, 0x55, bytes);
    state.save(ssc.clone(), None).expect("save");

    let (latest, entry) = state.get_from_cache(HrsKey::new(7, 2, 2));
    assert_eq!(latest, HrsKey::new(7, 2, 2));
    assert_eq!(entry, Some(ssc));
}

#[test]
fn test_decisions_route_per_chain() {
    let dir = TempDir::new().expect("temp dir");
    let mut states: HashMap<ChainId, SignState> = HashMap::new();
    states.insert(ChainId::from(CHAIN_ID), fresh_state(&dir, "a.json"));
    states.insert(ChainId::from("other-chain"), fresh_state(&dir, "b.json"));

    let routed = ChainSignStateConsensus {
        chain_id: ChainId::from(CHAIN_ID),
        consensus: decision(1, 0, 2, 0x01, vote_bytes(STEP_PREVOTE, 1, 0, Some(0xAA), 100)),
    };
    states
        .get(&routed.chain_id)
        .expect("routed chain")
        .save(routed.consensus, None)
        .expect("save");

    assert_eq!(
        states[&ChainId::from(CHAIN_ID)].hrs_key(),
        HrsKey::new(1, 0, 2)
    );
    assert_eq!(
        states[&ChainId::from("other-chain")].hrs_key(),
        HrsKey::new(0, 0, 0)
    );
}

#[test]
fn test_broadcast_wakes_cache_waiter() {
    let dir = TempDir::new().expect("temp dir");
    let state = Arc::new(fresh_state(&dir, "state.json"));
    let target = HrsKey::new(5, 0, 2);

    let waiter_state = Arc::clone(&state);
    let waiter = std::thread::spawn(move || loop {
        let (_, entry) = waiter_state.get_from_cache(target);
        if let Some(entry) = entry {
            return entry;
        }
        waiter_state.cond_wait();
    });

    let bytes = vote_bytes(STEP_PREVOTE, 5, 0, Some(0xAA), 100);
    state
        .save(decision(5, 0, 2, 0x77, bytes), None)
        .expect("save");

    // The waiter may have missed the save broadcast if it had not entered
    // its wait yet; keep signaling until it observes the entry.
    while !waiter.is_finished() {
        state.cond_broadcast();
        std::thread::sleep(Duration::from_millis(5));
    }
    let entry = waiter.join().expect("waiter joins");
    assert_eq!(entry.hrs_key(), target);
}
