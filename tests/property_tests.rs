//! Property-based and adversarial tests for the KARMA reward engine
//!
//! These tests verify cycle invariants hold under random inputs and
//! misbehaving collaborators.

use proptest::prelude::*;

use karma_core::content::{ContentStore, Post, User};
use karma_core::eligibility::EligibilityTracker;
use karma_core::engine::{EngineConfig, RewardEngine};
use karma_core::ids::{id_from_bytes, AuthorId};
use karma_core::payout::{disburse, MemoryTreasury, RecentWinners, Treasury, WinnerRecord};
use karma_core::randomness::SequentialRandomnessSource;
use karma_core::upkeep::{CorrelationError, UpkeepError, UpkeepState};
use karma_core::winner::select_winner;

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

proptest! {
    /// Winner selection always lands inside the snapshot
    #[test]
    fn prop_winner_within_snapshot(
        len in 1usize..64,
        word in any::<u64>()
    ) {
        let snapshot: Vec<AuthorId> =
            (0..len).map(|i| id_from_bytes(&i.to_le_bytes())).collect();

        let winner = select_winner(&snapshot, word);
        prop_assert!(snapshot.contains(&winner));
    }

    /// Winner selection is exactly word mod len, and deterministic
    #[test]
    fn prop_winner_is_word_mod_len(
        len in 1usize..64,
        word in any::<u64>()
    ) {
        let snapshot: Vec<AuthorId> =
            (0..len).map(|i| id_from_bytes(&i.to_le_bytes())).collect();

        let expected = snapshot[(word % len as u64) as usize];
        prop_assert_eq!(select_winner(&snapshot, word), expected);
        prop_assert_eq!(select_winner(&snapshot, word), select_winner(&snapshot, word));
    }

    /// Winner history never exceeds its capacity, whatever is pushed
    #[test]
    fn prop_history_bounded(
        capacity in 1usize..16,
        pushes in 0usize..64
    ) {
        let mut history = RecentWinners::new(capacity);
        for cycle in 0..pushes {
            history.push(WinnerRecord {
                cycle_id: cycle as u64,
                winner: id_from_bytes(b"w"),
                amount: 1,
                paid: true,
                failure_reason: None,
                decided_at: 0,
            });
            prop_assert!(history.len() <= capacity);
        }

        // FIFO: the survivors are the newest `capacity` records, in order
        let start = pushes.saturating_sub(capacity) as u64;
        let expected: Vec<u64> = (start..pushes as u64).collect();
        let got: Vec<u64> = history.iter().map(|r| r.cycle_id).collect();
        prop_assert_eq!(got, expected);
    }

    /// The due-check is pure: any number of calls, identical answers, no mutation
    #[test]
    fn prop_check_due_pure(
        now in 0u64..1_000_000,
        last in 0u64..1_000_000,
        interval in 1u64..100_000,
        balance in 0u64..1_000_000,
        min_balance in 0u64..1_000_000,
        eligible in 0usize..32
    ) {
        let state = UpkeepState::new(interval, last);
        let first = state.check_due(now, balance, min_balance, eligible);
        for _ in 0..5 {
            prop_assert_eq!(state.check_due(now, balance, min_balance, eligible), first);
        }
        prop_assert_eq!(state.last_cycle_at, last);
        prop_assert!(state.pending().is_none());

        // And a due answer really means every condition held
        if first.due {
            prop_assert!(now - last >= interval);
            prop_assert!(balance >= min_balance);
            prop_assert!(eligible > 0);
        }
    }

    /// Eligible post ids always come back sorted ascending
    #[test]
    fn prop_eligible_ids_sorted(post_ids in proptest::collection::hash_set(1u64..10_000, 0..32)) {
        let mut tracker = EligibilityTracker::new(1, 0);
        for id in &post_ids {
            let mut post = Post::new(*id, id_from_bytes(&id.to_le_bytes()), "p".into(), None, 5);
            post.upvote(id_from_bytes(b"voter"));
            tracker.observe(&post);
        }

        let ids = tracker.eligible_post_ids();
        prop_assert_eq!(ids.len(), post_ids.len());
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    /// A transfer either moves the full amount or nothing
    #[test]
    fn prop_transfer_all_or_nothing(
        pool in 0u64..10_000,
        amount in 0u64..10_000
    ) {
        let mut treasury = MemoryTreasury::with_pool(pool);
        let to = User::new("prop-user", "", 0).payout_address;

        match treasury.transfer(&to, amount) {
            Ok(()) => {
                prop_assert_eq!(treasury.balance(), pool - amount);
                prop_assert_eq!(treasury.credited(&to), amount);
            }
            Err(_) => {
                prop_assert_eq!(treasury.balance(), pool);
                prop_assert_eq!(treasury.credited(&to), 0);
            }
        }
    }
}

// ============================================================================
// ADVERSARIAL TESTS
// ============================================================================

const POOL: u64 = 1_000_000;

fn small_config() -> EngineConfig {
    EngineConfig {
        interval_secs: 60,
        eligibility_threshold: 2,
        min_cycle_balance: 100,
        reward_share_numerator: 1,
        reward_share_denominator: 5,
        recent_winners_capacity: 3,
        request_timeout_secs: 600,
        num_random_words: 1,
    }
}

fn engine_with_treasury(treasury: MemoryTreasury) -> RewardEngine {
    RewardEngine::new(
        small_config(),
        Box::new(treasury),
        Box::new(SequentialRandomnessSource::new()),
        1000,
    )
}

/// Register a user, create a post, and upvote it past the threshold
fn make_eligible(engine: &mut RewardEngine, store: &mut ContentStore, name: &str, now: u64) {
    let user = store.register_user(name, "", now).unwrap();
    let (author, address) = (user.id, user.payout_address.clone());
    engine.register_payout_address(author, address);

    let post_id = store
        .create_post(author, "content".into(), None, now)
        .unwrap()
        .id;

    for i in 0..2u8 {
        let voter = store
            .register_user(&format!("{name}-voter{i}"), "", now)
            .unwrap()
            .id;
        let post = store.upvote(voter, post_id).unwrap();
        engine.note_engagement(post);
    }
}

/// Test: Duplicate trigger attack
///
/// A trigger that fires twice (retry, race, replay) must start exactly one
/// cycle: one commit succeeds, the second is rejected by the pending guard.
#[test]
fn test_duplicate_trigger_starts_one_cycle() {
    let mut engine = engine_with_treasury(MemoryTreasury::with_pool(POOL));
    let mut store = ContentStore::new();
    make_eligible(&mut engine, &mut store, "alice", 1001);

    let first = engine.perform_upkeep(1060);
    let second = engine.perform_upkeep(1060);

    assert!(first.is_ok());
    assert_eq!(
        second.unwrap_err(),
        UpkeepError::RequestInFlight {
            request_id: first.unwrap()
        }
    );
}

/// Test: Foreign/stale callback attack
///
/// A response with the wrong request id (an unexpected caller, or a
/// duplicate of an already-consumed response) must be rejected without
/// touching the pending request, the snapshot, history, or the pool.
#[test]
fn test_foreign_callback_rejected() {
    let mut engine = engine_with_treasury(MemoryTreasury::with_pool(POOL));
    let mut store = ContentStore::new();
    make_eligible(&mut engine, &mut store, "alice", 1001);

    let request_id = engine.perform_upkeep(1060).unwrap();

    let err = engine
        .on_randomness_fulfilled(request_id + 1, &[7], 1070)
        .unwrap_err();
    assert_eq!(
        err,
        CorrelationError::RequestMismatch {
            expected: request_id,
            got: request_id + 1
        }
    );
    assert_eq!(engine.pending_request_id(), Some(request_id));
    assert!(engine.recent_winners().is_empty());
    assert_eq!(engine.balance(), POOL);

    // The real response still works afterwards
    assert!(engine.on_randomness_fulfilled(request_id, &[7], 1071).is_ok());
}

/// Test: Replayed callback after resolution
///
/// Once a cycle resolved, replaying its request id must be rejected as
/// unknown - the request was consumed.
#[test]
fn test_replayed_callback_rejected() {
    let mut engine = engine_with_treasury(MemoryTreasury::with_pool(POOL));
    let mut store = ContentStore::new();
    make_eligible(&mut engine, &mut store, "alice", 1001);

    let request_id = engine.perform_upkeep(1060).unwrap();
    engine.on_randomness_fulfilled(request_id, &[7], 1070).unwrap();

    let err = engine
        .on_randomness_fulfilled(request_id, &[7], 1071)
        .unwrap_err();
    assert_eq!(err, CorrelationError::UnknownRequest { got: request_id });
    assert_eq!(engine.recent_winners().len(), 1);
}

/// Test: Per-recipient disbursement isolation
///
/// The middle recipient of a batch rejects the transfer; the surrounding
/// recipients are still paid and all three outcomes are recorded.
#[test]
fn test_disbursement_isolation() {
    let mut treasury = MemoryTreasury::with_pool(POOL);

    let users: Vec<User> = ["a", "b", "c"].iter().map(|n| User::new(n, "", 0)).collect();
    treasury.set_rejecting(&users[1].payout_address);

    let payees: Vec<(AuthorId, Option<String>)> = users
        .iter()
        .map(|u| (u.id, Some(u.payout_address.clone())))
        .collect();

    let report = disburse(&mut treasury, &payees, 100, 1, 50);

    assert!(report.records[0].paid);
    assert!(!report.records[1].paid);
    assert!(report.records[1].failure_reason.is_some());
    assert!(report.records[2].paid);
    assert_eq!(report.total_paid, 200);
    assert_eq!(treasury.credited(&users[0].payout_address), 100);
    assert_eq!(treasury.credited(&users[2].payout_address), 100);
}

/// Test: Reset semantics after a completed cycle
///
/// Even if a new post instantly crosses the threshold, the next cycle is
/// not due until the interval elapses again; with nobody eligible, the
/// reason is the empty set instead.
#[test]
fn test_post_cycle_recheck_not_due() {
    let mut engine = engine_with_treasury(MemoryTreasury::with_pool(POOL));
    let mut store = ContentStore::new();
    make_eligible(&mut engine, &mut store, "alice", 1001);

    let request_id = engine.perform_upkeep(1060).unwrap();
    engine.on_randomness_fulfilled(request_id, &[3], 1070).unwrap();

    // Nobody eligible yet
    assert!(!engine.check_upkeep(1071).due);

    // A new author instantly qualifies - still not due, interval gates it
    make_eligible(&mut engine, &mut store, "bob", 1072);
    assert_eq!(engine.num_eligible(), 1);
    assert!(!engine.check_upkeep(1075).due);

    // After the interval it is due again
    assert!(engine.check_upkeep(1070 + 60).due);
}

/// Test: History bounded across many cycles
#[test]
fn test_history_fifo_across_cycles() {
    let mut engine = engine_with_treasury(MemoryTreasury::with_pool(POOL));
    let mut store = ContentStore::new();

    let mut now = 1000;
    for round in 0..5 {
        make_eligible(&mut engine, &mut store, &format!("author{round}"), now + 1);
        now += 60;
        let request_id = engine.perform_upkeep(now).unwrap();
        now += 5;
        engine
            .on_randomness_fulfilled(request_id, &[round], now)
            .unwrap();
    }

    // Capacity 3: cycles 1 and 2 evicted, 3..5 retained oldest-first
    let cycles: Vec<u64> = engine.recent_winners().iter().map(|r| r.cycle_id).collect();
    assert_eq!(cycles, vec![3, 4, 5]);
}

/// Test: Drained pool mid-suspension
///
/// The payout amount is derived from the balance at disbursement time, so
/// a pool drained during the suspension window shrinks the reward instead
/// of overdrawing.
#[test]
fn test_balance_revalidated_at_disbursement() {
    let mut engine = engine_with_treasury(MemoryTreasury::with_pool(1000));
    let mut store = ContentStore::new();
    make_eligible(&mut engine, &mut store, "alice", 1001);

    let request_id = engine.perform_upkeep(1060).unwrap();
    let report = engine.on_randomness_fulfilled(request_id, &[0], 1070).unwrap();

    // 20% of the balance as read at disbursement time
    assert_eq!(report.records[0].amount, 200);
    assert_eq!(engine.balance(), 800);
}

/// Test: Stuck request recovery
///
/// A randomness response that never arrives would otherwise wedge the
/// engine in AwaitingRandomness forever; expiry frees the guard and the
/// late response is rejected.
#[test]
fn test_stuck_request_recovery() {
    let mut engine = engine_with_treasury(MemoryTreasury::with_pool(POOL));
    let mut store = ContentStore::new();
    make_eligible(&mut engine, &mut store, "alice", 1001);

    let request_id = engine.perform_upkeep(1060).unwrap();

    // Before the timeout nothing happens
    assert_eq!(engine.expire_stale_request(1061), None);

    // After the timeout the request is abandoned
    assert_eq!(engine.expire_stale_request(1060 + 600), Some(request_id));
    assert!(engine.pending_request_id().is_none());

    // The late response is now an anomaly, not a draw
    let err = engine
        .on_randomness_fulfilled(request_id, &[7], 1700)
        .unwrap_err();
    assert_eq!(err, CorrelationError::UnknownRequest { got: request_id });
    assert!(engine.recent_winners().is_empty());
}
