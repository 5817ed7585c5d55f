//! The reward engine
//!
//! Owns the cycle state machine: Idle -> AwaitingRandomness (commit) ->
//! Resolving -> Disbursing -> Idle. All mutations run on a single execution
//! context; the only suspension point is the gap between `perform_upkeep`
//! and `on_randomness_fulfilled`, guarded by the pending request.

use std::collections::{HashMap, VecDeque};

use crate::constants::EVENT_BUFFER_CAPACITY;
use crate::content::Post;
use crate::eligibility::EligibilityTracker;
use crate::ids::{AuthorId, PostId, RequestId};
use crate::payout::{disburse, DisbursementReport, Payee, RecentWinners, Treasury, WinnerRecord};
use crate::randomness::RandomnessSource;
use crate::upkeep::{CorrelationError, UpkeepCheck, UpkeepError, UpkeepReason, UpkeepState};
use crate::winner::select_winner;

use super::EngineEvent;

/// Tunable engine knobs
///
/// Defaults mirror the protocol constants; tests construct smaller ones.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Seconds between reward cycles
    pub interval_secs: u64,
    /// Net engagement a post needs to qualify its author
    pub eligibility_threshold: i64,
    /// Treasury floor below which no cycle starts
    pub min_cycle_balance: u64,
    /// Winner's share of the pool: numerator/denominator
    pub reward_share_numerator: u64,
    pub reward_share_denominator: u64,
    /// Winner history capacity
    pub recent_winners_capacity: usize,
    /// Age after which a pending request may be abandoned
    pub request_timeout_secs: u64,
    /// Random words per request
    pub num_random_words: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            interval_secs: CYCLE_INTERVAL_SECS,
            eligibility_threshold: ELIGIBILITY_THRESHOLD,
            min_cycle_balance: MIN_CYCLE_BALANCE,
            reward_share_numerator: REWARD_SHARE_NUMERATOR,
            reward_share_denominator: REWARD_SHARE_DENOMINATOR,
            recent_winners_capacity: RECENT_WINNERS_CAPACITY,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            num_random_words: NUM_RANDOM_WORDS,
        }
    }
}

/// The reward cycle engine
///
/// Constructed with injected collaborators so cycles are deterministic
/// under test: the treasury moves funds, the randomness source allocates
/// request ids, and all timestamps come in as arguments.
pub struct RewardEngine {
    config: EngineConfig,
    upkeep: UpkeepState,
    tracker: EligibilityTracker,
    recent: RecentWinners,
    events: VecDeque<EngineEvent>,
    /// Author -> payout address, learned at registration
    payout_addresses: HashMap<AuthorId, String>,
    treasury: Box<dyn Treasury + Send>,
    source: Box<dyn RandomnessSource + Send>,
    /// Id the next resolved cycle will carry
    next_cycle_id: u64,
}

impl RewardEngine {
    /// Create an engine with its window and interval anchored at `now`
    pub fn new(
        config: EngineConfig,
        treasury: Box<dyn Treasury + Send>,
        source: Box<dyn RandomnessSource + Send>,
        now: u64,
    ) -> Self {
        Self {
            upkeep: UpkeepState::new(config.interval_secs, now),
            tracker: EligibilityTracker::new(config.eligibility_threshold, now),
            recent: RecentWinners::new(config.recent_winners_capacity),
            events: VecDeque::new(),
            payout_addresses: HashMap::new(),
            treasury,
            source,
            next_cycle_id: 1,
            config,
        }
    }

    /// Restore persisted state after a node restart
    pub fn restore(&mut self, records: Vec<WinnerRecord>, last_cycle_at: u64, next_cycle_id: u64) {
        for record in records {
            self.recent.push(record);
        }
        self.upkeep.last_cycle_at = last_cycle_at;
        self.next_cycle_id = next_cycle_id;
    }

    /// Learn where an author gets paid
    pub fn register_payout_address(&mut self, author: AuthorId, address: String) {
        self.payout_addresses.insert(author, address);
    }

    /// Feed an engagement change; the tracker decides eligibility
    pub fn note_engagement(&mut self, post: &Post) {
        self.tracker.observe(post);
    }

    /// Read-only due-check; never changes state
    pub fn check_upkeep(&self, now: u64) -> UpkeepCheck {
        self.upkeep.check_due(
            now,
            self.treasury.balance(),
            self.config.min_cycle_balance,
            self.tracker.len(),
        )
    }

    /// Commit a cycle: snapshot the eligible set and request randomness
    ///
    /// Fails with `UpkeepNotNeeded` (carrying balance and eligible count)
    /// when preconditions are unmet, or `RequestInFlight` while a cycle is
    /// already suspended. No randomness request is sent on failure.
    pub fn perform_upkeep(&mut self, now: u64) -> Result<RequestId, UpkeepError> {
        let balance = self.treasury.balance();
        let num_eligible = self.tracker.len();

        let check = self
            .upkeep
            .check_due(now, balance, self.config.min_cycle_balance, num_eligible);
        if !check.due {
            return Err(match check.reason {
                UpkeepReason::RequestInFlight { request_id } => {
                    UpkeepError::RequestInFlight { request_id }
                }
                _ => UpkeepError::UpkeepNotNeeded {
                    balance,
                    num_eligible,
                },
            });
        }

        let snapshot = self.tracker.eligible_authors();
        let request_id = self.source.request_random_words(self.config.num_random_words);
        self.upkeep.commit(
            now,
            balance,
            self.config.min_cycle_balance,
            snapshot,
            request_id,
        )?;

        self.push_event(EngineEvent::RequestWinningAuthor { request_id });
        Ok(request_id)
    }

    /// Consume a randomness response and run the cycle to completion
    ///
    /// Correlates the response against the single pending request, resolves
    /// the winner from the snapshot taken at commit time, pays out, records
    /// history, and resets the eligibility window. Runs synchronously: no
    /// new commit can interleave before this returns.
    pub fn on_randomness_fulfilled(
        &mut self,
        request_id: RequestId,
        random_words: &[u64],
        now: u64,
    ) -> Result<DisbursementReport, CorrelationError> {
        if random_words.is_empty() {
            // Reject before consuming the pending request
            return Err(CorrelationError::EmptyResponse { got: request_id });
        }

        let pending = self.upkeep.take_matching(request_id)?;

        let cycle_id = self.next_cycle_id;
        self.next_cycle_id += 1;

        let winner = select_winner(&pending.snapshot, random_words[0]);
        self.push_event(EngineEvent::PickedWinner { cycle_id, winner });

        // Balance re-read here: the pool may have moved during suspension
        let amount = self.per_winner_amount();
        let payees: Vec<Payee> = vec![(winner, self.payout_addresses.get(&winner).cloned())];

        let report = disburse(self.treasury.as_mut(), &payees, amount, cycle_id, now);

        for record in &report.records {
            if record.paid {
                self.push_event(EngineEvent::RewardSent {
                    user: record.winner,
                    amount: record.amount,
                });
            } else {
                self.push_event(EngineEvent::BatchTransferFailed {
                    winner: record.winner,
                    reason: record
                        .failure_reason
                        .clone()
                        .unwrap_or_else(|| "unknown".to_string()),
                });
            }
            self.recent.push(record.clone());
        }

        self.tracker.reset(now);
        self.upkeep.complete_cycle(now);

        Ok(report)
    }

    /// Abandon a pending request that outlived the response timeout
    ///
    /// Returns the abandoned id, if any. A late response for it is then
    /// rejected as an unknown request.
    pub fn expire_stale_request(&mut self, now: u64) -> Option<RequestId> {
        self.upkeep
            .expire_stale(now, self.config.request_timeout_secs)
    }

    fn per_winner_amount(&self) -> u64 {
        let balance = self.treasury.balance() as u128;
        let share = balance * self.config.reward_share_numerator as u128
            / self.config.reward_share_denominator as u128;
        share as u64
    }

    fn push_event(&mut self, event: EngineEvent) {
        if self.events.len() == EVENT_BUFFER_CAPACITY {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    // --- Query surface ---

    /// Current treasury balance
    pub fn balance(&self) -> u64 {
        self.treasury.balance()
    }

    /// Eligible post ids, ascending
    pub fn eligible_post_ids(&self) -> Vec<PostId> {
        self.tracker.eligible_post_ids()
    }

    /// Whether a post is in the current eligible set
    pub fn is_post_eligible(&self, post_id: PostId) -> bool {
        self.tracker.is_eligible(post_id)
    }

    /// Number of currently eligible posts
    pub fn num_eligible(&self) -> usize {
        self.tracker.len()
    }

    /// Start of the active eligibility window
    pub fn window_started_at(&self) -> u64 {
        self.tracker.window_started_at()
    }

    /// When the last cycle completed
    pub fn last_cycle_at(&self) -> u64 {
        self.upkeep.last_cycle_at
    }

    /// Id of the in-flight randomness request, if a cycle is suspended
    pub fn pending_request_id(&self) -> Option<RequestId> {
        self.upkeep.pending().map(|p| p.request_id)
    }

    /// Snapshot of past winner records, oldest-first
    pub fn recent_winners(&self) -> Vec<WinnerRecord> {
        self.recent.to_vec()
    }

    /// Cycle id the next resolution will carry
    pub fn next_cycle_id(&self) -> u64 {
        self.next_cycle_id
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drain buffered events, oldest-first
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.events.drain(..).collect()
    }
}
