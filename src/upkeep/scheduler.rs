//! Upkeep scheduling and randomness correlation
//!
//! A reward cycle is due when the interval has elapsed, the treasury can
//! cover a payout, at least one author is eligible, and no randomness
//! request is already in flight. The due-check is a pure function; the
//! commit stores the pending request and acts as the idempotency guard
//! against duplicate triggers. At most one request is ever outstanding.

use crate::ids::{AuthorId, RequestId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upkeep errors returned to the trigger
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UpkeepError {
    #[error("Upkeep not needed: balance {balance}, eligible authors {num_eligible}")]
    UpkeepNotNeeded { balance: u64, num_eligible: usize },
    #[error("Randomness request {request_id} already in flight")]
    RequestInFlight { request_id: RequestId },
}

/// Correlation errors returned to the randomness callback
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorrelationError {
    #[error("No randomness request pending, got response for {got}")]
    UnknownRequest { got: RequestId },
    #[error("Pending request is {expected}, got response for {got}")]
    RequestMismatch { expected: RequestId, got: RequestId },
    #[error("Response for {got} carried no random words")]
    EmptyResponse { got: RequestId },
}

/// Why a due-check came out the way it did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpkeepReason {
    /// All conditions met; a cycle may start
    Due,
    /// Not enough time since the last cycle
    IntervalNotElapsed { remaining_secs: u64 },
    /// Treasury below the minimum payout floor
    BalanceTooLow { balance: u64, required: u64 },
    /// Nobody qualified this window
    NoEligibleAuthors,
    /// A cycle is already awaiting randomness
    RequestInFlight { request_id: RequestId },
}

/// Result of a due-check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpkeepCheck {
    pub due: bool,
    pub reason: UpkeepReason,
}

/// A committed cycle awaiting its randomness response
///
/// The eligible set is snapshotted here at commit time; engagement that
/// arrives during the suspension window cannot change who can win this cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    /// Correlation id for the randomness response
    pub request_id: RequestId,
    /// When the request was committed
    pub created_at: u64,
    /// Eligible authors frozen at commit time, ordered by ascending post id
    pub snapshot: Vec<AuthorId>,
}

/// Cycle scheduling state
///
/// `pending` is Some exactly while a randomness request is outstanding;
/// while it is, no new commit may succeed.
#[derive(Debug)]
pub struct UpkeepState {
    /// When the last cycle completed (or when the engine started)
    pub last_cycle_at: u64,
    /// Seconds between cycles
    pub interval_secs: u64,
    /// The single in-flight request, if any
    pending: Option<PendingRequest>,
}

impl UpkeepState {
    /// Create scheduling state with the window anchored at `now`
    pub fn new(interval_secs: u64, now: u64) -> Self {
        Self {
            last_cycle_at: now,
            interval_secs,
            pending: None,
        }
    }

    /// Pure due-check; calling it never changes state
    pub fn check_due(
        &self,
        now: u64,
        balance: u64,
        min_balance: u64,
        num_eligible: usize,
    ) -> UpkeepCheck {
        if let Some(pending) = &self.pending {
            return UpkeepCheck {
                due: false,
                reason: UpkeepReason::RequestInFlight {
                    request_id: pending.request_id,
                },
            };
        }

        let elapsed = now.saturating_sub(self.last_cycle_at);
        if elapsed < self.interval_secs {
            return UpkeepCheck {
                due: false,
                reason: UpkeepReason::IntervalNotElapsed {
                    remaining_secs: self.interval_secs - elapsed,
                },
            };
        }

        if balance < min_balance {
            return UpkeepCheck {
                due: false,
                reason: UpkeepReason::BalanceTooLow {
                    balance,
                    required: min_balance,
                },
            };
        }

        if num_eligible == 0 {
            return UpkeepCheck {
                due: false,
                reason: UpkeepReason::NoEligibleAuthors,
            };
        }

        UpkeepCheck {
            due: true,
            reason: UpkeepReason::Due,
        }
    }

    /// Commit a cycle: re-validate and store the pending request
    ///
    /// Fails without mutating anything if the cycle is not due. On success
    /// the stored request is the suspension point; no further commit can
    /// succeed until the matching response is consumed or expired.
    pub fn commit(
        &mut self,
        now: u64,
        balance: u64,
        min_balance: u64,
        snapshot: Vec<AuthorId>,
        request_id: RequestId,
    ) -> Result<&PendingRequest, UpkeepError> {
        if let Some(pending) = &self.pending {
            return Err(UpkeepError::RequestInFlight {
                request_id: pending.request_id,
            });
        }

        let check = self.check_due(now, balance, min_balance, snapshot.len());
        if !check.due {
            return Err(UpkeepError::UpkeepNotNeeded {
                balance,
                num_eligible: snapshot.len(),
            });
        }

        self.pending = Some(PendingRequest {
            request_id,
            created_at: now,
            snapshot,
        });
        Ok(self.pending.as_ref().unwrap())
    }

    /// Consume the pending request if `request_id` matches it
    ///
    /// Rejects late, duplicate, and foreign responses without touching state.
    pub fn take_matching(
        &mut self,
        request_id: RequestId,
    ) -> Result<PendingRequest, CorrelationError> {
        match &self.pending {
            None => Err(CorrelationError::UnknownRequest { got: request_id }),
            Some(pending) if pending.request_id != request_id => {
                Err(CorrelationError::RequestMismatch {
                    expected: pending.request_id,
                    got: request_id,
                })
            }
            Some(_) => Ok(self.pending.take().unwrap()),
        }
    }

    /// Abandon a pending request older than `timeout_secs`
    ///
    /// Recovery path for a randomness response that never arrives. Returns
    /// the abandoned request id; its late response will then be rejected as
    /// an unknown request.
    pub fn expire_stale(&mut self, now: u64, timeout_secs: u64) -> Option<RequestId> {
        let expired = match &self.pending {
            Some(p) if now.saturating_sub(p.created_at) >= timeout_secs => p.request_id,
            _ => return None,
        };
        self.pending = None;
        Some(expired)
    }

    /// Mark the cycle finished and start the next interval at `now`
    pub fn complete_cycle(&mut self, now: u64) {
        self.last_cycle_at = now;
    }

    /// The in-flight request, if any
    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }
}
