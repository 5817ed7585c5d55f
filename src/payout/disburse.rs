//! Reward disbursement
//!
//! Pays each winner of a cycle independently. One recipient's failure is
//! recorded and never blocks, aborts, or rolls back another's payment -
//! there is no transactional substrate underneath, so the
//! no-rollback-across-successes behavior is explicit here.

use crate::ids::AuthorId;

use super::{Treasury, WinnerRecord};

/// A winner queued for payment: the author and their resolved payout
/// address, if one is registered
pub type Payee = (AuthorId, Option<String>);

/// Outcome of one disbursement batch
#[derive(Debug, Clone)]
pub struct DisbursementReport {
    /// Cycle the batch belongs to
    pub cycle_id: u64,
    /// One record per winner, in batch order
    pub records: Vec<WinnerRecord>,
    /// Sum actually transferred
    pub total_paid: u64,
}

impl DisbursementReport {
    /// Winners whose transfer went through
    pub fn paid_count(&self) -> usize {
        self.records.iter().filter(|r| r.paid).count()
    }

    /// Winners whose transfer failed
    pub fn failed_count(&self) -> usize {
        self.records.len() - self.paid_count()
    }
}

/// Pay `per_winner_amount` to each payee independently
///
/// Each transfer is its own attempt against the treasury: a failure is
/// captured in that winner's record (`paid = false`, reason) and the loop
/// continues to the next payee.
pub fn disburse(
    treasury: &mut dyn Treasury,
    payees: &[Payee],
    per_winner_amount: u64,
    cycle_id: u64,
    now: u64,
) -> DisbursementReport {
    let mut records = Vec::with_capacity(payees.len());
    let mut total_paid = 0u64;

    for (winner, address) in payees {
        let outcome = match address {
            Some(addr) => treasury
                .transfer(addr, per_winner_amount)
                .map_err(|e| e.to_string()),
            None => Err("no payout address registered".to_string()),
        };

        let record = match outcome {
            Ok(()) => {
                total_paid += per_winner_amount;
                WinnerRecord {
                    cycle_id,
                    winner: *winner,
                    amount: per_winner_amount,
                    paid: true,
                    failure_reason: None,
                    decided_at: now,
                }
            }
            Err(reason) => WinnerRecord {
                cycle_id,
                winner: *winner,
                amount: per_winner_amount,
                paid: false,
                failure_reason: Some(reason),
                decided_at: now,
            },
        };
        records.push(record);
    }

    DisbursementReport {
        cycle_id,
        records,
        total_paid,
    }
}
