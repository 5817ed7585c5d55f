//! Treasury access
//!
//! The pool of value rewards are paid from. The engine only ever talks to
//! the `Treasury` trait; a transfer attempt may fail without corrupting any
//! other state.

use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::content::decode_payout_address;

/// Transfer-layer errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },
    #[error("Invalid recipient address: {0}")]
    InvalidRecipient(String),
    #[error("Recipient rejected transfer: {0}")]
    RecipientRejected(String),
}

/// The reward pool
pub trait Treasury {
    /// Current pool balance in base units
    fn balance(&self) -> u64;

    /// Attempt to move `amount` from the pool to `to`
    ///
    /// Either the full amount moves or nothing does; a failed attempt leaves
    /// the pool unchanged.
    fn transfer(&mut self, to: &str, amount: u64) -> Result<(), TransferError>;
}

/// In-memory treasury
///
/// Tracks the pool and per-address credited amounts. Addresses can be marked
/// as rejecting to exercise per-recipient failure paths.
#[derive(Debug, Default)]
pub struct MemoryTreasury {
    pool: u64,
    accounts: HashMap<String, u64>,
    rejecting: HashSet<String>,
}

impl MemoryTreasury {
    /// Create an empty treasury
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a treasury seeded with an initial pool
    pub fn with_pool(pool: u64) -> Self {
        Self {
            pool,
            ..Self::default()
        }
    }

    /// Add funds to the pool
    pub fn fund(&mut self, amount: u64) {
        self.pool = self.pool.saturating_add(amount);
    }

    /// Amount credited to an address so far
    pub fn credited(&self, address: &str) -> u64 {
        self.accounts.get(address).copied().unwrap_or(0)
    }

    /// Mark an address as rejecting all transfers
    pub fn set_rejecting(&mut self, address: &str) {
        self.rejecting.insert(address.to_string());
    }

    /// Clear the rejecting flag for an address
    pub fn clear_rejecting(&mut self, address: &str) {
        self.rejecting.remove(address);
    }
}

impl Treasury for MemoryTreasury {
    fn balance(&self) -> u64 {
        self.pool
    }

    fn transfer(&mut self, to: &str, amount: u64) -> Result<(), TransferError> {
        if let Err(reason) = decode_payout_address(to) {
            return Err(TransferError::InvalidRecipient(reason));
        }
        if self.rejecting.contains(to) {
            return Err(TransferError::RecipientRejected(to.to_string()));
        }
        if self.pool < amount {
            return Err(TransferError::InsufficientFunds {
                have: self.pool,
                need: amount,
            });
        }

        self.pool -= amount;
        *self.accounts.entry(to.to_string()).or_insert(0) += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::User;

    fn addr(name: &str) -> String {
        User::new(name, "", 0).payout_address
    }

    #[test]
    fn test_transfer_moves_funds() {
        let mut treasury = MemoryTreasury::with_pool(1000);
        let to = addr("alice");

        treasury.transfer(&to, 400).unwrap();
        assert_eq!(treasury.balance(), 600);
        assert_eq!(treasury.credited(&to), 400);
    }

    #[test]
    fn test_insufficient_funds_leaves_pool_intact() {
        let mut treasury = MemoryTreasury::with_pool(100);
        let to = addr("alice");

        let err = treasury.transfer(&to, 400).unwrap_err();
        assert_eq!(
            err,
            TransferError::InsufficientFunds {
                have: 100,
                need: 400
            }
        );
        assert_eq!(treasury.balance(), 100);
        assert_eq!(treasury.credited(&to), 0);
    }

    #[test]
    fn test_invalid_address_rejected() {
        let mut treasury = MemoryTreasury::with_pool(1000);
        assert!(matches!(
            treasury.transfer("not-an-address", 10),
            Err(TransferError::InvalidRecipient(_))
        ));
        assert_eq!(treasury.balance(), 1000);
    }

    #[test]
    fn test_rejecting_recipient() {
        let mut treasury = MemoryTreasury::with_pool(1000);
        let to = addr("alice");
        treasury.set_rejecting(&to);

        assert!(matches!(
            treasury.transfer(&to, 10),
            Err(TransferError::RecipientRejected(_))
        ));

        treasury.clear_rejecting(&to);
        assert!(treasury.transfer(&to, 10).is_ok());
    }
}
