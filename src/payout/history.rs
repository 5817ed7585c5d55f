//! Winner records and bounded history

use crate::ids::AuthorId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Outcome of one winner's payout in a cycle
///
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    /// Cycle the record belongs to
    pub cycle_id: u64,
    /// The drawn author
    pub winner: AuthorId,
    /// Amount attempted, in base units
    pub amount: u64,
    /// Whether the transfer went through
    pub paid: bool,
    /// Transfer-layer failure, when `paid` is false
    pub failure_reason: Option<String>,
    /// When the cycle resolved
    pub decided_at: u64,
}

/// Fixed-capacity FIFO of past winner records
///
/// Oldest records are evicted once capacity is exceeded.
#[derive(Debug)]
pub struct RecentWinners {
    capacity: usize,
    records: VecDeque<WinnerRecord>,
}

impl RecentWinners {
    /// Create an empty history with the given capacity
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "winner history capacity must be positive");
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a record, evicting the oldest past capacity
    pub fn push(&mut self, record: WinnerRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Records oldest-first
    pub fn iter(&self) -> impl Iterator<Item = &WinnerRecord> {
        self.records.iter()
    }

    /// Snapshot of the history, oldest-first
    pub fn to_vec(&self) -> Vec<WinnerRecord> {
        self.records.iter().cloned().collect()
    }

    /// Number of retained records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether any record is retained
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
