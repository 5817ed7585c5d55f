//! Database persistence layer using Sled
//!
//! Winner records and upkeep metadata survive node restarts; everything
//! else (eligibility, pending request) is rebuilt from live traffic.

use sled::{Db, Tree};
use std::path::Path;

use crate::payout::{DisbursementReport, WinnerRecord};

/// Database wrapper
#[derive(Debug, Clone)]
pub struct EngineDB {
    db: Db,
    winners_tree: Tree,
    metadata_tree: Tree,
}

const LAST_CYCLE_AT_KEY: &str = "last_cycle_at";
const NEXT_CYCLE_ID_KEY: &str = "next_cycle_id";

impl EngineDB {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let db = sled::open(path)?;
        let winners_tree = db.open_tree("winners")?;
        let metadata_tree = db.open_tree("metadata")?;

        Ok(Self {
            db,
            winners_tree,
            metadata_tree,
        })
    }

    /// Persist every record of a resolved cycle
    pub fn save_report(&self, report: &DisbursementReport) -> std::io::Result<()> {
        for (i, record) in report.records.iter().enumerate() {
            // Key orders records by (cycle, position in batch)
            let mut key = Vec::with_capacity(12);
            key.extend_from_slice(&record.cycle_id.to_be_bytes());
            key.extend_from_slice(&(i as u32).to_be_bytes());

            let value = bincode::serialize(record).map_err(|e| {
                std::io::Error::new(std::io::ErrorKind::InvalidData, e)
            })?;
            self.winners_tree.insert(key, value)?;
        }
        self.db.flush()?;
        Ok(())
    }

    /// Load the most recent `capacity` winner records, oldest-first
    pub fn load_recent_winners(&self, capacity: usize) -> std::io::Result<Vec<WinnerRecord>> {
        let mut records = Vec::new();

        // Keys are big-endian, so reverse iteration is newest-first
        for item in self.winners_tree.iter().rev().take(capacity) {
            let (_, value) = item?;
            let record: WinnerRecord = bincode::deserialize(&value).map_err(|e| {
                std::io::Error::new(std::io::ErrorKind::InvalidData, e)
            })?;
            records.push(record);
        }

        records.reverse();
        Ok(records)
    }

    /// Update cycle metadata
    pub fn update_metadata(&self, last_cycle_at: u64, next_cycle_id: u64) -> std::io::Result<()> {
        self.metadata_tree
            .insert(LAST_CYCLE_AT_KEY, last_cycle_at.to_le_bytes().as_ref())?;
        self.metadata_tree
            .insert(NEXT_CYCLE_ID_KEY, next_cycle_id.to_le_bytes().as_ref())?;
        self.db.flush()?;
        Ok(())
    }

    /// Load cycle metadata, if any was ever written
    pub fn load_metadata(&self) -> std::io::Result<Option<(u64, u64)>> {
        let last_bytes = self.metadata_tree.get(LAST_CYCLE_AT_KEY)?;
        let next_bytes = self.metadata_tree.get(NEXT_CYCLE_ID_KEY)?;

        if let (Some(last), Some(next)) = (last_bytes, next_bytes) {
            let mut l_bytes = [0u8; 8];
            l_bytes.copy_from_slice(&last);

            let mut n_bytes = [0u8; 8];
            n_bytes.copy_from_slice(&next);

            Ok(Some((
                u64::from_le_bytes(l_bytes),
                u64::from_le_bytes(n_bytes),
            )))
        } else {
            Ok(None)
        }
    }
}
