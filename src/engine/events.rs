//! Events emitted by the reward engine
//!
//! Buffered in the engine and drained by the node for logging and by the
//! RPC surface for operator follow-up.

use crate::ids::{AuthorId, RequestId};
use serde::{Deserialize, Serialize};

/// Observable engine events, one per state transition of interest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// A cycle committed and randomness was requested
    RequestWinningAuthor { request_id: RequestId },
    /// The randomness response resolved a winner
    PickedWinner { cycle_id: u64, winner: AuthorId },
    /// A winner's transfer went through
    RewardSent { user: AuthorId, amount: u64 },
    /// A winner's transfer failed; recorded for operator follow-up
    BatchTransferFailed { winner: AuthorId, reason: String },
}
