//! Winner resolution
//!
//! Pure, deterministic mapping from a random word to one entry of the
//! snapshotted eligible set.

use crate::ids::AuthorId;

/// Pick the winner for a cycle
///
/// `index = random_word mod snapshot.len()`, winner = `snapshot[index]`.
///
/// # Panics
/// Panics on an empty snapshot. The commit preconditions guarantee at least
/// one eligible author; an empty snapshot here means the guard logic is
/// broken and the cycle must halt loudly rather than pick an undefined
/// winner.
pub fn select_winner(snapshot: &[AuthorId], random_word: u64) -> AuthorId {
    assert!(
        !snapshot.is_empty(),
        "winner resolution reached with empty eligible snapshot"
    );
    let index = (random_word % snapshot.len() as u64) as usize;
    snapshot[index]
}
