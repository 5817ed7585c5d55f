//! Posts and vote bookkeeping

use crate::ids::{AuthorId, PostId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A post in the content store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    /// Sequential post id, starting at 1
    pub id: PostId,
    /// Author of the post
    pub author: AuthorId,
    /// Post body
    pub content: String,
    /// Optional attached image hash (off-engine storage reference)
    pub image_hash: Option<String>,
    /// Creation timestamp (Unix seconds)
    pub created_at: u64,
    /// Voters who upvoted
    upvotes: HashSet<AuthorId>,
    /// Voters who downvoted
    downvotes: HashSet<AuthorId>,
}

impl Post {
    /// Create a new post with no votes
    pub fn new(
        id: PostId,
        author: AuthorId,
        content: String,
        image_hash: Option<String>,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            author,
            content,
            image_hash,
            created_at,
            upvotes: HashSet::new(),
            downvotes: HashSet::new(),
        }
    }

    /// Record an upvote from `voter`
    ///
    /// A voter holds at most one vote per post; an existing downvote is
    /// moved rather than doubled. Returns false if the voter already upvoted.
    pub fn upvote(&mut self, voter: AuthorId) -> bool {
        if self.upvotes.contains(&voter) {
            return false;
        }
        self.downvotes.remove(&voter);
        self.upvotes.insert(voter);
        true
    }

    /// Record a downvote from `voter`
    ///
    /// Same one-vote-per-voter rule as `upvote`.
    pub fn downvote(&mut self, voter: AuthorId) -> bool {
        if self.downvotes.contains(&voter) {
            return false;
        }
        self.upvotes.remove(&voter);
        self.downvotes.insert(voter);
        true
    }

    /// Net engagement score: upvotes - downvotes
    pub fn engagement(&self) -> i64 {
        self.upvotes.len() as i64 - self.downvotes.len() as i64
    }

    /// Number of upvotes
    pub fn upvote_count(&self) -> usize {
        self.upvotes.len()
    }

    /// Number of downvotes
    pub fn downvote_count(&self) -> usize {
        self.downvotes.len()
    }

    /// Voters who upvoted this post
    pub fn upvoters(&self) -> impl Iterator<Item = &AuthorId> {
        self.upvotes.iter()
    }

    /// Voters who downvoted this post
    pub fn downvoters(&self) -> impl Iterator<Item = &AuthorId> {
        self.downvotes.iter()
    }
}
