//! Eligibility tracking
//!
//! Derives the set of reward-eligible authors from engagement events. A post
//! joins the set when its net engagement reaches the threshold while inside
//! the active window, and the set only empties at a cycle reset - removing a
//! vote never revokes eligibility already granted. That keeps the set stable
//! once a pending randomness request has snapshotted it.

use crate::content::Post;
use crate::ids::{AuthorId, PostId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A post that qualified its author for the current window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibleEntry {
    /// Author who would receive the reward
    pub author: AuthorId,
    /// Post that crossed the threshold
    pub post: PostId,
    /// Net engagement at the moment eligibility was granted
    pub engagement: i64,
    /// When the post was created
    pub created_at: u64,
}

/// Tracks the eligible set for the active reward window
#[derive(Debug)]
pub struct EligibilityTracker {
    /// Engagement a post must reach to qualify
    threshold: i64,
    /// Start of the active window (posts created before it never qualify)
    window_started_at: u64,
    /// Eligible entries keyed by post id; BTreeMap iteration gives the
    /// deterministic ascending order the winner resolver indexes into
    entries: BTreeMap<PostId, EligibleEntry>,
}

impl EligibilityTracker {
    /// Create a tracker with the given threshold, window open from `now`
    pub fn new(threshold: i64, now: u64) -> Self {
        Self {
            threshold,
            window_started_at: now,
            entries: BTreeMap::new(),
        }
    }

    /// Feed an engagement change for `post`
    ///
    /// Inserts the post once it qualifies; never removes. Posts created
    /// before the current window opened are ignored.
    pub fn observe(&mut self, post: &Post) {
        if post.created_at < self.window_started_at {
            return;
        }
        if self.entries.contains_key(&post.id) {
            return;
        }
        if post.engagement() >= self.threshold {
            self.entries.insert(
                post.id,
                EligibleEntry {
                    author: post.author,
                    post: post.id,
                    engagement: post.engagement(),
                    created_at: post.created_at,
                },
            );
        }
    }

    /// Whether a post is currently in the eligible set
    pub fn is_eligible(&self, post_id: PostId) -> bool {
        self.entries.contains_key(&post_id)
    }

    /// Authors of eligible posts, ordered by ascending post id
    ///
    /// One entry per eligible post: an author with two qualifying posts
    /// appears twice and draws twice the odds.
    pub fn eligible_authors(&self) -> Vec<AuthorId> {
        self.entries.values().map(|e| e.author).collect()
    }

    /// Ids of eligible posts, ascending
    pub fn eligible_post_ids(&self) -> Vec<PostId> {
        self.entries.keys().copied().collect()
    }

    /// Number of eligible posts
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no post is eligible
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Start of the active window
    pub fn window_started_at(&self) -> u64 {
        self.window_started_at
    }

    /// Clear the set and open a new window at `now`
    ///
    /// Called exactly once per completed (or abandoned) disbursement cycle.
    pub fn reset(&mut self, now: u64) {
        self.entries.clear();
        self.window_started_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::id_from_bytes;

    fn qualified_post(id: PostId, author: &[u8], created_at: u64, votes: u8) -> Post {
        let mut post = Post::new(id, id_from_bytes(author), "p".into(), None, created_at);
        for i in 0..votes {
            post.upvote(id_from_bytes(&[b'v', i]));
        }
        post
    }

    #[test]
    fn test_below_threshold_not_eligible() {
        let mut tracker = EligibilityTracker::new(3, 0);
        tracker.observe(&qualified_post(1, b"a", 10, 2));
        assert!(!tracker.is_eligible(1));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_crossing_threshold_grants_eligibility() {
        let mut tracker = EligibilityTracker::new(3, 0);
        tracker.observe(&qualified_post(1, b"a", 10, 3));
        assert!(tracker.is_eligible(1));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_eligibility_is_monotonic_within_window() {
        let mut tracker = EligibilityTracker::new(3, 0);
        let mut post = qualified_post(1, b"a", 10, 3);
        tracker.observe(&post);
        assert!(tracker.is_eligible(1));

        // Votes withdrawn after the fact do not revoke eligibility
        post.downvote(id_from_bytes(b"h1"));
        post.downvote(id_from_bytes(b"h2"));
        tracker.observe(&post);
        assert!(tracker.is_eligible(1));
    }

    #[test]
    fn test_pre_window_posts_ignored() {
        let mut tracker = EligibilityTracker::new(1, 100);
        tracker.observe(&qualified_post(1, b"a", 50, 5));
        assert!(!tracker.is_eligible(1));
    }

    #[test]
    fn test_authors_ordered_by_post_id() {
        let mut tracker = EligibilityTracker::new(1, 0);
        // Observe out of order; iteration must come back ascending
        tracker.observe(&qualified_post(7, b"c", 10, 1));
        tracker.observe(&qualified_post(2, b"a", 10, 1));
        tracker.observe(&qualified_post(5, b"b", 10, 1));

        assert_eq!(tracker.eligible_post_ids(), vec![2, 5, 7]);
        assert_eq!(
            tracker.eligible_authors(),
            vec![
                id_from_bytes(b"a"),
                id_from_bytes(b"b"),
                id_from_bytes(b"c")
            ]
        );
    }

    #[test]
    fn test_reset_clears_and_rolls_window() {
        let mut tracker = EligibilityTracker::new(1, 0);
        tracker.observe(&qualified_post(1, b"a", 10, 1));
        assert_eq!(tracker.len(), 1);

        tracker.reset(500);
        assert!(tracker.is_empty());
        assert_eq!(tracker.window_started_at(), 500);

        // The old post is now outside the window
        tracker.observe(&qualified_post(1, b"a", 10, 1));
        assert!(tracker.is_empty());
    }
}
