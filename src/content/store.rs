//! In-memory content store
//!
//! Keyed maps of users and posts with ownership and duplicate-vote checks.
//! The store knows nothing about reward cycles; the engine reads engagement
//! from it through the eligibility tracker.

use crate::ids::{AuthorId, PostId};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use super::{Post, User};

/// Content store errors
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("User is not registered")]
    UnknownUser,
    #[error("Name already registered: {0}")]
    AlreadyRegistered(String),
    #[error("Post {0} does not exist")]
    UnknownPost(PostId),
    #[error("Only the post owner may do that")]
    NotPostOwner,
    #[error("Already voted on post {0}")]
    AlreadyVoted(PostId),
}

/// Users and posts behind the reward engine
#[derive(Debug)]
pub struct ContentStore {
    /// Registered users by id
    users: HashMap<AuthorId, User>,
    /// Posts by id; BTreeMap keeps post-id iteration order deterministic
    posts: BTreeMap<PostId, Post>,
    /// Next post id to allocate (post ids start at 1)
    next_post_id: PostId,
}

impl Default for ContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            posts: BTreeMap::new(),
            next_post_id: 1,
        }
    }

    /// Register a new user
    pub fn register_user(
        &mut self,
        name: &str,
        bio: &str,
        now: u64,
    ) -> Result<&User, ContentError> {
        let user = User::new(name, bio, now);
        if self.users.contains_key(&user.id) {
            return Err(ContentError::AlreadyRegistered(name.to_string()));
        }
        let id = user.id;
        self.users.insert(id, user);
        Ok(&self.users[&id])
    }

    /// Look up a user
    pub fn get_user(&self, id: &AuthorId) -> Option<&User> {
        self.users.get(id)
    }

    /// Create a post owned by `author`
    pub fn create_post(
        &mut self,
        author: AuthorId,
        content: String,
        image_hash: Option<String>,
        now: u64,
    ) -> Result<&Post, ContentError> {
        if !self.users.contains_key(&author) {
            return Err(ContentError::UnknownUser);
        }

        let id = self.next_post_id;
        self.next_post_id += 1;

        self.posts
            .insert(id, Post::new(id, author, content, image_hash, now));
        Ok(&self.posts[&id])
    }

    /// Edit a post's content; only the owner may edit
    pub fn edit_post(
        &mut self,
        author: &AuthorId,
        post_id: PostId,
        content: String,
        image_hash: Option<String>,
    ) -> Result<(), ContentError> {
        let post = self
            .posts
            .get_mut(&post_id)
            .ok_or(ContentError::UnknownPost(post_id))?;
        if post.author != *author {
            return Err(ContentError::NotPostOwner);
        }
        post.content = content;
        post.image_hash = image_hash;
        Ok(())
    }

    /// Delete a post; only the owner may delete
    pub fn delete_post(&mut self, author: &AuthorId, post_id: PostId) -> Result<(), ContentError> {
        let post = self
            .posts
            .get(&post_id)
            .ok_or(ContentError::UnknownPost(post_id))?;
        if post.author != *author {
            return Err(ContentError::NotPostOwner);
        }
        self.posts.remove(&post_id);
        Ok(())
    }

    /// Upvote a post, returning the post after the vote
    pub fn upvote(&mut self, voter: AuthorId, post_id: PostId) -> Result<&Post, ContentError> {
        if !self.users.contains_key(&voter) {
            return Err(ContentError::UnknownUser);
        }
        let post = self
            .posts
            .get_mut(&post_id)
            .ok_or(ContentError::UnknownPost(post_id))?;
        if !post.upvote(voter) {
            return Err(ContentError::AlreadyVoted(post_id));
        }
        Ok(post)
    }

    /// Downvote a post, returning the post after the vote
    pub fn downvote(&mut self, voter: AuthorId, post_id: PostId) -> Result<&Post, ContentError> {
        if !self.users.contains_key(&voter) {
            return Err(ContentError::UnknownUser);
        }
        let post = self
            .posts
            .get_mut(&post_id)
            .ok_or(ContentError::UnknownPost(post_id))?;
        if !post.downvote(voter) {
            return Err(ContentError::AlreadyVoted(post_id));
        }
        Ok(post)
    }

    /// Look up a post
    pub fn get_post(&self, post_id: PostId) -> Option<&Post> {
        self.posts.get(&post_id)
    }

    /// Ids of all posts by a given author, ascending
    pub fn get_user_posts(&self, author: &AuthorId) -> Vec<PostId> {
        self.posts
            .values()
            .filter(|p| p.author == *author)
            .map(|p| p.id)
            .collect()
    }

    /// Ids of posts created at or after `since`, ascending
    pub fn recent_post_ids(&self, since: u64) -> Vec<PostId> {
        self.posts
            .values()
            .filter(|p| p.created_at >= since)
            .map(|p| p.id)
            .collect()
    }

    /// Total number of posts
    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    /// Total number of registered users
    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_users(names: &[&str]) -> (ContentStore, Vec<AuthorId>) {
        let mut store = ContentStore::new();
        let ids = names
            .iter()
            .map(|n| store.register_user(n, "", 0).unwrap().id)
            .collect();
        (store, ids)
    }

    #[test]
    fn test_register_rejects_duplicate_name() {
        let mut store = ContentStore::new();
        store.register_user("alice", "bio", 0).unwrap();
        assert!(matches!(
            store.register_user("alice", "other", 1),
            Err(ContentError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn test_post_ids_start_at_one() {
        let (mut store, ids) = store_with_users(&["alice"]);
        let post = store.create_post(ids[0], "first".into(), None, 0).unwrap();
        assert_eq!(post.id, 1);
    }

    #[test]
    fn test_only_owner_may_edit_or_delete() {
        let (mut store, ids) = store_with_users(&["alice", "bob"]);
        store.create_post(ids[0], "mine".into(), None, 0).unwrap();

        assert!(matches!(
            store.edit_post(&ids[1], 1, "stolen".into(), None),
            Err(ContentError::NotPostOwner)
        ));
        assert!(matches!(
            store.delete_post(&ids[1], 1),
            Err(ContentError::NotPostOwner)
        ));
        assert!(store.delete_post(&ids[0], 1).is_ok());
    }

    #[test]
    fn test_unregistered_voter_rejected() {
        let (mut store, ids) = store_with_users(&["alice"]);
        store.create_post(ids[0], "post".into(), None, 0).unwrap();

        let stranger = crate::ids::id_from_bytes(b"stranger");
        assert!(matches!(
            store.upvote(stranger, 1),
            Err(ContentError::UnknownUser)
        ));
    }

    #[test]
    fn test_duplicate_vote_rejected() {
        let (mut store, ids) = store_with_users(&["alice", "bob"]);
        store.create_post(ids[0], "post".into(), None, 0).unwrap();

        store.upvote(ids[1], 1).unwrap();
        assert!(matches!(
            store.upvote(ids[1], 1),
            Err(ContentError::AlreadyVoted(1))
        ));
    }

    #[test]
    fn test_recent_post_ids_filters_by_time() {
        let (mut store, ids) = store_with_users(&["alice"]);
        store.create_post(ids[0], "old".into(), None, 10).unwrap();
        store.create_post(ids[0], "new".into(), None, 100).unwrap();

        assert_eq!(store.recent_post_ids(50), vec![2]);
        assert_eq!(store.recent_post_ids(0), vec![1, 2]);
    }
}
