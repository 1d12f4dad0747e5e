use std::collections::HashMap;

use async_trait::async_trait;
use ballot::{Poll, PollChanges, RecordError, Vote};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Voter key already used on this poll")]
    Duplicate,

    #[error("Poll not found")]
    NotFound,

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error(transparent)]
    Record(#[from] RecordError),
}

/// Poll and vote storage.
///
/// Owner-scoped operations match on both the poll id and the owner id, so a
/// poll owned by someone else behaves exactly like a missing one.
#[async_trait]
pub trait PollStore: Send + Sync {
    async fn insert_poll(&self, poll: &Poll) -> Result<(), StoreError>;

    async fn get_poll(&self, id: Uuid) -> Result<Option<Poll>, StoreError>;

    /// Newest first.
    async fn list_polls(&self, owner_id: &str) -> Result<Vec<Poll>, StoreError>;

    async fn update_poll(
        &self,
        id: Uuid,
        owner_id: &str,
        changes: PollChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Poll>, StoreError>;

    /// Removes the poll and its votes. `false` when nothing matched.
    async fn delete_poll(&self, id: Uuid, owner_id: &str) -> Result<bool, StoreError>;

    /// Records the voter key and bumps the option count as one step.
    ///
    /// Fails with [`StoreError::Duplicate`] when the voter key is already
    /// present for the poll, leaving the counts untouched.
    async fn insert_vote(&self, vote: &Vote, voter_key: &str) -> Result<(), StoreError>;

    async fn vote_counts(&self, id: Uuid) -> Result<HashMap<u32, u64>, StoreError>;
}
