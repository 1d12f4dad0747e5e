//! # In-memory store
//!
//! Process-local [`PollStore`], nothing survives a restart. Used by the tests
//! and for running the server without Redis (`POLL_STORE=memory`).
//!
//! A single lock guards polls and votes together, so the duplicate check and
//! the count bump in [`PollStore::insert_vote`] can not interleave.
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use ballot::{Poll, PollChanges, Vote};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::store::{PollStore, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    polls: HashMap<Uuid, Poll>,
    votes: HashMap<Uuid, PollVotes>,
}

#[derive(Default)]
struct PollVotes {
    voters: HashSet<String>,
    counts: HashMap<u32, u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PollStore for MemoryStore {
    async fn insert_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        self.inner.write().polls.insert(poll.id, poll.clone());

        Ok(())
    }

    async fn get_poll(&self, id: Uuid) -> Result<Option<Poll>, StoreError> {
        Ok(self.inner.read().polls.get(&id).cloned())
    }

    async fn list_polls(&self, owner_id: &str) -> Result<Vec<Poll>, StoreError> {
        let mut polls: Vec<Poll> = self
            .inner
            .read()
            .polls
            .values()
            .filter(|poll| poll.is_owned_by(owner_id))
            .cloned()
            .collect();

        polls.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(polls)
    }

    async fn update_poll(
        &self,
        id: Uuid,
        owner_id: &str,
        changes: PollChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Poll>, StoreError> {
        let mut inner = self.inner.write();

        let Some(poll) = inner
            .polls
            .get_mut(&id)
            .filter(|poll| poll.is_owned_by(owner_id))
        else {
            return Ok(None);
        };

        poll.apply(changes, now);

        Ok(Some(poll.clone()))
    }

    async fn delete_poll(&self, id: Uuid, owner_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();

        let owned = inner
            .polls
            .get(&id)
            .is_some_and(|poll| poll.is_owned_by(owner_id));

        if owned {
            inner.polls.remove(&id);
            inner.votes.remove(&id);
        }

        Ok(owned)
    }

    async fn insert_vote(&self, vote: &Vote, voter_key: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write();

        if !inner.polls.contains_key(&vote.poll_id) {
            return Err(StoreError::NotFound);
        }

        let votes = inner.votes.entry(vote.poll_id).or_default();

        if !votes.voters.insert(voter_key.to_string()) {
            return Err(StoreError::Duplicate);
        }

        *votes.counts.entry(vote.option_index).or_insert(0) += 1;

        Ok(())
    }

    async fn vote_counts(&self, id: Uuid) -> Result<HashMap<u32, u64>, StoreError> {
        Ok(self
            .inner
            .read()
            .votes
            .get(&id)
            .map(|votes| votes.counts.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use ballot::PollContent;
    use chrono::Duration;

    use super::*;

    fn poll(owner_id: &str, created_at: DateTime<Utc>) -> Poll {
        let content =
            PollContent::parse("What is your favorite color?", &["Red", "Blue", "Green"]).unwrap();

        Poll::new(owner_id, content, None, created_at)
    }

    fn vote(poll: &Poll, option_index: u32, fingerprint: &str) -> Vote {
        Vote {
            poll_id: poll.id,
            option_index,
            fingerprint: fingerprint.to_string(),
        }
    }

    fn changes() -> PollChanges {
        PollChanges {
            content: PollContent::parse("Which pet do you prefer?", &["Cat", "Dog"]).unwrap(),
            expires_at: None,
            is_active: false,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = MemoryStore::new();
        let poll = poll("u1", Utc::now());

        store.insert_poll(&poll).await.unwrap();

        assert_eq!(store.get_poll(poll.id).await.unwrap(), Some(poll));
        assert_eq!(store.get_poll(Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let older = poll("u1", now - Duration::hours(2));
        let newer = poll("u1", now);
        let foreign = poll("u2", now);

        for poll in [&older, &newer, &foreign] {
            store.insert_poll(poll).await.unwrap();
        }

        let ids: Vec<Uuid> = store
            .list_polls("u1")
            .await
            .unwrap()
            .iter()
            .map(|poll| poll.id)
            .collect();

        assert_eq!(ids, [newer.id, older.id]);
    }

    #[tokio::test]
    async fn test_update_requires_owner() {
        let store = MemoryStore::new();
        let poll = poll("u1", Utc::now());
        store.insert_poll(&poll).await.unwrap();

        let rejected = store
            .update_poll(poll.id, "u2", changes(), Utc::now())
            .await
            .unwrap();
        assert_eq!(rejected, None);
        assert_eq!(store.get_poll(poll.id).await.unwrap(), Some(poll.clone()));

        let updated = store
            .update_poll(poll.id, "u1", changes(), Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.question, "Which pet do you prefer?");
        assert!(!updated.is_active);
    }

    #[tokio::test]
    async fn test_delete_requires_owner() {
        let store = MemoryStore::new();
        let poll = poll("u1", Utc::now());
        store.insert_poll(&poll).await.unwrap();
        store.insert_vote(&vote(&poll, 0, "fp"), "0:fp").await.unwrap();

        assert!(!store.delete_poll(poll.id, "u2").await.unwrap());
        assert!(store.get_poll(poll.id).await.unwrap().is_some());

        assert!(store.delete_poll(poll.id, "u1").await.unwrap());
        assert!(store.get_poll(poll.id).await.unwrap().is_none());
        assert!(store.vote_counts(poll.id).await.unwrap().is_empty());
        assert!(!store.delete_poll(poll.id, "u1").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_vote_leaves_counts() {
        let store = MemoryStore::new();
        let poll = poll("u1", Utc::now());
        store.insert_poll(&poll).await.unwrap();

        store.insert_vote(&vote(&poll, 1, "fp"), "1:fp").await.unwrap();
        store.insert_vote(&vote(&poll, 2, "fp"), "2:fp").await.unwrap();

        assert!(matches!(
            store.insert_vote(&vote(&poll, 1, "fp"), "1:fp").await,
            Err(StoreError::Duplicate)
        ));

        let counts = store.vote_counts(poll.id).await.unwrap();
        assert_eq!(counts.get(&1), Some(&1));
        assert_eq!(counts.get(&2), Some(&1));
    }

    #[tokio::test]
    async fn test_vote_on_missing_poll() {
        let store = MemoryStore::new();
        let poll = poll("u1", Utc::now());

        assert!(matches!(
            store.insert_vote(&vote(&poll, 0, "fp"), "0:fp").await,
            Err(StoreError::NotFound)
        ));
    }
}
