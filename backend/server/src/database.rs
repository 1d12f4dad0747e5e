//! # Redis
//!
//! RAM database.
//!
//! Core purpose is to store polls, remember who voted and keep per-option vote counts.
//!
//! ## Requirements
//!
//! - Fast lookups by poll id
//! - At most one vote per voter key per poll, even under concurrent submissions
//! - Owners only ever touch their own polls
//!
//! ## Implementation
//!
//! - `poll:{id}`: hash with `owner` (plain string) and `data` (protobuf `PollRecord`)
//! - `poll:{id}:voters`: set of voter keys, `SADD` returning 0 means already voted
//! - `poll:{id}:counts`: hash of option index to **votes** int
//! - `owner:{owner}:polls`: sorted set of poll ids scored by creation time in ms
//! - Targets a single Redis node: poll creation and deletion touch both a poll's keys and the owner index, which would live in different cluster slots
//! - Vote insert, owner-filtered update and delete run as Lua scripts, Redis executes each atomically
use std::{collections::HashMap, fmt::Display, sync::LazyLock, time::Duration};

use async_trait::async_trait;
use ballot::{Poll, PollChanges, Vote};
use chrono::{DateTime, Utc};
use redis::{
    AsyncCommands, Client, RedisError, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
#[cfg(feature = "verbose")]
use tracing::info;
use uuid::Uuid;

use crate::store::{PollStore, StoreError};

static VOTE_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('EXISTS', KEYS[1]) == 0 then
            return -1
        end
        if redis.call('SADD', KEYS[2], ARGV[1]) == 0 then
            return 0
        end
        redis.call('HINCRBY', KEYS[3], ARGV[2], 1)
        return 1
        ",
    )
});

static UPDATE_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('HGET', KEYS[1], 'owner') ~= ARGV[1] then
            return 0
        end
        redis.call('HSET', KEYS[1], 'data', ARGV[2])
        return 1
        ",
    )
});

static DELETE_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
        if redis.call('HGET', KEYS[1], 'owner') ~= ARGV[1] then
            return 0
        end
        redis.call('DEL', KEYS[1], KEYS[2], KEYS[3])
        redis.call('ZREM', KEYS[4], ARGV[2])
        return 1
        ",
    )
});

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, RedisError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;

    client.get_connection_manager_with_config(config).await
}

fn poll_key(id: impl Display) -> String {
    format!("poll:{{{id}}}")
}

fn voters_key(id: Uuid) -> String {
    format!("poll:{{{id}}}:voters")
}

fn counts_key(id: Uuid) -> String {
    format!("poll:{{{id}}}:counts")
}

fn owner_key(owner_id: &str) -> String {
    format!("owner:{{{owner_id}}}:polls")
}

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl PollStore for RedisStore {
    async fn insert_poll(&self, poll: &Poll) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let key = poll_key(poll.id);

        redis::pipe()
            .atomic()
            .hset(&key, "owner", &poll.owner_id)
            .ignore()
            .hset(&key, "data", poll.encode())
            .ignore()
            .zadd(
                owner_key(&poll.owner_id),
                poll.id.to_string(),
                poll.created_at.timestamp_millis(),
            )
            .ignore()
            .query_async::<()>(&mut connection)
            .await?;

        #[cfg(feature = "verbose")]
        info!("Stored poll {}", poll.id);

        Ok(())
    }

    async fn get_poll(&self, id: Uuid) -> Result<Option<Poll>, StoreError> {
        let mut connection = self.connection.clone();
        let data: Option<Vec<u8>> = connection.hget(poll_key(id), "data").await?;

        Ok(data.map(|bytes| Poll::decode(&bytes)).transpose()?)
    }

    async fn list_polls(&self, owner_id: &str) -> Result<Vec<Poll>, StoreError> {
        let mut connection = self.connection.clone();
        let ids: Vec<String> = connection.zrevrange(owner_key(owner_id), 0, -1).await?;

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for id in &ids {
            pipe.hget(poll_key(id), "data");
        }
        let blobs: Vec<Option<Vec<u8>>> = pipe.query_async(&mut connection).await?;

        // a poll deleted between the two round trips is simply skipped
        let polls = blobs
            .into_iter()
            .flatten()
            .map(|bytes| Poll::decode(&bytes))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(polls)
    }

    async fn update_poll(
        &self,
        id: Uuid,
        owner_id: &str,
        changes: PollChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<Poll>, StoreError> {
        let Some(mut poll) = self.get_poll(id).await? else {
            return Ok(None);
        };

        if !poll.is_owned_by(owner_id) {
            return Ok(None);
        }

        poll.apply(changes, now);

        let mut connection = self.connection.clone();
        let updated: i64 = UPDATE_SCRIPT
            .key(poll_key(id))
            .arg(owner_id)
            .arg(poll.encode())
            .invoke_async(&mut connection)
            .await?;

        Ok((updated == 1).then_some(poll))
    }

    async fn delete_poll(&self, id: Uuid, owner_id: &str) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let deleted: i64 = DELETE_SCRIPT
            .key(poll_key(id))
            .key(voters_key(id))
            .key(counts_key(id))
            .key(owner_key(owner_id))
            .arg(owner_id)
            .arg(id.to_string())
            .invoke_async(&mut connection)
            .await?;

        Ok(deleted == 1)
    }

    async fn insert_vote(&self, vote: &Vote, voter_key: &str) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let outcome: i64 = VOTE_SCRIPT
            .key(poll_key(vote.poll_id))
            .key(voters_key(vote.poll_id))
            .key(counts_key(vote.poll_id))
            .arg(voter_key)
            .arg(vote.option_index)
            .invoke_async(&mut connection)
            .await?;

        match outcome {
            1 => Ok(()),
            0 => Err(StoreError::Duplicate),
            _ => Err(StoreError::NotFound),
        }
    }

    async fn vote_counts(&self, id: Uuid) -> Result<HashMap<u32, u64>, StoreError> {
        let mut connection = self.connection.clone();
        let counts: HashMap<u32, u64> = connection.hgetall(counts_key(id)).await?;

        Ok(counts)
    }
}
