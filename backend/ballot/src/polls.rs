//! # Polls
//!
//! A poll is a question, an ordered list of option labels, an active flag and
//! an optional expiration. Options are addressed by their index, so votes
//! and counts refer to `0..options.len()`.
//!
//! ## Field rules
//!
//! - Question: trimmed, 5 to 200 characters
//! - Options: trimmed, empty ones dropped, 2 to 10 left, each at most 100 characters
//! - Options must be unique ignoring case
//!
//! ## Storage
//!
//! Polls are stored as a [`PollRecord`] protobuf message. Timestamps are kept
//! as unix milliseconds.
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use prost::Message;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::votes::VoteError;

pub const MIN_QUESTION_LEN: usize = 5;
pub const MAX_QUESTION_LEN: usize = 200;
pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 10;
pub const MAX_OPTION_LEN: usize = 100;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PollError {
    #[error("Question must be at least 5 characters long")]
    QuestionTooShort,

    #[error("Question must be less than 200 characters")]
    QuestionTooLong,

    #[error("At least 2 options are required")]
    TooFewOptions,

    #[error("Maximum 10 options allowed")]
    TooManyOptions,

    #[error("Option must be less than 100 characters")]
    OptionTooLong,

    #[error("Duplicate options are not allowed")]
    DuplicateOptions,
}

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Undecodable poll record: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Invalid poll id in record: {0}")]
    Id(#[from] uuid::Error),

    #[error("Timestamp out of range in record: {0}")]
    Timestamp(i64),
}

/// Question and options that passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollContent {
    question: String,
    options: Vec<String>,
}

impl PollContent {
    pub fn parse<S: AsRef<str>>(question: &str, options: &[S]) -> Result<Self, PollError> {
        let question = question.trim();
        let question_len = question.chars().count();

        if question_len < MIN_QUESTION_LEN {
            return Err(PollError::QuestionTooShort);
        }
        if question_len > MAX_QUESTION_LEN {
            return Err(PollError::QuestionTooLong);
        }

        let options: Vec<String> = options
            .iter()
            .map(|option| option.as_ref().trim())
            .filter(|option| !option.is_empty())
            .map(str::to_string)
            .collect();

        let mut seen = HashSet::with_capacity(options.len());
        if !options.iter().all(|option| seen.insert(option.to_lowercase())) {
            return Err(PollError::DuplicateOptions);
        }

        if options.len() < MIN_OPTIONS {
            return Err(PollError::TooFewOptions);
        }
        if options.len() > MAX_OPTIONS {
            return Err(PollError::TooManyOptions);
        }
        if options
            .iter()
            .any(|option| option.chars().count() > MAX_OPTION_LEN)
        {
            return Err(PollError::OptionTooLong);
        }

        Ok(Self {
            question: question.to_string(),
            options,
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }
}

/// Everything an owner may change on an existing poll.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollChanges {
    pub content: PollContent,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Poll {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub owner_id: String,
    pub question: String,
    pub options: Vec<String>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Poll {
    pub fn new(
        owner_id: impl Into<String>,
        content: PollContent,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.into(),
            question: content.question,
            options: content.options,
            is_active: true,
            expires_at,
            created_at: now,
            updated_at: None,
        }
    }

    pub fn apply(&mut self, changes: PollChanges, now: DateTime<Utc>) {
        self.question = changes.content.question;
        self.options = changes.content.options;
        self.expires_at = changes.expires_at;
        self.is_active = changes.is_active;
        self.updated_at = Some(now);
    }

    pub fn is_owned_by(&self, owner_id: &str) -> bool {
        self.owner_id == owner_id
    }

    /// A poll takes votes while active and not past its expiration.
    pub fn accepts_votes(&self, now: DateTime<Utc>) -> Result<(), VoteError> {
        if !self.is_active {
            return Err(VoteError::Inactive);
        }

        match self.expires_at {
            Some(expires_at) if expires_at <= now => Err(VoteError::Expired),
            _ => Ok(()),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        PollRecord::from(self).encode_to_vec()
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        Self::try_from(PollRecord::decode(bytes)?)
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct PollRecord {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub owner_id: String,
    #[prost(string, tag = "3")]
    pub question: String,
    #[prost(string, repeated, tag = "4")]
    pub options: Vec<String>,
    #[prost(bool, tag = "5")]
    pub is_active: bool,
    #[prost(int64, optional, tag = "6")]
    pub expires_at_ms: Option<i64>,
    #[prost(int64, tag = "7")]
    pub created_at_ms: i64,
    #[prost(int64, optional, tag = "8")]
    pub updated_at_ms: Option<i64>,
}

impl From<&Poll> for PollRecord {
    fn from(poll: &Poll) -> Self {
        Self {
            id: poll.id.to_string(),
            owner_id: poll.owner_id.clone(),
            question: poll.question.clone(),
            options: poll.options.clone(),
            is_active: poll.is_active,
            expires_at_ms: poll.expires_at.map(|at| at.timestamp_millis()),
            created_at_ms: poll.created_at.timestamp_millis(),
            updated_at_ms: poll.updated_at.map(|at| at.timestamp_millis()),
        }
    }
}

impl TryFrom<PollRecord> for Poll {
    type Error = RecordError;

    fn try_from(record: PollRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&record.id)?,
            owner_id: record.owner_id,
            question: record.question,
            options: record.options,
            is_active: record.is_active,
            expires_at: record.expires_at_ms.map(from_millis).transpose()?,
            created_at: from_millis(record.created_at_ms)?,
            updated_at: record.updated_at_ms.map(from_millis).transpose()?,
        })
    }
}

fn from_millis(ms: i64) -> Result<DateTime<Utc>, RecordError> {
    DateTime::from_timestamp_millis(ms).ok_or(RecordError::Timestamp(ms))
}
