//! # Votes
//!
//! A vote links a poll, an option index and a voter fingerprint.
//!
//! ## Uniqueness
//!
//! Duplicate votes are caught by the store refusing a second vote with the same
//! voter key on a poll. The key depends on [`UniquenessScope`]:
//!
//! - `PerOption`: `"{option}:{fingerprint}"`, one vote per option per fingerprint
//! - `PerPoll`: `"{fingerprint}"`, one vote per poll per fingerprint
//!
//! ## Order of checks
//!
//! 1. Required fields present and well formed
//! 2. Poll exists, is active, is not expired
//! 3. Option index exists on the poll
//! 4. Store insert, a taken voter key means the fingerprint already voted
use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{fingerprint, polls::Poll};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoteError {
    #[error("Missing required fields")]
    MissingFields,

    #[error("Invalid option")]
    InvalidOption,

    #[error("Invalid fingerprint")]
    InvalidFingerprint,

    #[error("Poll not found")]
    PollNotFound,

    #[error("This poll is no longer active")]
    Inactive,

    #[error("This poll has expired")]
    Expired,

    #[error("You've already voted.")]
    AlreadyVoted,
}

/// Vote fields as a client submits them, all optional so that a missing one
/// is reported as such rather than as a parse failure.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VoteForm {
    pub poll_id: Option<String>,
    pub option_id: Option<OptionId>,
    pub fingerprint: Option<String>,
}

/// Option index as sent by the client, either a JSON string or a JSON number.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum OptionId {
    Number(i64),
    Text(String),
}

impl OptionId {
    fn is_blank(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }

    fn index(&self) -> Result<u32, VoteError> {
        match self {
            Self::Number(n) => u32::try_from(*n).map_err(|_| VoteError::InvalidOption),
            Self::Text(text) => text.trim().parse().map_err(|_| VoteError::InvalidOption),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    pub poll_id: Uuid,
    pub option_index: u32,
    pub fingerprint: String,
}

impl VoteForm {
    pub fn into_vote(self) -> Result<Vote, VoteError> {
        let (Some(poll_id), Some(option_id), Some(fingerprint)) = (
            present(self.poll_id),
            self.option_id.filter(|id| !id.is_blank()),
            present(self.fingerprint),
        ) else {
            return Err(VoteError::MissingFields);
        };

        let option_index = option_id.index()?;

        if !fingerprint::is_well_formed(&fingerprint) {
            return Err(VoteError::InvalidFingerprint);
        }

        // an id that cannot exist is reported the same as one that does not
        let poll_id = Uuid::parse_str(&poll_id).map_err(|_| VoteError::PollNotFound)?;

        Ok(Vote {
            poll_id,
            option_index,
            fingerprint,
        })
    }
}

fn present(field: Option<String>) -> Option<String> {
    field
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

impl Vote {
    pub fn check_option(&self, poll: &Poll) -> Result<(), VoteError> {
        if (self.option_index as usize) < poll.options.len() {
            Ok(())
        } else {
            Err(VoteError::InvalidOption)
        }
    }

    pub fn voter_key(&self, scope: UniquenessScope) -> String {
        match scope {
            UniquenessScope::PerOption => format!("{}:{}", self.option_index, self.fingerprint),
            UniquenessScope::PerPoll => self.fingerprint.clone(),
        }
    }
}

pub fn validate_poll_for_voting(poll: Option<&Poll>, now: DateTime<Utc>) -> Result<(), VoteError> {
    poll.ok_or(VoteError::PollNotFound)?.accepts_votes(now)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UniquenessScope {
    #[default]
    PerOption,
    PerPoll,
}

impl FromStr for UniquenessScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "option" => Ok(Self::PerOption),
            "poll" => Ok(Self::PerPoll),
            other => Err(format!("unknown vote scope '{other}', expected 'option' or 'poll'")),
        }
    }
}

impl fmt::Display for UniquenessScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerOption => write!(f, "option"),
            Self::PerPoll => write!(f, "poll"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::polls::PollContent;

    const POLL_ID: &str = "6f9619ff-8b86-d011-b42d-00cf4fc964ff";

    fn form(poll_id: Option<&str>, option_id: Option<&str>, fingerprint: Option<&str>) -> VoteForm {
        VoteForm {
            poll_id: poll_id.map(str::to_string),
            option_id: option_id.map(|id| OptionId::Text(id.to_string())),
            fingerprint: fingerprint.map(str::to_string),
        }
    }

    fn poll(now: DateTime<Utc>) -> Poll {
        let content = PollContent::parse("What is your favorite color?", &["Red", "Blue", "Green"])
            .unwrap();

        Poll::new("u1", content, None, now)
    }

    #[test]
    fn test_into_vote() {
        let vote = form(Some(POLL_ID), Some("1"), Some("test-fingerprint"))
            .into_vote()
            .unwrap();

        assert_eq!(vote.poll_id, Uuid::parse_str(POLL_ID).unwrap());
        assert_eq!(vote.option_index, 1);
        assert_eq!(vote.fingerprint, "test-fingerprint");
    }

    #[test]
    fn test_option_id_is_parsed_as_integer() {
        let vote = form(Some(POLL_ID), Some(" 2 "), Some("fp"))
            .into_vote()
            .unwrap();

        assert_eq!(vote.option_index, 2);
    }

    #[test]
    fn test_missing_fields() {
        let cases = [
            form(None, Some("1"), Some("fp")),
            form(Some(POLL_ID), None, Some("fp")),
            form(Some(POLL_ID), Some("1"), None),
            form(Some(POLL_ID), Some("1"), Some("   ")),
            form(Some(""), Some("1"), Some("fp")),
        ];

        for case in cases {
            assert_eq!(case.into_vote(), Err(VoteError::MissingFields));
        }
    }

    #[test]
    fn test_bad_fields() {
        assert_eq!(
            form(Some(POLL_ID), Some("first"), Some("fp")).into_vote(),
            Err(VoteError::InvalidOption)
        );
        assert_eq!(
            form(Some(POLL_ID), Some("-1"), Some("fp")).into_vote(),
            Err(VoteError::InvalidOption)
        );
        assert_eq!(
            form(Some(POLL_ID), Some("0"), Some("not a fingerprint")).into_vote(),
            Err(VoteError::InvalidFingerprint)
        );
        assert_eq!(
            form(Some("test-poll-id"), Some("0"), Some("fp")).into_vote(),
            Err(VoteError::PollNotFound)
        );
    }

    #[test]
    fn test_form_wire_names() {
        let form: VoteForm = serde_json::from_str(
            r#"{"pollId":"abc","optionId":"1","fingerprint":"fp"}"#,
        )
        .unwrap();

        assert_eq!(form.poll_id.as_deref(), Some("abc"));
        assert_eq!(form.option_id, Some(OptionId::Text("1".to_string())));
        assert_eq!(form.fingerprint.as_deref(), Some("fp"));
    }

    #[test]
    fn test_numeric_option_id() {
        let form: VoteForm = serde_json::from_str(&format!(
            r#"{{"pollId":"{POLL_ID}","optionId":2,"fingerprint":"fp"}}"#
        ))
        .unwrap();
        assert_eq!(form.into_vote().unwrap().option_index, 2);

        let negative: VoteForm = serde_json::from_str(&format!(
            r#"{{"pollId":"{POLL_ID}","optionId":-3,"fingerprint":"fp"}}"#
        ))
        .unwrap();
        assert_eq!(negative.into_vote(), Err(VoteError::InvalidOption));
    }

    #[test]
    fn test_validate_poll_for_voting() {
        let now = Utc::now();

        assert_eq!(
            validate_poll_for_voting(None, now),
            Err(VoteError::PollNotFound)
        );

        let mut open = poll(now);
        assert_eq!(validate_poll_for_voting(Some(&open), now), Ok(()));

        open.expires_at = Some(now + Duration::days(1));
        assert_eq!(validate_poll_for_voting(Some(&open), now), Ok(()));

        let mut expired = poll(now);
        expired.expires_at = Some(now - Duration::days(1));
        assert_eq!(
            validate_poll_for_voting(Some(&expired), now),
            Err(VoteError::Expired)
        );

        let mut inactive = poll(now);
        inactive.is_active = false;
        assert_eq!(
            validate_poll_for_voting(Some(&inactive), now),
            Err(VoteError::Inactive)
        );
    }

    #[test]
    fn test_check_option() {
        let poll = poll(Utc::now());
        let mut vote = Vote {
            poll_id: poll.id,
            option_index: 2,
            fingerprint: "fp".to_string(),
        };

        assert_eq!(vote.check_option(&poll), Ok(()));

        vote.option_index = 3;
        assert_eq!(vote.check_option(&poll), Err(VoteError::InvalidOption));
    }

    #[test]
    fn test_voter_key() {
        let vote = Vote {
            poll_id: Uuid::nil(),
            option_index: 1,
            fingerprint: "abc".to_string(),
        };

        assert_eq!(vote.voter_key(UniquenessScope::PerOption), "1:abc");
        assert_eq!(vote.voter_key(UniquenessScope::PerPoll), "abc");
    }

    #[test]
    fn test_scope_from_str() {
        assert_eq!("option".parse::<UniquenessScope>(), Ok(UniquenessScope::PerOption));
        assert_eq!(" POLL ".parse::<UniquenessScope>(), Ok(UniquenessScope::PerPoll));
        assert!("ballot".parse::<UniquenessScope>().is_err());
        assert_eq!(UniquenessScope::PerPoll.to_string(), "poll");
    }
}
