//! # Poll actions
//!
//! What each route does, independent of HTTP.
//!
//! - Field validation runs before storage is touched, so a rejected request never mutates anything
//! - Owner actions hand the owner id to the store, which matches on id and owner together
//! - Voting checks the poll lifecycle first and leaves duplicate detection to the store
use ballot::{
    NormalizedResults, Poll, PollChanges, PollContent, VoteError, VoteForm, normalize_results,
    tally, validate_poll_for_voting,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{auth::Owner, error::AppError, state::AppState, store::StoreError};

#[derive(Deserialize, Debug, Clone)]
pub struct CreatePoll {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct UpdatePoll {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Serialize, Debug, Clone)]
pub struct PollResults {
    pub poll: Poll,
    pub results: NormalizedResults,
    pub accepting_votes: bool,
    pub reason: Option<String>,
    pub share_url: String,
}

pub async fn create_poll(
    state: &AppState,
    Owner(owner_id): &Owner,
    request: CreatePoll,
) -> Result<Poll, AppError> {
    let content = PollContent::parse(&request.question, &request.options)?;
    let poll = Poll::new(owner_id.as_str(), content, request.expires_at, Utc::now());

    state.store.insert_poll(&poll).await?;
    info!("Created poll {} with {} options", poll.id, poll.options.len());

    Ok(poll)
}

pub async fn list_polls(state: &AppState, Owner(owner_id): &Owner) -> Result<Vec<Poll>, AppError> {
    Ok(state.store.list_polls(owner_id).await?)
}

pub async fn get_owned_poll(
    state: &AppState,
    Owner(owner_id): &Owner,
    id: Uuid,
) -> Result<Poll, AppError> {
    state
        .store
        .get_poll(id)
        .await?
        .filter(|poll| poll.is_owned_by(owner_id))
        .ok_or(AppError::NoAccess)
}

pub async fn update_poll(
    state: &AppState,
    Owner(owner_id): &Owner,
    id: Uuid,
    request: UpdatePoll,
) -> Result<Poll, AppError> {
    let changes = PollChanges {
        content: PollContent::parse(&request.question, &request.options)?,
        expires_at: request.expires_at,
        is_active: request.is_active.unwrap_or(true),
    };

    let updated = state
        .store
        .update_poll(id, owner_id, changes, Utc::now())
        .await?
        .ok_or_else(|| {
            warn!("Update of poll {id} matched no poll owned by the caller");
            AppError::NoAccess
        })?;

    info!("Updated poll {id}");

    Ok(updated)
}

pub async fn delete_poll(
    state: &AppState,
    Owner(owner_id): &Owner,
    id: Uuid,
) -> Result<(), AppError> {
    if !state.store.delete_poll(id, owner_id).await? {
        warn!("Delete of poll {id} matched no poll owned by the caller");
        return Err(AppError::NoAccess);
    }

    info!("Deleted poll {id}");

    Ok(())
}

pub async fn submit_vote(state: &AppState, form: VoteForm) -> Result<NormalizedResults, AppError> {
    let vote = form.into_vote()?;

    let poll = state.store.get_poll(vote.poll_id).await?;
    validate_poll_for_voting(poll.as_ref(), Utc::now())?;

    let poll = poll.ok_or(VoteError::PollNotFound)?;
    vote.check_option(&poll)?;

    let voter_key = vote.voter_key(state.config.vote_scope);

    match state.store.insert_vote(&vote, &voter_key).await {
        Ok(()) => {}
        Err(StoreError::Duplicate) => {
            info!("Duplicate vote on poll {}", vote.poll_id);
            return Err(VoteError::AlreadyVoted.into());
        }
        Err(StoreError::NotFound) => return Err(VoteError::PollNotFound.into()),
        Err(e) => return Err(e.into()),
    }

    let counts = state.store.vote_counts(poll.id).await?;

    Ok(normalize_results(&tally(&poll.options, &counts)))
}

pub async fn poll_results(state: &AppState, id: Uuid) -> Result<PollResults, AppError> {
    let poll = state
        .store
        .get_poll(id)
        .await?
        .ok_or(AppError::PollNotFound)?;

    let counts = state.store.vote_counts(id).await?;
    let results = normalize_results(&tally(&poll.options, &counts));

    let (accepting_votes, reason) = match poll.accepts_votes(Utc::now()) {
        Ok(()) => (true, None),
        Err(reason) => (false, Some(reason.to_string())),
    };

    Ok(PollResults {
        share_url: state.config.share_url(poll.id),
        poll,
        results,
        accepting_votes,
        reason,
    })
}
