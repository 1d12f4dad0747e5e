use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection, rejection::PathRejection},
    http::StatusCode,
    response::IntoResponse,
};
use ballot::VoteForm;
use serde_json::json;
use uuid::Uuid;

use crate::{
    auth::Owner,
    error::AppError,
    service::{self, CreatePoll, UpdatePoll},
    state::AppState,
};

type PollPath = Result<Path<Uuid>, PathRejection>;

// an id that is not a uuid can not name any poll
fn poll_id(path: PollPath, missing: AppError) -> Result<Uuid, AppError> {
    path.map(|Path(id)| id).map_err(|_| missing)
}

pub async fn create_poll_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    payload: Result<Json<CreatePoll>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let poll = service::create_poll(&state, &owner, request).await?;

    Ok((StatusCode::CREATED, Json(json!({ "poll": poll }))))
}

pub async fn list_polls_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
) -> Result<impl IntoResponse, AppError> {
    let polls = service::list_polls(&state, &owner).await?;

    Ok(Json(json!({ "polls": polls })))
}

pub async fn get_poll_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    path: PollPath,
) -> Result<impl IntoResponse, AppError> {
    let id = poll_id(path, AppError::NoAccess)?;
    let poll = service::get_owned_poll(&state, &owner, id).await?;

    Ok(Json(json!({ "poll": poll })))
}

pub async fn update_poll_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    path: PollPath,
    payload: Result<Json<UpdatePoll>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let id = poll_id(path, AppError::NoAccess)?;
    let Json(request) = payload?;
    let poll = service::update_poll(&state, &owner, id, request).await?;

    Ok(Json(json!({ "poll": poll })))
}

pub async fn delete_poll_handler(
    State(state): State<Arc<AppState>>,
    owner: Owner,
    path: PollPath,
) -> Result<impl IntoResponse, AppError> {
    let id = poll_id(path, AppError::NoAccess)?;
    service::delete_poll(&state, &owner, id).await?;

    Ok(Json(json!({ "deleted": true })))
}

pub async fn results_handler(
    State(state): State<Arc<AppState>>,
    path: PollPath,
) -> Result<impl IntoResponse, AppError> {
    let id = poll_id(path, AppError::PollNotFound)?;
    let results = service::poll_results(&state, id).await?;

    Ok(Json(results))
}

pub async fn votes_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VoteForm>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(form) = payload?;
    let results = service::submit_vote(&state, form).await?;

    Ok((StatusCode::CREATED, Json(json!({ "results": results }))))
}
