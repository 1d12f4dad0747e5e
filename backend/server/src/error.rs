use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use ballot::{PollError, TokenError, VoteError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

use crate::{config::ConfigError, store::StoreError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload(#[from] JsonRejection),

    #[error("No authorization token provided")]
    MissingToken,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("Poll not found")]
    PollNotFound,

    #[error("Poll not found or access denied")]
    NoAccess,

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Vote(#[from] VoteError),

    #[error("Internal error")]
    Store(#[from] StoreError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MalformedPayload(_) | AppError::Poll(_) => StatusCode::BAD_REQUEST,
            AppError::MissingToken | AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::PollNotFound | AppError::NoAccess => StatusCode::NOT_FOUND,
            AppError::Vote(vote_error) => match vote_error {
                VoteError::MissingFields
                | VoteError::InvalidOption
                | VoteError::InvalidFingerprint => StatusCode::BAD_REQUEST,
                VoteError::PollNotFound => StatusCode::NOT_FOUND,
                VoteError::Inactive => StatusCode::FORBIDDEN,
                VoteError::Expired => StatusCode::GONE,
                VoteError::AlreadyVoted => StatusCode::CONFLICT,
            },
            AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::Store(source) => error!("Storage failure: {source}"),
            AppError::MalformedPayload(rejection) => warn!("Rejected payload: {rejection}"),
            _ => {}
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Startup failures, reported by the binary before exiting.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to connect to Redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Failed to bind or serve: {0}")]
    Io(#[from] std::io::Error),
}
