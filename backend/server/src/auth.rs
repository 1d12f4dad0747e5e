//! # Owner authentication
//!
//! Thin adapter over the identity service: the `Authorization: Bearer <token>`
//! header is checked against the shared secret and yields the owner id.
//! Public routes (results, voting) never require it.
use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::{error::AppError, state::AppState};

/// Id of the authenticated poll owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Owner(pub String);

impl FromRequestParts<Arc<AppState>> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AppError::MissingToken)?;

        let owner_id = state.verifier.verify(token).map_err(|e| {
            warn!("Rejected owner token: {e}");
            e
        })?;

        Ok(Owner(owner_id))
    }
}
