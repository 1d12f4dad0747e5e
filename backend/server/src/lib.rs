//! Documentation of a poll creation and voting platform.
//!
//! Owners create polls, share the link, and anyone with the link votes once.
//!
//!
//!
//! # General Infrastructure
//! - Frontend serves the pages and talks to this backend over JSON
//! - Identity service signs in owners and hands them a bearer token
//! - This backend checks the token signature with a shared secret, no session state on our side
//! - Redis holds polls, voter keys and counts
//!
//!
//!
//! # Routes
//!
//! | Method | Path | Auth | Purpose |
//! |---|---|---|---|
//! | POST | `/polls` | owner | Create a poll |
//! | GET | `/polls` | owner | List own polls, newest first |
//! | GET | `/polls/{id}` | owner | Fetch an own poll |
//! | PUT | `/polls/{id}` | owner | Replace question, options, expiry, active flag |
//! | DELETE | `/polls/{id}` | owner | Delete a poll and its votes |
//! | GET | `/polls/{id}/results` | public | Poll, percentages, whether it takes votes, share link |
//! | POST | `/votes` | public | Vote with `pollId`, `optionId`, `fingerprint` |
//!
//! Errors come back as `{ "error": "..." }`. Another owner's poll answers exactly like a missing one.
//!
//!
//!
//! # Preventing Duplicate Votes
//!
//! **Goal**: One vote per browser without accounts for voters.
//!
//! - Frontend derives a fingerprint from user agent, language, timezone and platform
//! - Fingerprint is sent with every vote
//! - Store keeps a set of voter keys per poll and refuses a key it already has
//! - `VOTE_SCOPE=option` (default): key is option + fingerprint, one vote per option
//! - `VOTE_SCOPE=poll`: key is the fingerprint alone, one vote per poll
//! - Not a security boundary, a determined voter can forge fingerprints
//!
//!
//!
//! # Poll Lifecycle
//!
//! - New polls are active with an optional expiration
//! - Votes are accepted only while active and before `expires_at`
//! - Owners can deactivate, re-activate or move the expiration at any time
//!
//!
//!
//! # Setup
//!
//! Environment.
//! ```sh
//! RUST_PORT=1111
//! POLL_STORE=redis        # or memory
//! REDIS_URL=redis://redis:6379
//! VOTE_SCOPE=option       # or poll
//! PUBLIC_URL=http://localhost:3000
//! RUST_LOG=info
//! ```
//!
//! Token secret is read from `/run/secrets/POLLS_TOKEN_SECRET` (`SECRETS_DIR` overrides the folder).
//!
//! Run without Redis.
//! ```sh
//! POLL_STORE=memory SECRETS_DIR=./secrets cargo run -p polls
//! ```
//!
//! Mint an owner token for local testing.
//! ```sh
//! cargo run -p tester -- token user-123 --secret-file ./secrets/POLLS_TOKEN_SECRET
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::{get, post},
};

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod memory;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

use error::ServerError;
use routes::{
    create_poll_handler, delete_poll_handler, get_poll_handler, list_polls_handler,
    results_handler, update_poll_handler, votes_handler,
};
use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/polls", post(create_poll_handler).get(list_polls_handler))
        .route(
            "/polls/{id}",
            get(get_poll_handler)
                .put(update_poll_handler)
                .delete(delete_poll_handler),
        )
        .route("/polls/{id}/results", get(results_handler))
        .route("/votes", post(votes_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<(), ServerError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await?;

    info!("Starting server...");

    let address = format!("0.0.0.0:{}", state.config.port);
    let app = router(state);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
