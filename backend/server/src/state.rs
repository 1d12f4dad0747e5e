use std::sync::Arc;

use ballot::TokenVerifier;
use tracing::info;

use super::{
    config::{Config, StoreKind},
    database::{RedisStore, init_redis},
    error::ServerError,
    memory::MemoryStore,
    store::PollStore,
};

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn PollStore>,
    pub verifier: TokenVerifier,
}

impl AppState {
    pub async fn new() -> Result<Arc<Self>, ServerError> {
        let config = Config::load()?;

        let store: Arc<dyn PollStore> = match config.store {
            StoreKind::Redis => {
                info!("Connecting to Redis at {}", config.redis_url);
                Arc::new(RedisStore::new(init_redis(&config.redis_url).await?))
            }
            StoreKind::Memory => {
                info!("Using in-memory store, polls will not survive a restart");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::with_store(config, store))
    }

    pub fn with_store(config: Config, store: Arc<dyn PollStore>) -> Arc<Self> {
        let verifier = TokenVerifier::new(config.token_secret.clone());

        Arc::new(Self {
            config,
            store,
            verifier,
        })
    }
}
