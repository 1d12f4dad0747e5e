use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use ballot::UniquenessScope;
use secrecy::SecretString;
use thiserror::Error;
use tracing::{info, warn};

pub const TOKEN_SECRET: &str = "POLLS_TOKEN_SECRET";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {key} value: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Failed to read secret {name}: {source}")]
    Secret {
        name: String,
        source: std::io::Error,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Redis,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "redis" => Ok(Self::Redis),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store '{other}', expected 'redis' or 'memory'")),
        }
    }
}

pub struct Config {
    pub port: u16,
    pub store: StoreKind,
    pub redis_url: String,
    pub vote_scope: UniquenessScope,
    pub public_url: String,
    pub token_secret: SecretString,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            store: try_load("POLL_STORE", "redis")?,
            redis_url: try_load("REDIS_URL", "redis://redis:6379")?,
            vote_scope: try_load("VOTE_SCOPE", "option")?,
            public_url: try_load::<String>("PUBLIC_URL", "http://localhost:3000")?
                .trim_end_matches('/')
                .to_string(),
            token_secret: read_secret(TOKEN_SECRET)?,
        })
    }

    pub fn share_url(&self, poll_id: impl Display) -> String {
        format!("{}/poll/{poll_id}", self.public_url)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");

            ConfigError::Invalid {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })
}

/// Reads `SECRETS_DIR/<name>`, defaulting to Docker's `/run/secrets`.
pub fn read_secret(secret_name: &str) -> Result<SecretString, ConfigError> {
    let dir = var("SECRETS_DIR").unwrap_or_else(|| "/run/secrets".to_string());
    let path = format!("{}/{secret_name}", dir.trim_end_matches('/'));

    read_to_string(&path)
        .map(|s| SecretString::from(s.trim().to_string()))
        .map_err(|source| {
            warn!("Failed to read {secret_name} from file: {source}");

            ConfigError::Secret {
                name: secret_name.to_string(),
                source,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_kind() {
        assert_eq!("redis".parse::<StoreKind>(), Ok(StoreKind::Redis));
        assert_eq!(" Memory ".parse::<StoreKind>(), Ok(StoreKind::Memory));
        assert!("postgres".parse::<StoreKind>().is_err());
    }

    #[test]
    fn test_default_used_when_unset() {
        let port: u16 = try_load("POLLS_TEST_SURELY_UNSET_PORT", "1111").unwrap();

        assert_eq!(port, 1111);
    }

    #[test]
    fn test_bad_default_is_an_error() {
        let result = try_load::<u16>("POLLS_TEST_SURELY_UNSET_PORT", "not-a-port");

        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
