//! # Identity tokens
//!
//! Poll owners are identified by a bearer token minted by the identity
//! service, which shares a secret with this backend.
//!
//! Format: `<user-id>.<hex hmac-sha256(user-id)>`
//!
//! - The user id is everything before the last `.`
//! - Comparison is constant time
//! - The secret lives in a [`SecretString`] so it never ends up in logs
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed,

    #[error("Invalid or expired token")]
    InvalidSignature,
}

#[derive(Clone)]
pub struct TokenSigner {
    secret: SecretString,
}

impl TokenSigner {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    pub fn sign(&self, user_id: &str) -> String {
        format!(
            "{user_id}.{}",
            hex::encode(compute_signature(&self.secret, user_id))
        )
    }
}

#[derive(Clone)]
pub struct TokenVerifier {
    secret: SecretString,
}

impl TokenVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Returns the user id the token was issued for.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        let (user_id, signature_hex) = token.rsplit_once('.').ok_or(TokenError::Malformed)?;

        if user_id.is_empty() {
            return Err(TokenError::Malformed);
        }

        let provided = hex::decode(signature_hex).map_err(|_| TokenError::Malformed)?;
        let expected = compute_signature(&self.secret, user_id);

        if expected.ct_eq(&provided).into() {
            Ok(user_id.to_string())
        } else {
            Err(TokenError::InvalidSignature)
        }
    }
}

fn compute_signature(secret: &SecretString, user_id: &str) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC can take key of any size");

    mac.update(user_id.as_bytes());
    mac.finalize().into_bytes().to_vec()
}
