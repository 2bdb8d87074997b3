//! Session and CSRF Tokens
//!
//! Raw tokens go to the client once; only [`hash_token`] output is stored.
//! Session and CSRF tokens are independent random draws.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use crate::config::SecurityConfig;
use crate::crypto::{self, digest_eq, generate_token, sha256, sha256_hex};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionTokenError {
    #[error("Token lifetime out of range: {0:?}")]
    TtlOutOfRange(Duration),
}

/// Freshly issued token with its absolute expiry
#[derive(Clone, PartialEq, Eq)]
pub struct TimeBoundToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl TimeBoundToken {
    /// Rejection point is inclusive: a token is dead at `expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl std::fmt::Debug for TimeBoundToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeBoundToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Issues random tokens of a configured size
#[derive(Debug, Clone, Copy)]
pub struct TokenIssuer {
    token_bytes: usize,
    code_length: u32,
}

impl Default for TokenIssuer {
    fn default() -> Self {
        Self::from_config(&SecurityConfig::default())
    }
}

impl TokenIssuer {
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self {
            token_bytes: config.token_bytes,
            code_length: config.code_length,
        }
    }

    pub fn generate_session_token(&self) -> String {
        generate_token(self.token_bytes)
    }

    pub fn generate_csrf_token(&self) -> String {
        generate_token(self.token_bytes)
    }

    /// Numeric verification code of the configured length
    pub fn generate_code(&self) -> Result<String, crypto::CryptoError> {
        crypto::generate_code(self.code_length)
    }

    /// New session token valid for `ttl` from now
    pub fn create_time_based_token(
        &self,
        ttl: Duration,
    ) -> Result<TimeBoundToken, SessionTokenError> {
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .ok_or(SessionTokenError::TtlOutOfRange(ttl))?;

        Ok(TimeBoundToken {
            token: self.generate_session_token(),
            expires_at,
        })
    }
}

/// SHA-256 hex of a token, the at-rest form
pub fn hash_token(token: &str) -> String {
    sha256_hex(token.as_bytes())
}

/// Check `token` against a stored [`hash_token`] value in constant time
///
/// Anything other than a 64-character hex digest compares unequal.
pub fn verify_token(token: &str, hash: &str) -> bool {
    let mut expected = [0u8; 32];
    if hex::decode_to_slice(hash, &mut expected).is_err() {
        return false;
    }
    digest_eq(&sha256(token.as_bytes()), &expected)
}
