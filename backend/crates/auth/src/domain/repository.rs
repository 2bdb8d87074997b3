//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entity::{account::Account, session::Session};
use crate::domain::value_object::email::Email;
use crate::error::AuthResult;

/// Account repository trait
#[trait_variant::make(AccountRepository: Send)]
pub trait LocalAccountRepository {
    /// Create a new account; `EmailTaken` if the email is registered
    async fn create(&self, account: &Account) -> AuthResult<()>;

    /// Find account by ID
    async fn find_by_id(&self, account_id: Uuid) -> AuthResult<Option<Account>>;

    /// Find account by email
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<Account>>;

    /// Update account
    async fn update(&self, account: &Account) -> AuthResult<()>;
}

/// Session repository trait
#[trait_variant::make(SessionRepository: Send)]
pub trait LocalSessionRepository {
    /// Create a new session
    async fn create(&self, session: &Session) -> AuthResult<()>;

    /// Find session by the digest of its token
    async fn find_by_token_hash(&self, token_hash: &str) -> AuthResult<Option<Session>>;

    /// Update session (e.g., last activity)
    async fn update(&self, session: &Session) -> AuthResult<()>;

    /// Delete a session
    async fn delete(&self, session_id: Uuid) -> AuthResult<()>;

    /// Delete all sessions for an account
    async fn delete_all_for_account(&self, account_id: Uuid) -> AuthResult<u64>;

    /// Remove sessions expired at `now`
    async fn cleanup_expired(&self, now: DateTime<Utc>) -> AuthResult<u64>;
}

/// Everything the HTTP layer needs from storage
pub trait AuthStore: AccountRepository + SessionRepository + Clone + Send + Sync + 'static {}

impl<T> AuthStore for T where
    T: AccountRepository + SessionRepository + Clone + Send + Sync + 'static
{
}
