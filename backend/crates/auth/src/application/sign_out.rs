//! Sign Out Use Case
//!
//! Invalidates sessions.

use std::sync::Arc;

use platform::session::hash_token;
use uuid::Uuid;

use crate::domain::repository::SessionRepository;
use crate::error::AuthResult;

/// Sign out use case
pub struct SignOutUseCase<S>
where
    S: SessionRepository,
{
    session_repo: Arc<S>,
}

impl<S> SignOutUseCase<S>
where
    S: SessionRepository,
{
    pub fn new(session_repo: Arc<S>) -> Self {
        Self { session_repo }
    }

    /// Sign out from current session
    ///
    /// Unknown tokens are not an error: the client ends up signed out either way.
    pub async fn execute(&self, session_token: &str) -> AuthResult<()> {
        let Some(session) = self
            .session_repo
            .find_by_token_hash(&hash_token(session_token))
            .await?
        else {
            return Ok(());
        };

        self.session_repo.delete(session.session_id).await?;

        tracing::info!(
            session_id = %session.session_id,
            account_id = %session.account_id,
            "Account signed out"
        );
        Ok(())
    }

    /// Sign out from every session of an account
    pub async fn execute_all(&self, account_id: Uuid) -> AuthResult<u64> {
        let deleted = self.session_repo.delete_all_for_account(account_id).await?;

        tracing::info!(
            account_id = %account_id,
            sessions_deleted = deleted,
            "Account signed out everywhere"
        );
        Ok(deleted)
    }
}
