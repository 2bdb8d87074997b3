//! Check Session Use Case
//!
//! Resolves a session token to a live session and checks CSRF tokens
//! against it.

use std::sync::Arc;

use platform::session::{hash_token, verify_token};

use crate::application::config::AuthConfig;
use crate::domain::entity::session::Session;
use crate::domain::repository::SessionRepository;
use crate::error::{AuthError, AuthResult};

/// Check session use case
pub struct CheckSessionUseCase<S>
where
    S: SessionRepository,
{
    session_repo: Arc<S>,
    config: Arc<AuthConfig>,
}

impl<S> CheckSessionUseCase<S>
where
    S: SessionRepository,
{
    pub fn new(session_repo: Arc<S>, config: Arc<AuthConfig>) -> Self {
        Self {
            session_repo,
            config,
        }
    }

    /// Just check if session is valid (returns bool)
    pub async fn is_valid(&self, session_token: &str) -> bool {
        self.get_session(session_token).await.is_ok()
    }

    /// Get session and update last activity
    ///
    /// Expired sessions are deleted on sight.
    pub async fn get_session(&self, session_token: &str) -> AuthResult<Session> {
        let mut session = self
            .session_repo
            .find_by_token_hash(&hash_token(session_token))
            .await?
            .ok_or(AuthError::SessionInvalid)?;

        if !verify_token(session_token, &session.token_hash) {
            return Err(AuthError::SessionInvalid);
        }

        if session.is_expired() {
            self.session_repo.delete(session.session_id).await?;
            tracing::debug!(session_id = %session.session_id, "Removed expired session");
            return Err(AuthError::SessionInvalid);
        }

        session.touch();

        let ttl_long = chrono::Duration::from_std(self.config.session_ttl_long)
            .map_err(|e| AuthError::Internal(format!("Invalid session TTL: {e}")))?;
        if session.extend_if_needed(ttl_long) {
            tracing::debug!(session_id = %session.session_id, "Extended remember-me session");
        }

        self.session_repo.update(&session).await?;
        Ok(session)
    }

    /// CSRF token must be the one issued with this session
    pub fn verify_csrf(&self, session: &Session, csrf_token: Option<&str>) -> AuthResult<()> {
        match csrf_token {
            Some(token) if verify_token(token, &session.csrf_hash) => Ok(()),
            _ => Err(AuthError::CsrfMismatch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::session::NewSession;
    use crate::infra::memory::InMemoryAuthRepository;
    use chrono::{Duration, Utc};
    use platform::session::TokenIssuer;
    use uuid::Uuid;

    struct Issued {
        token: String,
        csrf: String,
    }

    async fn open_session(
        repo: &InMemoryAuthRepository,
        remember_me: bool,
        expires_in: Duration,
    ) -> Issued {
        let issuer = TokenIssuer::default();
        let token = issuer.generate_session_token();
        let csrf = issuer.generate_csrf_token();
        let session = Session::new(NewSession {
            account_id: Uuid::new_v4(),
            token_hash: hash_token(&token),
            csrf_hash: hash_token(&csrf),
            remember_me,
            expires_at: Utc::now() + expires_in,
            client_ip: None,
            user_agent: None,
        });
        SessionRepository::create(repo, &session).await.unwrap();
        Issued { token, csrf }
    }

    fn use_case(repo: &Arc<InMemoryAuthRepository>) -> CheckSessionUseCase<InMemoryAuthRepository> {
        CheckSessionUseCase::new(repo.clone(), Arc::new(AuthConfig::development()))
    }

    #[tokio::test]
    async fn test_valid_session() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let issued = open_session(&repo, false, Duration::hours(1)).await;

        let session = use_case(&repo).get_session(&issued.token).await.unwrap();
        assert!(verify_token(&issued.token, &session.token_hash));
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        open_session(&repo, false, Duration::hours(1)).await;

        let err = use_case(&repo).get_session("not-a-token").await.unwrap_err();
        assert!(matches!(err, AuthError::SessionInvalid));
        assert!(!use_case(&repo).is_valid("").await);
    }

    #[tokio::test]
    async fn test_expired_session_is_removed() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let issued = open_session(&repo, false, Duration::seconds(-1)).await;

        assert!(!use_case(&repo).is_valid(&issued.token).await);
        assert_eq!(repo.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_remember_me_session_slides() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let issued = open_session(&repo, true, Duration::hours(1)).await;

        let session = use_case(&repo).get_session(&issued.token).await.unwrap();
        assert!(session.expires_at > Utc::now() + Duration::days(6));

        let stored = repo
            .find_by_token_hash(&hash_token(&issued.token))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.expires_at, session.expires_at);
    }

    #[tokio::test]
    async fn test_verify_csrf() {
        let repo = Arc::new(InMemoryAuthRepository::new());
        let issued = open_session(&repo, false, Duration::hours(1)).await;
        let other = open_session(&repo, false, Duration::hours(1)).await;

        let use_case = use_case(&repo);
        let session = use_case.get_session(&issued.token).await.unwrap();

        assert!(use_case.verify_csrf(&session, Some(&issued.csrf)).is_ok());
        assert!(matches!(
            use_case.verify_csrf(&session, Some(&other.csrf)),
            Err(AuthError::CsrfMismatch)
        ));
        assert!(matches!(
            use_case.verify_csrf(&session, None),
            Err(AuthError::CsrfMismatch)
        ));
        // The session token is never a valid CSRF token
        assert!(use_case.verify_csrf(&session, Some(&issued.token)).is_err());
    }
}
