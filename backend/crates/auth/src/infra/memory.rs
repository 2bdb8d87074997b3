//! In-Memory Repository Implementation
//!
//! Process-local store for accounts and sessions. Clones share state.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entity::{account::Account, session::Session};
use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    /// email -> account_id
    emails: HashMap<String, Uuid>,
    sessions: HashMap<Uuid, Session>,
    /// token_hash -> session_id
    tokens: HashMap<String, Uuid>,
}

/// In-memory auth repository
#[derive(Debug, Clone, Default)]
pub struct InMemoryAuthRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryAuthRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_count(&self) -> usize {
        self.tables.read().await.sessions.len()
    }
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for InMemoryAuthRepository {
    async fn create(&self, account: &Account) -> AuthResult<()> {
        let mut tables = self.tables.write().await;

        if tables.emails.contains_key(account.email.as_str()) {
            return Err(AuthError::EmailTaken);
        }

        tables
            .emails
            .insert(account.email.as_str().to_owned(), account.account_id);
        tables.accounts.insert(account.account_id, account.clone());
        Ok(())
    }

    async fn find_by_id(&self, account_id: Uuid) -> AuthResult<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(&account_id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .emails
            .get(email.as_str())
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn update(&self, account: &Account) -> AuthResult<()> {
        let mut guard = self.tables.write().await;
        let tables = &mut *guard;

        let Some(existing) = tables.accounts.get(&account.account_id) else {
            return Err(AuthError::Internal(format!(
                "Account {} not found for update",
                account.account_id
            )));
        };

        if existing.email != account.email {
            if tables.emails.contains_key(account.email.as_str()) {
                return Err(AuthError::EmailTaken);
            }
            let old_email = existing.email.as_str().to_owned();
            tables.emails.remove(&old_email);
            tables
                .emails
                .insert(account.email.as_str().to_owned(), account.account_id);
        }

        tables.accounts.insert(account.account_id, account.clone());
        Ok(())
    }
}

// ============================================================================
// Session Repository Implementation
// ============================================================================

impl SessionRepository for InMemoryAuthRepository {
    async fn create(&self, session: &Session) -> AuthResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .tokens
            .insert(session.token_hash.clone(), session.session_id);
        tables.sessions.insert(session.session_id, session.clone());
        Ok(())
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> AuthResult<Option<Session>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tokens
            .get(token_hash)
            .and_then(|id| tables.sessions.get(id))
            .cloned())
    }

    async fn update(&self, session: &Session) -> AuthResult<()> {
        let mut tables = self.tables.write().await;

        // A session deleted concurrently (sign-out) stays deleted
        if let Some(existing) = tables.sessions.get_mut(&session.session_id) {
            existing.last_activity_at = session.last_activity_at;
            existing.expires_at = session.expires_at;
        }
        Ok(())
    }

    async fn delete(&self, session_id: Uuid) -> AuthResult<()> {
        let mut tables = self.tables.write().await;
        if let Some(session) = tables.sessions.remove(&session_id) {
            tables.tokens.remove(&session.token_hash);
        }
        Ok(())
    }

    async fn delete_all_for_account(&self, account_id: Uuid) -> AuthResult<u64> {
        let mut tables = self.tables.write().await;
        let Tables {
            sessions, tokens, ..
        } = &mut *tables;

        let before = sessions.len();
        sessions.retain(|_, s| s.account_id != account_id);
        tokens.retain(|_, id| sessions.contains_key(id));

        Ok((before - sessions.len()) as u64)
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let mut tables = self.tables.write().await;
        let Tables {
            sessions, tokens, ..
        } = &mut *tables;

        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        tokens.retain(|_, id| sessions.contains_key(id));

        let deleted = (before - sessions.len()) as u64;
        if deleted > 0 {
            tracing::info!(sessions_deleted = deleted, "Cleaned up expired sessions");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::session::NewSession;
    use crate::domain::value_object::display_name::DisplayName;
    use chrono::Duration;
    use platform::config::PasswordConfig;
    use platform::password::PasswordHashing;

    fn account(email: &str) -> Account {
        let hasher = PasswordHashing::new(&PasswordConfig::for_tests(), None).unwrap();
        Account::new(
            Email::new(email).unwrap(),
            DisplayName::new("Test").unwrap(),
            hasher.hash_password("correct horse battery").unwrap(),
        )
    }

    fn session(account_id: Uuid, token_hash: &str, expires_in: Duration) -> Session {
        Session::new(NewSession {
            account_id,
            token_hash: token_hash.to_owned(),
            csrf_hash: "c".repeat(64),
            remember_me: false,
            expires_at: Utc::now() + expires_in,
            client_ip: None,
            user_agent: None,
        })
    }

    #[tokio::test]
    async fn test_account_email_is_unique() {
        let repo = InMemoryAuthRepository::new();
        let first = account("owner@example.com");
        AccountRepository::create(&repo, &first).await.unwrap();

        let dup = account("owner@example.com");
        let err = AccountRepository::create(&repo, &dup).await.unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));

        let found = repo
            .find_by_email(&Email::new("OWNER@example.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.account_id, first.account_id);
    }

    #[tokio::test]
    async fn test_session_lookup_and_delete() {
        let repo = InMemoryAuthRepository::new();
        let s = session(Uuid::new_v4(), "hash-a", Duration::hours(1));
        SessionRepository::create(&repo, &s).await.unwrap();

        let found = repo.find_by_token_hash("hash-a").await.unwrap();
        assert_eq!(found.map(|f| f.session_id), Some(s.session_id));
        assert!(repo.find_by_token_hash("hash-b").await.unwrap().is_none());

        SessionRepository::delete(&repo, s.session_id).await.unwrap();
        assert!(repo.find_by_token_hash("hash-a").await.unwrap().is_none());
        assert_eq!(repo.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_delete_all_for_account() {
        let repo = InMemoryAuthRepository::new();
        let owner = Uuid::new_v4();
        for hash in ["a", "b"] {
            SessionRepository::create(&repo, &session(owner, hash, Duration::hours(1)))
                .await
                .unwrap();
        }
        SessionRepository::create(&repo, &session(Uuid::new_v4(), "c", Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(repo.delete_all_for_account(owner).await.unwrap(), 2);
        assert_eq!(repo.session_count().await, 1);
        assert!(repo.find_by_token_hash("a").await.unwrap().is_none());
        assert!(repo.find_by_token_hash("c").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let repo = InMemoryAuthRepository::new();
        let id = Uuid::new_v4();
        SessionRepository::create(&repo, &session(id, "live", Duration::hours(1)))
            .await
            .unwrap();
        SessionRepository::create(&repo, &session(id, "dead", Duration::seconds(-1)))
            .await
            .unwrap();

        assert_eq!(repo.cleanup_expired(Utc::now()).await.unwrap(), 1);
        assert!(repo.find_by_token_hash("live").await.unwrap().is_some());
        assert!(repo.find_by_token_hash("dead").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_does_not_resurrect_deleted_session() {
        let repo = InMemoryAuthRepository::new();
        let mut s = session(Uuid::new_v4(), "gone", Duration::hours(1));
        SessionRepository::create(&repo, &s).await.unwrap();
        SessionRepository::delete(&repo, s.session_id).await.unwrap();

        s.touch();
        SessionRepository::update(&repo, &s).await.unwrap();
        assert_eq!(repo.session_count().await, 0);
    }
}
