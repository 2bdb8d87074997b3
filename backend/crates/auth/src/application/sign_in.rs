//! Sign In Use Case
//!
//! Authenticates an account and opens a session.

use std::net::IpAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use platform::password::{MAX_PASSWORD_LENGTH, PasswordHashing, normalize_password};
use platform::session::{TokenIssuer, hash_token};
use uuid::Uuid;

use crate::application::config::AuthConfig;
use crate::domain::entity::session::{NewSession, Session};
use crate::domain::repository::{AccountRepository, SessionRepository};
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

/// Sign in input
pub struct SignInInput {
    pub email: String,
    pub password: String,
    /// Remember me flag
    pub remember_me: bool,
}

/// Connection details recorded on the session
#[derive(Debug, Clone, Default)]
pub struct ClientContext {
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
}

/// Sign in output
///
/// The raw tokens exist only here; the session record holds their digests.
pub struct SignInOutput {
    pub account_id: Uuid,
    pub display_name: String,
    pub session_token: String,
    pub csrf_token: String,
    pub expires_at: DateTime<Utc>,
    pub remember_me: bool,
}

impl std::fmt::Debug for SignInOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInOutput")
            .field("account_id", &self.account_id)
            .field("display_name", &self.display_name)
            .field("session_token", &"[REDACTED]")
            .field("csrf_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("remember_me", &self.remember_me)
            .finish()
    }
}

/// Sign in use case
pub struct SignInUseCase<A, S>
where
    A: AccountRepository,
    S: SessionRepository,
{
    account_repo: Arc<A>,
    session_repo: Arc<S>,
    hasher: Arc<PasswordHashing>,
    issuer: TokenIssuer,
    config: Arc<AuthConfig>,
}

impl<A, S> SignInUseCase<A, S>
where
    A: AccountRepository,
    S: SessionRepository,
{
    pub fn new(
        account_repo: Arc<A>,
        session_repo: Arc<S>,
        hasher: Arc<PasswordHashing>,
        issuer: TokenIssuer,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            account_repo,
            session_repo,
            hasher,
            issuer,
            config,
        }
    }

    pub async fn execute(
        &self,
        input: SignInInput,
        client: ClientContext,
    ) -> AuthResult<SignInOutput> {
        // Measured after normalization, as at sign-up. Oversized input never
        // reaches Argon2.
        let password = normalize_password(&input.password);
        if password.chars().count() > MAX_PASSWORD_LENGTH {
            return Err(AuthError::InvalidCredentials);
        }

        let email = Email::new(&input.email).map_err(|_| AuthError::InvalidCredentials)?;
        let Some(mut account) = self.account_repo.find_by_email(&email).await? else {
            // Same cost as a real verification so response time does not
            // reveal whether the email is registered
            let hasher = self.hasher.clone();
            tokio::task::spawn_blocking(move || hasher.hash_password(&password)).await??;
            return Err(AuthError::InvalidCredentials);
        };

        let hasher = self.hasher.clone();
        let stored = account.password_hash.clone();
        let (valid, rehashed) = tokio::task::spawn_blocking(move || {
            if !hasher.compare_password(&password, stored.as_phc_string()) {
                return (false, None);
            }
            // Upgrade hashes made with older cost settings
            let rehashed = hasher
                .needs_rehash(&stored)
                .then(|| hasher.hash_password(&password).ok())
                .flatten();
            (true, rehashed)
        })
        .await?;

        if !valid {
            return Err(AuthError::InvalidCredentials);
        }

        if let Some(hash) = rehashed {
            account.replace_password_hash(hash);
            tracing::info!(account_id = %account.account_id, "Password hash upgraded");
        }
        account.record_login();
        self.account_repo.update(&account).await?;

        let issued = self
            .issuer
            .create_time_based_token(self.config.session_ttl(input.remember_me))
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let csrf_token = self.issuer.generate_csrf_token();

        let session = Session::new(NewSession {
            account_id: account.account_id,
            token_hash: hash_token(&issued.token),
            csrf_hash: hash_token(&csrf_token),
            remember_me: input.remember_me,
            expires_at: issued.expires_at,
            client_ip: client.ip.map(|ip| ip.to_string()),
            user_agent: client.user_agent,
        });
        self.session_repo.create(&session).await?;

        tracing::info!(
            account_id = %account.account_id,
            session_id = %session.session_id,
            remember_me = input.remember_me,
            "Account signed in"
        );

        Ok(SignInOutput {
            account_id: account.account_id,
            display_name: account.display_name.to_string(),
            session_token: issued.token,
            csrf_token,
            expires_at: session.expires_at,
            remember_me: input.remember_me,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::sign_up::{SignUpInput, SignUpUseCase};
    use crate::infra::memory::InMemoryAuthRepository;
    use platform::config::{PasswordConfig, SecurityConfig};
    use platform::session::verify_token;

    struct Fixture {
        repo: Arc<InMemoryAuthRepository>,
        hasher: Arc<PasswordHashing>,
        config: Arc<AuthConfig>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_password_config(PasswordConfig::for_tests())
        }

        fn with_password_config(password: PasswordConfig) -> Self {
            let config = AuthConfig {
                security: SecurityConfig::with_password(password),
                ..AuthConfig::development()
            };
            Self {
                repo: Arc::new(InMemoryAuthRepository::new()),
                hasher: Arc::new(PasswordHashing::new(&password, None).unwrap()),
                config: Arc::new(config),
            }
        }

        async fn sign_up(&self, email: &str, password: &str) -> Uuid {
            SignUpUseCase::new(self.repo.clone(), self.hasher.clone())
                .execute(SignUpInput {
                    email: email.to_string(),
                    display_name: "Corner Bakery".to_string(),
                    password: password.to_string(),
                })
                .await
                .unwrap()
                .account_id
        }

        fn sign_in(&self) -> SignInUseCase<InMemoryAuthRepository, InMemoryAuthRepository> {
            SignInUseCase::new(
                self.repo.clone(),
                self.repo.clone(),
                self.hasher.clone(),
                TokenIssuer::from_config(&self.config.security),
                self.config.clone(),
            )
        }
    }

    fn input(email: &str, password: &str, remember_me: bool) -> SignInInput {
        SignInInput {
            email: email.to_string(),
            password: password.to_string(),
            remember_me,
        }
    }

    #[tokio::test]
    async fn test_sign_in_issues_independent_tokens() {
        let fx = Fixture::new();
        let account_id = fx.sign_up("owner@example.com", "correct horse battery").await;

        let out = fx
            .sign_in()
            .execute(
                input("OWNER@example.com", "correct horse battery", false),
                ClientContext {
                    ip: Some("1.2.3.4".parse().unwrap()),
                    user_agent: Some("test-agent".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(out.account_id, account_id);
        assert_eq!(out.session_token.len(), 64);
        assert_eq!(out.csrf_token.len(), 64);
        assert_ne!(out.session_token, out.csrf_token);

        let session = fx
            .repo
            .find_by_token_hash(&hash_token(&out.session_token))
            .await
            .unwrap()
            .unwrap();
        assert!(verify_token(&out.session_token, &session.token_hash));
        assert!(verify_token(&out.csrf_token, &session.csrf_hash));
        assert_ne!(session.token_hash, out.session_token);
        assert_eq!(session.client_ip.as_deref(), Some("1.2.3.4"));

        let ttl = (session.expires_at - Utc::now()).num_hours();
        assert!((11..=12).contains(&ttl));

        let account = fx.repo.find_by_id(account_id).await.unwrap().unwrap();
        assert!(account.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_remember_me_uses_long_ttl() {
        let fx = Fixture::new();
        fx.sign_up("owner@example.com", "correct horse battery").await;

        let out = fx
            .sign_in()
            .execute(
                input("owner@example.com", "correct horse battery", true),
                ClientContext::default(),
            )
            .await
            .unwrap();

        let days = (out.expires_at - Utc::now()).num_days();
        assert!((6..=7).contains(&days));
        assert!(out.remember_me);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_look_the_same() {
        let fx = Fixture::new();
        fx.sign_up("owner@example.com", "correct horse battery").await;

        let wrong = fx
            .sign_in()
            .execute(
                input("owner@example.com", "incorrect horse", false),
                ClientContext::default(),
            )
            .await
            .unwrap_err();
        let unknown = fx
            .sign_in()
            .execute(
                input("nobody@example.com", "correct horse battery", false),
                ClientContext::default(),
            )
            .await
            .unwrap_err();
        let malformed = fx
            .sign_in()
            .execute(input("nobody", "x", false), ClientContext::default())
            .await
            .unwrap_err();

        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(malformed, AuthError::InvalidCredentials));
        assert_eq!(fx.repo.session_count().await, 0);
    }

    #[tokio::test]
    async fn test_length_limit_applies_after_normalization() {
        let fx = Fixture::new();
        // 130 code points as typed, 67 once the accents compose
        let password = format!("Zq9!{}", "e\u{0301}".repeat(63));
        assert!(password.chars().count() > MAX_PASSWORD_LENGTH);
        let account_id = fx.sign_up("owner@example.com", &password).await;

        let out = fx
            .sign_in()
            .execute(
                input("owner@example.com", &password, false),
                ClientContext::default(),
            )
            .await
            .unwrap();
        assert_eq!(out.account_id, account_id);

        let too_long = "a".repeat(MAX_PASSWORD_LENGTH + 1);
        let err = fx
            .sign_in()
            .execute(
                input("owner@example.com", &too_long, false),
                ClientContext::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_output_debug_hides_tokens() {
        let out = SignInOutput {
            account_id: Uuid::nil(),
            display_name: "Corner Bakery".to_string(),
            session_token: "s".repeat(64),
            csrf_token: "c".repeat(64),
            expires_at: Utc::now(),
            remember_me: false,
        };
        let debug = format!("{out:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains(&"s".repeat(64)));
        assert!(!debug.contains(&"c".repeat(64)));
    }

    #[tokio::test]
    async fn test_sign_in_upgrades_outdated_hash() {
        let old = Fixture::new();
        let account_id = old.sign_up("owner@example.com", "correct horse battery").await;

        let stronger = PasswordConfig {
            memory_kib: 16,
            iterations: 2,
            parallelism: 1,
        };
        let fx = Fixture {
            repo: old.repo.clone(),
            ..Fixture::with_password_config(stronger)
        };

        fx.sign_in()
            .execute(
                input("owner@example.com", "correct horse battery", false),
                ClientContext::default(),
            )
            .await
            .unwrap();

        let account = fx.repo.find_by_id(account_id).await.unwrap().unwrap();
        assert!(!fx.hasher.needs_rehash(&account.password_hash));
        assert!(account.password_hash.as_phc_string().contains("m=16,t=2,p=1"));
    }
}
