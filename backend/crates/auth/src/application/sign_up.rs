//! Sign Up Use Case
//!
//! Creates a new account.

use std::sync::Arc;

use platform::password::{ClearTextPassword, PasswordHashing};
use uuid::Uuid;

use crate::domain::entity::account::Account;
use crate::domain::repository::AccountRepository;
use crate::domain::value_object::{display_name::DisplayName, email::Email};
use crate::error::{AuthError, AuthResult};

/// Sign up input
pub struct SignUpInput {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

/// Sign up output
#[derive(Debug)]
pub struct SignUpOutput {
    pub account_id: Uuid,
}

/// Sign up use case
pub struct SignUpUseCase<A>
where
    A: AccountRepository,
{
    account_repo: Arc<A>,
    hasher: Arc<PasswordHashing>,
}

impl<A> SignUpUseCase<A>
where
    A: AccountRepository,
{
    pub fn new(account_repo: Arc<A>, hasher: Arc<PasswordHashing>) -> Self {
        Self {
            account_repo,
            hasher,
        }
    }

    pub async fn execute(&self, input: SignUpInput) -> AuthResult<SignUpOutput> {
        let email = Email::new(&input.email)?;
        let display_name = DisplayName::new(&input.display_name)?;
        let password = ClearTextPassword::new(input.password)?;

        if self.account_repo.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        // Argon2 is CPU-bound; keep it off the async workers
        let hasher = self.hasher.clone();
        let password_hash =
            tokio::task::spawn_blocking(move || hasher.hash_password(password.as_str())).await??;

        let account = Account::new(email, display_name, password_hash);
        self.account_repo.create(&account).await?;

        tracing::info!(
            account_id = %account.account_id,
            email_domain = %account.email.domain(),
            "Account signed up"
        );

        Ok(SignUpOutput {
            account_id: account.account_id,
        })
    }
}
