//! Account Entity
//!
//! A registered customer or business owner. Only the password hash is kept.

use chrono::{DateTime, Utc};
use platform::password::HashedPassword;
use uuid::Uuid;

use crate::domain::value_object::{display_name::DisplayName, email::Email};

#[derive(Debug, Clone)]
pub struct Account {
    pub account_id: Uuid,
    /// Login identifier, unique
    pub email: Email,
    pub display_name: DisplayName,
    pub password_hash: HashedPassword,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn new(email: Email, display_name: DisplayName, password_hash: HashedPassword) -> Self {
        let now = Utc::now();

        Self {
            account_id: Uuid::new_v4(),
            email,
            display_name,
            password_hash,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record successful login
    pub fn record_login(&mut self) {
        let now = Utc::now();
        self.last_login_at = Some(now);
        self.updated_at = now;
    }

    /// Swap in a hash produced with current cost parameters
    pub fn replace_password_hash(&mut self, password_hash: HashedPassword) {
        self.password_hash = password_hash;
        self.updated_at = Utc::now();
    }
}
