//! Session Entity
//!
//! Server-side record of a signed-in client. The raw session and CSRF tokens
//! live only in the client's cookies; this record keeps their digests.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: Uuid,
    pub account_id: Uuid,
    /// `hash_token` of the session token, the lookup key
    pub token_hash: String,
    /// `hash_token` of the CSRF token issued with this session
    pub csrf_hash: String,
    /// Whether "Remember Me" was checked
    pub remember_me: bool,
    pub expires_at: DateTime<Utc>,
    /// Client IP (for session management display)
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

/// Everything needed to open a session
#[derive(Debug, Clone)]
pub struct NewSession {
    pub account_id: Uuid,
    pub token_hash: String,
    pub csrf_hash: String,
    pub remember_me: bool,
    pub expires_at: DateTime<Utc>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl Session {
    pub fn new(new: NewSession) -> Self {
        let now = Utc::now();

        Self {
            session_id: Uuid::new_v4(),
            account_id: new.account_id,
            token_hash: new.token_hash,
            csrf_hash: new.csrf_hash,
            remember_me: new.remember_me,
            expires_at: new.expires_at,
            client_ip: new.client_ip,
            user_agent: new.user_agent,
            created_at: now,
            last_activity_at: now,
        }
    }

    /// Dead from `expires_at` onwards
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Update last activity timestamp
    pub fn touch(&mut self) {
        self.last_activity_at = Utc::now();
    }

    /// Slide a remember-me session forward once less than half of
    /// `ttl_long` remains. Returns whether the expiry moved.
    pub fn extend_if_needed(&mut self, ttl_long: Duration) -> bool {
        if !self.remember_me {
            return false;
        }

        let now = Utc::now();
        if self.expires_at < now + ttl_long / 2 {
            self.expires_at = now + ttl_long;
            return true;
        }
        false
    }
}
