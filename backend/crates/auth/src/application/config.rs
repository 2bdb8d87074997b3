//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::time::Duration;

use platform::config::{ConfigError, SecurityConfig, parse_or};
use platform::cookie::CookieConfig;
use platform::rate_limit::RateLimitConfig;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

/// Upper bound for either session lifetime
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(366 * 24 * 3600);

/// Auth application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session cookie name (HttpOnly)
    pub session_cookie_name: String,
    /// CSRF cookie name (readable by scripts)
    pub csrf_cookie_name: String,
    /// Header the CSRF token must be echoed in
    pub csrf_header_name: String,
    /// Session TTL without "Remember Me" (12 hours)
    pub session_ttl_short: Duration,
    /// Session TTL with "Remember Me" (1 week)
    pub session_ttl_long: Duration,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Threshold for the sign-in route
    pub signin_rate_limit: RateLimitConfig,
    /// Hashing cost and token sizes
    pub security: SecurityConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "session".to_string(),
            csrf_cookie_name: "csrf_token".to_string(),
            csrf_header_name: "x-csrf-token".to_string(),
            session_ttl_short: Duration::from_secs(12 * 3600), // 12 hours
            session_ttl_long: Duration::from_secs(7 * 24 * 3600), // 1 week
            cookie_secure: true,
            cookie_same_site: SameSite::Lax,
            signin_rate_limit: RateLimitConfig::new(5, 60),
            security: SecurityConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Default::default()
        }
    }

    /// Read from the process environment
    ///
    /// `SESSION_TTL_HOURS`, `SESSION_TTL_REMEMBER_DAYS`, `COOKIE_SECURE`,
    /// `COOKIE_SAME_SITE`, `SIGNIN_RATE_LIMIT_MAX_REQUESTS`,
    /// `SIGNIN_RATE_LIMIT_WINDOW_SECS`, plus everything
    /// [`SecurityConfig::from_env`] reads.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let session_ttl_short = ttl_from(&lookup, "SESSION_TTL_HOURS", 12, 3600)?;
        let session_ttl_long = ttl_from(&lookup, "SESSION_TTL_REMEMBER_DAYS", 7, 24 * 3600)?;

        let max_requests: u32 = parse_or(
            &lookup,
            "SIGNIN_RATE_LIMIT_MAX_REQUESTS",
            defaults.signin_rate_limit.max_requests,
        )?;
        let window_secs: u64 = parse_or(&lookup, "SIGNIN_RATE_LIMIT_WINDOW_SECS", 60)?;
        if max_requests == 0 {
            return Err(positive("SIGNIN_RATE_LIMIT_MAX_REQUESTS"));
        }
        if window_secs == 0 {
            return Err(positive("SIGNIN_RATE_LIMIT_WINDOW_SECS"));
        }
        let signin_rate_limit = RateLimitConfig::new(max_requests, window_secs);

        Ok(Self {
            session_ttl_short,
            session_ttl_long,
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", defaults.cookie_secure)?,
            cookie_same_site: parse_or(&lookup, "COOKIE_SAME_SITE", defaults.cookie_same_site)?,
            signin_rate_limit,
            security: SecurityConfig::from_lookup(&lookup)?,
            ..defaults
        })
    }

    /// Lifetime of a new session
    pub fn session_ttl(&self, remember_me: bool) -> Duration {
        if remember_me {
            self.session_ttl_long
        } else {
            self.session_ttl_short
        }
    }

    pub fn session_cookie(&self) -> CookieConfig {
        CookieConfig::session(self.session_cookie_name.clone())
            .with_secure(self.cookie_secure)
            .with_same_site(self.cookie_same_site)
    }

    pub fn csrf_cookie(&self) -> CookieConfig {
        CookieConfig::csrf(self.csrf_cookie_name.clone())
            .with_secure(self.cookie_secure)
            .with_same_site(self.cookie_same_site)
    }
}

fn positive(key: &'static str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        reason: "must be greater than 0".to_string(),
    }
}

/// Read a lifetime given in `unit_secs` units, bounded by [`MAX_SESSION_TTL`]
fn ttl_from<F>(
    lookup: &F,
    key: &'static str,
    default: u64,
    unit_secs: u64,
) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let units: u64 = parse_or(lookup, key, default)?;
    if units == 0 {
        return Err(positive(key));
    }

    units
        .checked_mul(unit_secs)
        .map(Duration::from_secs)
        .filter(|ttl| *ttl <= MAX_SESSION_TTL)
        .ok_or_else(|| ConfigError::InvalidValue {
            key,
            reason: format!("must be at most {} days", MAX_SESSION_TTL.as_secs() / 86_400),
        })
}
