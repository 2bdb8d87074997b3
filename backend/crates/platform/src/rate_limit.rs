//! Rate Limiting Infrastructure
//!
//! - [`TrackerKey`] / [`get_tracker`]: who a request is counted against
//! - [`RateLimitStore`]: counting backend, [`MemoryRateLimitStore`] in-process
//!
//! Thresholds and windows are supplied per route through [`RateLimitConfig`].

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::Request;
use chrono::Utc;

use crate::client::{AuthenticatedUser, extract_client_ip, peer_ip};

/// Tracker text used when no address can be resolved
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Rate limit configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u32,
    /// Time window duration
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    pub fn window_ms(&self) -> i64 {
        self.window.as_millis() as i64
    }
}

/// Rate limit check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    /// Unix timestamp (ms) at which the current window closes
    pub reset_at_ms: i64,
}

impl RateLimitResult {
    /// Whole seconds until the window closes, at least 1
    pub fn retry_after_secs(&self) -> u64 {
        let remaining_ms = (self.reset_at_ms - Utc::now().timestamp_millis()).max(0) as u64;
        remaining_ms.div_ceil(1000).max(1)
    }
}

pub type RateLimitStoreError = Box<dyn std::error::Error + Send + Sync>;

/// Trait for rate limit storage backends
#[trait_variant::make(RateLimitStore: Send)]
pub trait LocalRateLimitStore {
    /// Count one request against `key` and report whether it is allowed
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, RateLimitStoreError>;
}

// ============================================================================
// Tracker key
// ============================================================================

/// Identity a request is counted against
///
/// Anonymous traffic is bucketed by address; once a user is known the key
/// becomes address plus user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TrackerKey {
    ip: Option<IpAddr>,
    user_id: Option<String>,
}

impl TrackerKey {
    /// Empty user ids count as anonymous
    pub fn new(ip: Option<IpAddr>, user_id: Option<&str>) -> Self {
        Self {
            ip,
            user_id: user_id.filter(|id| !id.is_empty()).map(str::to_owned),
        }
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

impl fmt::Display for TrackerKey {
    /// `ip`, `ip:userId`, or `[ipv6]:userId`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.ip, &self.user_id) {
            (None, None) => f.write_str(UNKNOWN_CLIENT),
            (None, Some(user)) => write!(f, "{UNKNOWN_CLIENT}:{user}"),
            (Some(ip), None) => write!(f, "{ip}"),
            (Some(IpAddr::V4(ip)), Some(user)) => write!(f, "{ip}:{user}"),
            (Some(IpAddr::V6(ip)), Some(user)) => write!(f, "[{ip}]:{user}"),
        }
    }
}

/// Tracker for a request
///
/// Address: first `X-Forwarded-For` entry, else the socket peer, else
/// unknown. User: the [`AuthenticatedUser`] extension when present.
pub fn get_tracker<B>(req: &Request<B>) -> TrackerKey {
    let ip = extract_client_ip(req.headers(), peer_ip(req.extensions()));
    let user = req.extensions().get::<AuthenticatedUser>();

    TrackerKey::new(ip, user.map(|u| u.user_id.as_str()))
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    started_at_ms: i64,
    count: u32,
}

/// Fixed-window counters held in process memory
///
/// Cloning shares the same counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryRateLimitStore {
    windows: Arc<Mutex<HashMap<String, Window>>>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop windows older than `max_window`; returns how many were removed
    pub fn purge_expired(&self, max_window: Duration) -> usize {
        let Ok(mut windows) = self.windows.lock() else {
            return 0;
        };
        let before = windows.len();
        windows.retain(|_, w| w.started.elapsed() < max_window);
        before - windows.len()
    }

    pub fn len(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, RateLimitStoreError> {
        let mut windows = self
            .windows
            .lock()
            .map_err(|_| "rate limit store lock poisoned")?;

        let now = Instant::now();
        let now_ms = Utc::now().timestamp_millis();

        let window = windows.entry(key.to_owned()).or_insert(Window {
            started: now,
            started_at_ms: now_ms,
            count: 0,
        });

        if now.duration_since(window.started) >= config.window {
            *window = Window {
                started: now,
                started_at_ms: now_ms,
                count: 0,
            };
        }

        window.count = window.count.saturating_add(1);

        Ok(RateLimitResult {
            allowed: window.count <= config.max_requests,
            remaining: config.max_requests.saturating_sub(window.count),
            reset_at_ms: window.started_at_ms + config.window_ms(),
        })
    }
}
