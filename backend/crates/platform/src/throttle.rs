//! Throttling Middleware
//!
//! Counts each request against its [`TrackerKey`] in a [`RateLimitStore`]
//! and rejects with 429 once the configured window is exhausted.
//!
//! ```ignore
//! let limiter = RateLimiter::new("signin", RateLimitConfig::new(5, 60), store);
//! router.route_layer(from_fn_with_state(limiter, throttle::<MemoryRateLimitStore>))
//! ```

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use kernel::error::app_error::AppError;

use crate::rate_limit::{RateLimitConfig, RateLimitStore, TrackerKey, get_tracker};

pub const RATE_LIMIT_MESSAGE: &str = "Too many requests. Please try again later.";

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Error raised when a tracker has used up its window
pub fn on_limit_exceeded(tracker: &TrackerKey, retry_after_secs: u64) -> AppError {
    tracing::warn!(
        tracker = %tracker,
        retry_after_secs,
        "Rate limit exceeded"
    );

    AppError::too_many_requests(RATE_LIMIT_MESSAGE).with_retry_after(retry_after_secs)
}

/// Middleware state: one scope, one threshold, a shared store
pub struct RateLimiter<S> {
    scope: Arc<str>,
    config: RateLimitConfig,
    store: Arc<S>,
}

impl<S> Clone for RateLimiter<S> {
    fn clone(&self) -> Self {
        Self {
            scope: self.scope.clone(),
            config: self.config.clone(),
            store: self.store.clone(),
        }
    }
}

impl<S> RateLimiter<S>
where
    S: RateLimitStore + Send + Sync + 'static,
{
    pub fn new(scope: impl Into<Arc<str>>, config: RateLimitConfig, store: Arc<S>) -> Self {
        Self {
            scope: scope.into(),
            config,
            store,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Store key for a tracker, namespaced so scopes never share counters
    pub fn store_key(&self, tracker: &TrackerKey) -> String {
        format!("{}|{}", self.scope, tracker)
    }
}

/// Rate limiting middleware
///
/// Store failures let the request through.
pub async fn throttle<S>(
    State(limiter): State<RateLimiter<S>>,
    req: Request,
    next: Next,
) -> Response
where
    S: RateLimitStore + Send + Sync + 'static,
{
    let tracker = get_tracker(&req);
    let key = limiter.store_key(&tracker);

    let result = match limiter.store.check_and_increment(&key, &limiter.config).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(
                error = %e,
                scope = %limiter.scope,
                "Rate limit store unavailable, allowing request"
            );
            return next.run(req).await;
        }
    };

    let mut response = if result.allowed {
        next.run(req).await
    } else {
        on_limit_exceeded(&tracker, result.retry_after_secs()).into_response()
    };

    let headers = response.headers_mut();
    headers.insert(LIMIT_HEADER, HeaderValue::from(limiter.config.max_requests));
    headers.insert(REMAINING_HEADER, HeaderValue::from(result.remaining));

    response
}
