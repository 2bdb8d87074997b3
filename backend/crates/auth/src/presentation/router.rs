//! Auth Router

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::{
    Router,
    routing::{get, post},
};
use platform::rate_limit::RateLimitStore;
use platform::throttle::{RateLimiter, throttle};

use crate::domain::repository::AuthStore;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{load_session, require_csrf};

/// Routes under `/api/auth`
///
/// Sign-in has its own limiter on top of any global one. Expects
/// [`with_session`] to wrap the application so sessions are loaded.
pub fn auth_router<R, L>(state: AuthAppState<R>, rate_limit_store: Arc<L>) -> Router
where
    R: AuthStore,
    L: RateLimitStore + Send + Sync + 'static,
{
    let signin_limiter = RateLimiter::new(
        "auth:signin",
        state.config.signin_rate_limit.clone(),
        rate_limit_store,
    );

    Router::new()
        .route("/signup", post(handlers::sign_up::<R>))
        .route(
            "/signin",
            post(handlers::sign_in::<R>)
                .layer(from_fn_with_state(signin_limiter, throttle::<L>)),
        )
        .route("/signout", post(handlers::sign_out::<R>))
        .route("/status", get(handlers::session_status))
        .route("/me", get(handlers::me::<R>))
        .layer(from_fn_with_state(state.clone(), require_csrf::<R>))
        .with_state(state)
}

/// Load sessions for every route of `router`
///
/// Apply outside any throttle that should see the authenticated user.
pub fn with_session<R>(router: Router, state: AuthAppState<R>) -> Router
where
    R: AuthStore,
{
    router.layer(from_fn_with_state(state, load_session::<R>))
}
