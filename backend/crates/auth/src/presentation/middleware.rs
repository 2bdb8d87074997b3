//! Auth Middleware
//!
//! `load_session` resolves the session cookie once per request and leaves
//! the result in request extensions for handlers, `require_csrf` and the
//! rate-limit tracker.

use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts, Request, State};
use axum::http::Method;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use platform::client::AuthenticatedUser;
use platform::cookie::extract_cookie;

use crate::application::CheckSessionUseCase;
use crate::domain::entity::session::Session;
use crate::domain::repository::AuthStore;
use crate::error::AuthError;
use crate::presentation::handlers::AuthAppState;

/// Live session of the caller
#[derive(Debug, Clone)]
pub struct CurrentSession(pub Session);

/// Rejects with 401 when no valid session was loaded
impl<S> FromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentSession>()
            .cloned()
            .ok_or(AuthError::SessionInvalid)
    }
}

impl<S> OptionalFromRequestParts<S> for CurrentSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentSession>().cloned())
    }
}

/// Attach [`CurrentSession`] and [`AuthenticatedUser`] when the session
/// cookie is valid. Never rejects.
pub async fn load_session<R>(
    State(state): State<AuthAppState<R>>,
    mut req: Request,
    next: Next,
) -> Response
where
    R: AuthStore,
{
    if let Some(token) = extract_cookie(req.headers(), &state.config.session_cookie_name) {
        let use_case = CheckSessionUseCase::new(state.repo.clone(), state.config.clone());

        match use_case.get_session(&token).await {
            Ok(session) => {
                req.extensions_mut()
                    .insert(AuthenticatedUser::new(session.account_id.to_string()));
                req.extensions_mut().insert(CurrentSession(session));
            }
            Err(AuthError::SessionInvalid) => {
                tracing::debug!("Ignoring invalid session cookie");
            }
            Err(e) => {
                tracing::error!(error = %e, "Error checking session");
            }
        }
    }

    next.run(req).await
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// State-changing requests that carry a session must echo its CSRF token
/// in the configured header
pub async fn require_csrf<R>(
    State(state): State<AuthAppState<R>>,
    req: Request,
    next: Next,
) -> Response
where
    R: AuthStore,
{
    if !is_safe_method(req.method()) {
        if let Some(CurrentSession(session)) = req.extensions().get::<CurrentSession>() {
            let token = req
                .headers()
                .get(state.config.csrf_header_name.as_str())
                .and_then(|v| v.to_str().ok());

            let use_case = CheckSessionUseCase::new(state.repo.clone(), state.config.clone());
            if let Err(e) = use_case.verify_csrf(session, token) {
                return e.into_response();
            }
        }
    }

    next.run(req).await
}
