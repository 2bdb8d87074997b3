//! HTTP Handlers

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use platform::client::ClientIp;
use platform::cookie::extract_cookie;
use platform::extract::SanitizedJson;
use platform::password::PasswordHashing;
use platform::session::TokenIssuer;

use crate::application::config::AuthConfig;
use crate::application::{
    ClientContext, SignInInput, SignInUseCase, SignOutUseCase, SignUpInput, SignUpUseCase,
};
use crate::domain::repository::{AccountRepository, AuthStore};
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    MeResponse, SessionStatusResponse, SignInRequest, SignInResponse, SignOutQuery,
    SignUpRequest, SignUpResponse,
};
use crate::presentation::middleware::CurrentSession;

/// Shared state for auth handlers
pub struct AuthAppState<R> {
    pub repo: Arc<R>,
    pub config: Arc<AuthConfig>,
    pub hasher: Arc<PasswordHashing>,
    pub issuer: TokenIssuer,
}

impl<R> Clone for AuthAppState<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            config: self.config.clone(),
            hasher: self.hasher.clone(),
            issuer: self.issuer,
        }
    }
}

impl<R> AuthAppState<R>
where
    R: AuthStore,
{
    /// Fails only on unusable Argon2 parameters
    pub fn new(repo: R, config: AuthConfig) -> AuthResult<Self> {
        let hasher = PasswordHashing::new(&config.security.password, config.security.pepper())?;
        let issuer = TokenIssuer::from_config(&config.security);

        Ok(Self {
            repo: Arc::new(repo),
            config: Arc::new(config),
            hasher: Arc::new(hasher),
            issuer,
        })
    }
}

fn append_cookie(
    headers: &mut HeaderMap,
    value: Result<HeaderValue, header::InvalidHeaderValue>,
) -> AuthResult<()> {
    let value = value.map_err(|e| AuthError::Internal(format!("Invalid cookie value: {e}")))?;
    headers.append(header::SET_COOKIE, value);
    Ok(())
}

fn clear_session_cookies(headers: &mut HeaderMap, config: &AuthConfig) -> AuthResult<()> {
    append_cookie(headers, config.session_cookie().delete_cookie_header())?;
    append_cookie(headers, config.csrf_cookie().delete_cookie_header())
}

// ============================================================================
// Sign Up
// ============================================================================

/// POST /api/auth/signup
pub async fn sign_up<R>(
    State(state): State<AuthAppState<R>>,
    SanitizedJson(req): SanitizedJson<SignUpRequest>,
) -> AuthResult<(StatusCode, Json<SignUpResponse>)>
where
    R: AuthStore,
{
    let use_case = SignUpUseCase::new(state.repo.clone(), state.hasher.clone());

    let output = use_case
        .execute(SignUpInput {
            email: req.email,
            display_name: req.display_name,
            password: req.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SignUpResponse {
            account_id: output.account_id,
        }),
    ))
}

// ============================================================================
// Sign In
// ============================================================================

/// POST /api/auth/signin
pub async fn sign_in<R>(
    State(state): State<AuthAppState<R>>,
    ClientIp(ip): ClientIp,
    headers: HeaderMap,
    SanitizedJson(req): SanitizedJson<SignInRequest>,
) -> AuthResult<Response>
where
    R: AuthStore,
{
    let use_case = SignInUseCase::new(
        state.repo.clone(),
        state.repo.clone(),
        state.hasher.clone(),
        state.issuer,
        state.config.clone(),
    );

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let output = use_case
        .execute(
            SignInInput {
                email: req.email,
                password: req.password,
                remember_me: req.remember_me,
            },
            ClientContext { ip, user_agent },
        )
        .await?;

    let max_age = (output.expires_at - Utc::now()).num_seconds().max(0);
    let session_cookie = state.config.session_cookie().with_max_age(max_age);
    let csrf_cookie = state.config.csrf_cookie().with_max_age(max_age);

    let mut response = Json(SignInResponse {
        account_id: output.account_id,
        display_name: output.display_name,
        csrf_token: output.csrf_token.clone(),
        expires_at: output.expires_at,
        remember_me: output.remember_me,
    })
    .into_response();

    let headers = response.headers_mut();
    append_cookie(headers, session_cookie.set_cookie_header(&output.session_token))?;
    append_cookie(headers, csrf_cookie.set_cookie_header(&output.csrf_token))?;
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Ok(response)
}

// ============================================================================
// Sign Out
// ============================================================================

/// POST /api/auth/signout[?all=true]
pub async fn sign_out<R>(
    State(state): State<AuthAppState<R>>,
    Query(query): Query<SignOutQuery>,
    session: Option<CurrentSession>,
    headers: HeaderMap,
) -> AuthResult<Response>
where
    R: AuthStore,
{
    let use_case = SignOutUseCase::new(state.repo.clone());

    match (query.all, session) {
        (true, Some(CurrentSession(session))) => {
            use_case.execute_all(session.account_id).await?;
        }
        _ => {
            if let Some(token) = extract_cookie(&headers, &state.config.session_cookie_name) {
                use_case.execute(&token).await?;
            }
        }
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    clear_session_cookies(response.headers_mut(), &state.config)?;
    Ok(response)
}

// ============================================================================
// Session Status
// ============================================================================

/// GET /api/auth/status
pub async fn session_status(session: Option<CurrentSession>) -> Json<SessionStatusResponse> {
    let response = match session {
        Some(CurrentSession(session)) => SessionStatusResponse {
            authenticated: true,
            account_id: Some(session.account_id),
            expires_at: Some(session.expires_at),
            remember_me: Some(session.remember_me),
        },
        None => SessionStatusResponse {
            authenticated: false,
            account_id: None,
            expires_at: None,
            remember_me: None,
        },
    };

    Json(response)
}

// ============================================================================
// Current Account
// ============================================================================

/// GET /api/auth/me
pub async fn me<R>(
    State(state): State<AuthAppState<R>>,
    CurrentSession(session): CurrentSession,
) -> AuthResult<Json<MeResponse>>
where
    R: AuthStore,
{
    let account = AccountRepository::find_by_id(&*state.repo, session.account_id)
        .await?
        .ok_or(AuthError::SessionInvalid)?;

    Ok(Json(MeResponse {
        account_id: account.account_id,
        email: account.email.to_string(),
        display_name: account.display_name.to_string(),
        created_at: account.created_at,
        last_login_at: account.last_login_at,
    }))
}
