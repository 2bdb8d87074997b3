//! API DTOs (Data Transfer Objects)
//!
//! Request types carrying passwords have no `Debug`, and their password
//! field skips body sanitization.

use chrono::{DateTime, Utc};
use platform::extract::VerbatimFields;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Sign Up
// ============================================================================

/// Sign up request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub display_name: String,
    pub password: String,
}

impl VerbatimFields for SignUpRequest {
    const VERBATIM_FIELDS: &'static [&'static str] = &["password"];
}

/// Sign up response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub account_id: Uuid,
}

// ============================================================================
// Sign In
// ============================================================================

/// Sign in request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

impl VerbatimFields for SignInRequest {
    const VERBATIM_FIELDS: &'static [&'static str] = &["password"];
}

/// Sign in response
///
/// The session token travels only in its HttpOnly cookie.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    pub account_id: Uuid,
    pub display_name: String,
    /// Echo in the CSRF header on state-changing requests
    pub csrf_token: String,
    pub expires_at: DateTime<Utc>,
    pub remember_me: bool,
}

// ============================================================================
// Sign Out
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SignOutQuery {
    /// End every session of the account, not just this one
    #[serde(default)]
    pub all: bool,
}

// ============================================================================
// Session Status
// ============================================================================

/// Session status response
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    pub authenticated: bool,
    pub account_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub remember_me: Option<bool>,
}

// ============================================================================
// Current Account
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub account_id: Uuid,
    pub email: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}
