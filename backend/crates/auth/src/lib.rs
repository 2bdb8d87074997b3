//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits
//! - `application/` - Use cases and configuration
//! - `infra/` - Storage implementations
//! - `presentation/` - HTTP handlers, DTOs, router, middleware
//!
//! ## Features
//! - Account sign-up / sign-in with email + password
//! - Server-side sessions referenced by an HttpOnly cookie
//! - Per-session CSRF tokens checked on state-changing requests
//! - "Remember Me" sessions that slide forward while in use
//!
//! ## Security Model
//! - Passwords hashed with Argon2id, upgraded on sign-in when cost changes
//! - Only SHA-256 digests of session and CSRF tokens are stored
//! - Token checks are constant-time
//! - Sign-in is rate limited per client

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;


// Re-exports for convenience
pub use application::config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use infra::memory::InMemoryAuthRepository;
pub use presentation::{AuthAppState, CurrentSession, auth_router, with_session};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
