//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (SHA-256, random tokens, numeric codes)
//! - Password hashing (Argon2id, NIST SP 800-63B policy)
//! - Session/CSRF token issuance and verification
//! - Client identification and rate-limit tracker keys
//! - Throttling middleware and an in-memory counter store
//! - Request body sanitization
//! - Cookie management and security configuration

pub mod client;
pub mod config;
pub mod cookie;
pub mod crypto;
pub mod extract;
pub mod password;
pub mod rate_limit;
pub mod sanitize;
pub mod session;
pub mod throttle;
