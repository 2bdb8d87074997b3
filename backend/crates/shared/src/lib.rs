//! Shared Kernel - Domain-crossing minimal core
//!
//! Holds the error vocabulary every tarsit crate agrees on:
//! - [`error::kind::ErrorKind`] classifying failures by HTTP status
//! - [`error::app_error::AppError`] / [`error::app_error::AppResult`]
//! - `From` conversions and the axum response rendering (feature `axum`)

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
