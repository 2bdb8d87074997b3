//! Display Name Value Object

use kernel::error::app_error::{AppError, AppResult};
use serde::Serialize;

const DISPLAY_NAME_MAX_CHARS: usize = 64;

/// Name shown on reviews, bookings and chats
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DisplayName(String);

impl DisplayName {
    /// Inner whitespace runs collapse to a single space
    pub fn new(name: impl AsRef<str>) -> AppResult<Self> {
        let name = name.as_ref().split_whitespace().collect::<Vec<_>>().join(" ");

        if name.is_empty() {
            return Err(AppError::bad_request("Display name cannot be empty"));
        }

        if name.chars().count() > DISPLAY_NAME_MAX_CHARS {
            return Err(AppError::bad_request(format!(
                "Display name must be at most {} characters",
                DISPLAY_NAME_MAX_CHARS
            )));
        }

        if name.chars().any(char::is_control) {
            return Err(AppError::bad_request("Display name contains invalid characters"));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
