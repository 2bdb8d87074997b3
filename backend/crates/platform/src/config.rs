//! Security Configuration
//!
//! Hashing cost and token sizes are deployment settings, read from the
//! environment (or any key/value lookup) instead of being compiled in.

use std::str::FromStr;

use thiserror::Error;

use crate::crypto::{DEFAULT_CODE_LENGTH, DEFAULT_TOKEN_BYTES, MAX_CODE_LENGTH, from_base64};

/// Minimum token size: session and CSRF tokens carry at least 256 bits
pub const MIN_TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    /// OWASP recommended Argon2id parameters: m=19456 (19 MiB), t=2, p=1
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl PasswordConfig {
    /// Cheapest parameters argon2 accepts. Tests only.
    pub fn for_tests() -> Self {
        Self {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        }
    }
}

/// Process-wide security settings
#[derive(Clone)]
pub struct SecurityConfig {
    pub password: PasswordConfig,
    /// Application-wide secret appended to passwords before hashing
    pub password_pepper: Option<Vec<u8>>,
    /// Random bytes per session/CSRF token
    pub token_bytes: usize,
    /// Digits in generated numeric codes
    pub code_length: u32,
}

impl std::fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("password", &self.password)
            .field(
                "password_pepper",
                &self.password_pepper.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_bytes", &self.token_bytes)
            .field("code_length", &self.code_length)
            .finish()
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::with_password(PasswordConfig::default())
    }
}

impl SecurityConfig {
    /// Defaults with the given password cost
    pub fn with_password(password: PasswordConfig) -> Self {
        Self {
            password,
            password_pepper: None,
            token_bytes: DEFAULT_TOKEN_BYTES,
            code_length: DEFAULT_CODE_LENGTH,
        }
    }

    /// Read from the process environment
    ///
    /// | Variable               | Default |
    /// |------------------------|---------|
    /// | `PASSWORD_MEMORY_KIB`  | 19456   |
    /// | `PASSWORD_ITERATIONS`  | 2       |
    /// | `PASSWORD_PARALLELISM` | 1       |
    /// | `PASSWORD_PEPPER`      | unset (base64) |
    /// | `TOKEN_BYTES`          | 32      |
    /// | `CODE_LENGTH`          | 6       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read from an arbitrary key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: parse_or(&lookup, "PASSWORD_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&lookup, "PASSWORD_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&lookup, "PASSWORD_PARALLELISM", defaults.parallelism)?,
        };

        let password_pepper = match lookup("PASSWORD_PEPPER").filter(|v| !v.is_empty()) {
            Some(encoded) => Some(from_base64(encoded.trim()).map_err(|e| {
                ConfigError::InvalidValue {
                    key: "PASSWORD_PEPPER",
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        let token_bytes = parse_or(&lookup, "TOKEN_BYTES", DEFAULT_TOKEN_BYTES)?;
        if token_bytes < MIN_TOKEN_BYTES {
            return Err(ConfigError::InvalidValue {
                key: "TOKEN_BYTES",
                reason: format!("must be at least {MIN_TOKEN_BYTES}"),
            });
        }

        let code_length = parse_or(&lookup, "CODE_LENGTH", DEFAULT_CODE_LENGTH)?;
        if code_length == 0 || code_length > MAX_CODE_LENGTH {
            return Err(ConfigError::InvalidValue {
                key: "CODE_LENGTH",
                reason: format!("must be between 1 and {MAX_CODE_LENGTH}"),
            });
        }

        Ok(Self {
            password,
            password_pepper,
            token_bytes,
            code_length,
        })
    }

    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }
}

/// Parse `key` from `lookup`, falling back to `default` when unset or blank
pub fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    key,
                    reason: e.to_string(),
                })
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SecurityConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.password, PasswordConfig::default());
        assert_eq!(config.token_bytes, 32);
        assert_eq!(config.code_length, 6);
        assert!(config.pepper().is_none());
    }

    #[test]
    fn test_overrides() {
        let config = SecurityConfig::from_lookup(lookup_from(&[
            ("PASSWORD_MEMORY_KIB", "65536"),
            ("PASSWORD_ITERATIONS", "3"),
            ("PASSWORD_PARALLELISM", "4"),
            ("PASSWORD_PEPPER", "cGVwcGVy"),
            ("TOKEN_BYTES", "48"),
            ("CODE_LENGTH", "8"),
        ]))
        .unwrap();

        assert_eq!(config.password.memory_kib, 65_536);
        assert_eq!(config.password.iterations, 3);
        assert_eq!(config.password.parallelism, 4);
        assert_eq!(config.pepper(), Some(&b"pepper"[..]));
        assert_eq!(config.token_bytes, 48);
        assert_eq!(config.code_length, 8);
    }

    #[test]
    fn test_rejects_short_tokens() {
        let err = SecurityConfig::from_lookup(lookup_from(&[("TOKEN_BYTES", "16")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "TOKEN_BYTES",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(
            SecurityConfig::from_lookup(lookup_from(&[("PASSWORD_ITERATIONS", "two")])).is_err()
        );
        assert!(SecurityConfig::from_lookup(lookup_from(&[("CODE_LENGTH", "0")])).is_err());
        assert!(SecurityConfig::from_lookup(lookup_from(&[("PASSWORD_PEPPER", "%%%")])).is_err());
    }

    #[test]
    fn test_debug_redacts_pepper() {
        let config = SecurityConfig {
            password_pepper: Some(b"topsecret".to_vec()),
            ..SecurityConfig::with_password(PasswordConfig::for_tests())
        };
        let debug = format!("{:?}", config);
        assert!(debug.contains("REDACTED"));
        assert!(!debug.contains("topsecret"));
    }
}
