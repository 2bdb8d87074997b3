//! Server configuration

use std::net::SocketAddr;

use platform::config::{ConfigError, parse_or};
use platform::rate_limit::RateLimitConfig;

const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:40922,http://127.0.0.1:40922";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// CORS origins allowed to send credentials
    pub frontend_origins: Vec<String>,
    /// Applied to every route, per tracker
    pub global_rate_limit: RateLimitConfig,
}

impl ServerConfig {
    /// `BIND_ADDR`, `FRONTEND_ORIGINS` (comma separated),
    /// `RATE_LIMIT_MAX_REQUESTS`, `RATE_LIMIT_WINDOW_SECS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = parse_or(
            &lookup,
            "BIND_ADDR",
            SocketAddr::from(([0, 0, 0, 0], 31113)),
        )?;

        let frontend_origins = lookup("FRONTEND_ORIGINS")
            .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect();

        let max_requests: u32 = parse_or(&lookup, "RATE_LIMIT_MAX_REQUESTS", 100)?;
        let window_secs: u64 = parse_or(&lookup, "RATE_LIMIT_WINDOW_SECS", 60)?;
        if max_requests == 0 || window_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RATE_LIMIT_MAX_REQUESTS",
                reason: "limit and window must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            bind_addr,
            frontend_origins,
            global_rate_limit: RateLimitConfig::new(max_requests, window_secs),
        })
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
        let config = ServerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:31113");
        assert_eq!(config.frontend_origins.len(), 2);
        assert_eq!(config.global_rate_limit.max_requests, 100);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("FRONTEND_ORIGINS", "https://tarsit.example, ,https://admin.tarsit.example"),
            ("RATE_LIMIT_MAX_REQUESTS", "20"),
            ("RATE_LIMIT_WINDOW_SECS", "10"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(
            config.frontend_origins,
            vec!["https://tarsit.example", "https://admin.tarsit.example"]
        );
        assert_eq!(config.global_rate_limit.max_requests, 20);
        assert_eq!(config.global_rate_limit.window.as_secs(), 10);
    }

    #[test]
    fn test_invalid() {
        assert!(ServerConfig::from_lookup(lookup_from(&[("BIND_ADDR", "nowhere")])).is_err());
        assert!(
            ServerConfig::from_lookup(lookup_from(&[("RATE_LIMIT_MAX_REQUESTS", "0")])).is_err()
        );
    }
}
