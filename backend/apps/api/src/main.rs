//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

mod config;

use std::sync::Arc;
use std::time::Duration;

use auth::domain::repository::SessionRepository;
use auth::{AuthAppState, AuthConfig, InMemoryAuthRepository, auth_router, with_session};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{
    Json, Router, http,
    http::{HeaderName, Method, header},
};
use platform::rate_limit::MemoryRateLimitStore;
use platform::throttle::{RateLimiter, throttle};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,platform=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server_config = ServerConfig::from_env()?;
    let auth_config = AuthConfig::from_env()?;
    if !auth_config.cookie_secure {
        tracing::warn!("COOKIE_SECURE is off; use only for local development");
    }

    tracing::info!(
        password = ?auth_config.security.password,
        token_bytes = auth_config.security.token_bytes,
        peppered = auth_config.security.password_pepper.is_some(),
        "Security configuration loaded"
    );

    let repo = InMemoryAuthRepository::new();
    let rate_limit_store = Arc::new(MemoryRateLimitStore::new());

    // Windows older than the longest configured window are dead
    let max_window = server_config
        .global_rate_limit
        .window
        .max(auth_config.signin_rate_limit.window);
    spawn_purge_task(repo.clone(), rate_limit_store.clone(), max_window);

    let auth_state = AuthAppState::new(repo, auth_config)?;

    // CORS configuration
    let allowed_origins: Vec<http::HeaderValue> = server_config
        .frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-csrf-token"),
        ]))
        .allow_credentials(true);

    let global_limiter = RateLimiter::new(
        "global",
        server_config.global_rate_limit.clone(),
        rate_limit_store.clone(),
    );

    // Build router: sessions load before the global throttle so signed-in
    // callers are tracked as ip:account
    let api = Router::new()
        .route("/api/health", get(health))
        .nest(
            "/api/auth",
            auth_router(auth_state.clone(), rate_limit_store),
        )
        .layer(from_fn_with_state(
            global_limiter,
            throttle::<MemoryRateLimitStore>,
        ));

    let app = with_session(api, auth_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    tracing::info!("Listening on {}", server_config.bind_addr);

    let listener = TcpListener::bind(server_config.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Periodically drop expired sessions and finished rate-limit windows
fn spawn_purge_task(
    repo: InMemoryAuthRepository,
    rate_limit_store: Arc<MemoryRateLimitStore>,
    max_window: Duration,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;

            if let Err(e) = repo.cleanup_expired(chrono::Utc::now()).await {
                tracing::warn!(error = %e, "Session cleanup failed");
            }

            let purged = rate_limit_store.purge_expired(max_window);
            if purged > 0 {
                tracing::debug!(windows_purged = purged, "Purged rate limit windows");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
