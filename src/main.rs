//! MarkChain Backend Server
//!
//! Serves wallet-based authentication and identity profile APIs for the
//! MarkChain credential platform.

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

use markchain_server::auth::{AuthService, SessionIssuer};
use markchain_server::config::{Config, StoreBackend};
use markchain_server::db;
use markchain_server::middleware::RateLimiter;
use markchain_server::routes::{build_router, cors_layer};
use markchain_server::services::UserService;
use markchain_server::state::AppState;
use markchain_server::store::{IdentityStore, MemoryStore, NonceStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_target(true)
        .init();

    tracing::info!(
        environment = config.environment.as_str(),
        store = ?config.store_backend,
        "Starting MarkChain server"
    );

    let (identities, nonces, db_pool) = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = db::create_pool(&config).await?;
            db::run_migrations(&pool).await?;
            let store = PgStore::new(pool.clone());
            let identities: Arc<dyn IdentityStore> = Arc::new(store.clone());
            let nonces: Arc<dyn NonceStore> = Arc::new(store);
            (identities, nonces, Some(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; identities are lost on restart");
            let store = MemoryStore::new();
            let identities: Arc<dyn IdentityStore> = Arc::new(store.clone());
            let nonces: Arc<dyn NonceStore> = Arc::new(store);
            (identities, nonces, None)
        }
    };

    let sessions = SessionIssuer::new(&config.jwt_secret, config.jwt_expires_in_seconds);
    let auth_service = Arc::new(AuthService::new(
        identities.clone(),
        nonces,
        sessions,
        config.auth_nonce_ttl_seconds,
    ));
    let user_service = Arc::new(UserService::new(identities));

    let app_state = AppState::new(
        auth_service,
        user_service,
        RateLimiter::new(config.rate_limit_rps).trust_proxy_headers(config.trust_proxy_headers),
        db_pool,
    );

    let rate_limiter = app_state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = rate_limiter.cleanup(Duration::from_secs(300)).await;
            if removed > 0 {
                tracing::debug!(removed, "Evicted idle rate limit buckets");
            }
        }
    });

    let app = build_router(app_state, cors_layer(config.cors_allowed_origins.as_deref()));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
