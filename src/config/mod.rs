//! Configuration management for MarkChain
//!
//! Loads and validates configuration from environment variables (and an
//! optional `.env` file).

use std::{collections::HashMap, env, str::FromStr};
use thiserror::Error;

const DEV_JWT_SECRET: &str = "development-secret-change-in-production";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Where identities and nonces are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid store backend: '{}'. Expected: postgres or memory",
                s
            ))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,

    pub store_backend: StoreBackend,

    /// Database connection URL (required for the postgres backend)
    pub database_url: Option<String>,

    pub port: u16,

    pub db_max_connections: u32,

    /// Rate limit: requests per second per client
    pub rate_limit_rps: u32,

    /// Key rate limits on X-Forwarded-For / X-Real-IP (default: false)
    pub trust_proxy_headers: bool,

    /// Comma-separated CORS origins; permissive when unset
    pub cors_allowed_origins: Option<String>,

    /// Fallback log filter when RUST_LOG is unset
    pub log_level: String,

    pub jwt_secret: String,

    /// Session token TTL in seconds (default: 3600)
    pub jwt_expires_in_seconds: i64,

    /// Challenge nonce TTL in seconds (default: 300)
    pub auth_nonce_ttl_seconds: i64,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from a fixed set of variables
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = get("ENVIRONMENT")
            .map(|s| s.parse::<Environment>())
            .transpose()?
            .unwrap_or_default();

        let store_backend = get("STORE_BACKEND")
            .map(|s| s.parse::<StoreBackend>())
            .transpose()?
            .unwrap_or_default();

        let database_url = get("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
        }

        let port = get("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let db_max_connections = parse_or(&get, "DB_MAX_CONNECTIONS", 5)?;
        let rate_limit_rps = parse_or(&get, "RATE_LIMIT_RPS", 20)?;
        let trust_proxy_headers = parse_or(&get, "TRUST_PROXY_HEADERS", false)?;

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS").filter(|s| !s.trim().is_empty());

        let log_level = get("RUST_LOG").unwrap_or_else(|| "info".to_string());

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => secret,
            _ if environment.is_production() => {
                return Err(ConfigError::MissingEnvVar("JWT_SECRET".to_string()))
            }
            _ => DEV_JWT_SECRET.to_string(),
        };

        let jwt_expires_in_seconds = parse_or(&get, "JWT_EXPIRES_IN_SECONDS", 3600)?;
        let auth_nonce_ttl_seconds = parse_or(&get, "AUTH_NONCE_TTL_SECONDS", 300)?;

        if jwt_expires_in_seconds <= 0 || auth_nonce_ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue(
                "token and nonce TTLs must be positive".to_string(),
            ));
        }

        Ok(Config {
            environment,
            store_backend,
            database_url,
            port,
            db_max_connections,
            rate_limit_rps,
            trust_proxy_headers,
            cors_allowed_origins,
            log_level,
            jwt_secret,
            jwt_expires_in_seconds,
            auth_nonce_ttl_seconds,
        })
    }

    /// Database URL with the password masked, for logging
    pub fn database_url_masked(&self) -> String {
        let Some(url) = &self.database_url else {
            return "<none>".to_string();
        };

        if let Some(at_pos) = url.find('@') {
            if let Some(colon_pos) = url[..at_pos].rfind(':') {
                let prefix = &url[..colon_pos + 1];
                let suffix = &url[at_pos..];
                return format!("{}****{}", prefix, suffix);
            }
        }
        url.clone()
    }
}

/// Parse `key` when set, or fall back to `default` when absent
fn parse_or<F, T>(get: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| {
            ConfigError::InvalidValue(format!("{} has invalid value '{}'", key, raw))
        }),
        None => Ok(default),
    }
}
