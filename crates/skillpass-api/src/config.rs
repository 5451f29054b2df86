//! Server configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use skillpass_training::application::outbox::RetryPolicy;

use crate::error::AppError;

/// Startup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Address to bind.
    pub addr: SocketAddr,
    /// YAML catalog file; the compiled-in catalog is used when unset.
    pub catalog_path: Option<PathBuf>,
    /// Retry schedule of the persistence queue.
    pub persist_policy: RetryPolicy,
    /// OTLP gRPC endpoint; span export is disabled when unset.
    pub otlp_endpoint: Option<String>,
    /// Live sessions untouched for this long are closed and dropped.
    pub session_idle_timeout: Duration,
}

/// Idle time after which a live session is evicted, unless overridden.
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a required variable is missing or a
    /// value does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| AppError::Config("DATABASE_URL environment variable must be set".into()))?;
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port: u16 = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?;
        let addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;

        let max_attempts: u32 = match lookup("SKILLPASS_PERSIST_MAX_ATTEMPTS") {
            Some(raw) => raw.parse().map_err(|e| {
                AppError::Config(format!("SKILLPASS_PERSIST_MAX_ATTEMPTS must be a number: {e}"))
            })?,
            None => RetryPolicy::default().max_attempts,
        };
        if max_attempts == 0 {
            return Err(AppError::Config(
                "SKILLPASS_PERSIST_MAX_ATTEMPTS must be at least 1".into(),
            ));
        }
        let initial_backoff = match lookup("SKILLPASS_PERSIST_BACKOFF_MS") {
            Some(raw) => Duration::from_millis(raw.parse().map_err(|e| {
                AppError::Config(format!("SKILLPASS_PERSIST_BACKOFF_MS must be a number: {e}"))
            })?),
            None => RetryPolicy::default().initial_backoff,
        };
        let idle_secs: u64 = match lookup("SKILLPASS_SESSION_IDLE_SECS") {
            Some(raw) => raw.parse().map_err(|e| {
                AppError::Config(format!("SKILLPASS_SESSION_IDLE_SECS must be a number: {e}"))
            })?,
            None => DEFAULT_SESSION_IDLE_SECS,
        };
        if idle_secs == 0 {
            return Err(AppError::Config(
                "SKILLPASS_SESSION_IDLE_SECS must be at least 1".into(),
            ));
        }

        Ok(Self {
            database_url,
            addr,
            catalog_path: lookup("SKILLPASS_CATALOG_PATH")
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            persist_policy: RetryPolicy {
                max_attempts,
                initial_backoff,
            },
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|e| !e.is_empty()),
            session_idle_timeout: Duration::from_secs(idle_secs),
        })
    }
}
