//! Server startup failures and the JSON error envelope of the player API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use skillpass_catalog::CatalogError;
use skillpass_core::error::DomainError;
use thiserror::Error;

/// Anything that stops the server from coming up or keeps it from serving.
#[derive(Debug, Error)]
pub enum AppError {
    /// An environment variable is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The module catalog could not be loaded.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The database could not be reached.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migrations failed.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Tracing or span export could not be initialized.
    #[error("telemetry error: {0}")]
    Telemetry(String),

    /// Binding the listener or serving failed.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable error code, e.g. `validation_error`.
    pub error: &'static str,
    /// Description for logs and developers.
    pub message: String,
    /// Whether the player may repeat the request unchanged.
    pub retryable: bool,
}

/// A `DomainError` on its way out of a handler.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

fn classify(error: &DomainError) -> (StatusCode, &'static str) {
    match error {
        DomainError::ModuleNotFound(_) => (StatusCode::NOT_FOUND, "module_not_found"),
        DomainError::AggregateNotFound(_) => (StatusCode::NOT_FOUND, "aggregate_not_found"),
        DomainError::ConcurrencyConflict { .. } => (StatusCode::CONFLICT, "concurrency_conflict"),
        DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
        DomainError::ExternalUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "external_unavailable")
        }
        DomainError::Infrastructure(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = classify(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            error,
            message: self.0.to_string(),
            retryable: self.0.is_transient(),
        };
        (status, Json(body)).into_response()
    }
}
