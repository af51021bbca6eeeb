//! Server error types.

use std::io;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (listener bind, accept loop).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A blocking task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The fetcher could not be built.
    #[error("Fetcher error: {0}")]
    Fetcher(#[from] busyfeed_sources::SourceError),

    /// Logging could not be initialised.
    #[error("Tracing error: {0}")]
    Tracing(#[from] busyfeed_core::TracingError),
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an error for a required setting that is absent.
    pub fn missing(setting: &str, env: &str) -> Self {
        Self::config(format!("{} is not set (use --{} or {})", setting, setting, env))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        error!(error = %self, "Request failed");
        let body = match &self {
            Self::Config { .. } => self.to_string(),
            _ => "Internal server error".to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
    }
}
