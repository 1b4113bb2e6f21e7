//! Error types for llmops-chat.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use llmops_core::CoreError;
use thiserror::Error;

/// Result type alias using [`ChatError`].
pub type ChatResult<T> = Result<T, ChatError>;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Endpoint error: {0}")]
    Endpoint(#[from] CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChatError {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Endpoint(_) => "endpoint_error",
            Self::Io(_) => "io_error",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Endpoint(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            Self::InvalidRequest(_) => self.to_string(),
            Self::Endpoint(_) => "The model endpoint could not answer".to_owned(),
            Self::Config(_) | Self::Io(_) => "Internal server error".to_owned(),
        };

        (
            status,
            Json(serde_json::json!({
                "error": self.error_type(),
                "message": message,
            })),
        )
            .into_response()
    }
}
