//! Error types for llmops-inference.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

/// Result type alias using [`InferenceError`].
pub type InferenceResult<T> = Result<T, InferenceError>;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedMediaType(String),

    #[error("Not acceptable: {0}")]
    NotAcceptable(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model is not loaded")]
    ModelNotReady,

    #[error("Model failed to load: {0}")]
    ModelLoadFailed(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Engine request failed: {0}")]
    Engine(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InferenceError {
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

    /// Create a generation error.
    #[must_use]
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Config(_) => "config_error",
            Self::UnsupportedMediaType(_) => "unsupported_media_type",
            Self::NotAcceptable(_) => "not_acceptable",
            Self::InvalidRequest(_) => "invalid_request",
            Self::ModelNotReady => "model_not_ready",
            Self::ModelLoadFailed(_) => "model_load_failed",
            Self::Generation(_) => "generation_error",
            Self::Engine(_) => "engine_error",
            Self::Io(_) => "io_error",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::ModelNotReady | Self::ModelLoadFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Generation(_) | Self::Engine(_) => StatusCode::BAD_GATEWAY,
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for InferenceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            Self::UnsupportedMediaType(_)
            | Self::NotAcceptable(_)
            | Self::InvalidRequest(_)
            | Self::ModelNotReady => self.to_string(),
            Self::ModelLoadFailed(_) => "Model failed to load".to_owned(),

            // Hide internal details
            Self::Generation(_) | Self::Engine(_) | Self::Config(_) | Self::Io(_) => {
                "Internal server error".to_owned()
            }
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
