//! Error types for llmops-functions.

use llmops_core::CoreError;
use llmops_provisioner::ProvisionError;

/// Result type alias using [`FunctionError`].
pub type FunctionResult<T> = Result<T, FunctionError>;

/// Errors raised by the event handlers. All of them end the invocation.
#[derive(Debug, thiserror::Error)]
pub enum FunctionError {
    /// Missing or invalid environment configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The triggering event does not have the expected shape.
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Reading or writing an object failed.
    #[error("storage error for s3://{bucket}/{key}: {message}")]
    Storage {
        bucket: String,
        key: String,
        message: String,
    },

    /// The transcript document does not have the expected shape.
    #[error("malformed transcript: {0}")]
    Transcript(String),

    /// Starting the transcription job failed.
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Sending the notification failed.
    #[error("notification error: {0}")]
    Notification(String),

    /// The derived output key would overwrite the input.
    #[error("refusing to overwrite input object {0}")]
    WouldOverwrite(String),

    #[error(transparent)]
    Invoke(#[from] CoreError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FunctionError {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid event error.
    #[must_use]
    pub fn invalid_event(msg: impl Into<String>) -> Self {
        Self::InvalidEvent(msg.into())
    }

    /// Create a storage error.
    #[must_use]
    pub fn storage(bucket: &str, key: &str, message: impl std::fmt::Display) -> Self {
        Self::Storage {
            bucket: bucket.to_owned(),
            key: key.to_owned(),
            message: message.to_string(),
        }
    }
}
