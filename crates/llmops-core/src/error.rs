//! Error types for llmops-core.

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised while talking to the inference endpoint.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The endpoint rejected the invocation or could not be reached.
    #[error("invocation of endpoint {endpoint} failed: {message}")]
    Invoke {
        /// Endpoint name.
        endpoint: String,
        /// Service-provided detail.
        message: String,
    },

    /// The endpoint answered with a body that does not match the wire contract.
    #[error("malformed endpoint response: {0}")]
    Decode(String),

    /// The request could not be serialised.
    #[error("serialisation error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Generation parameters outside their valid range.
    #[error("invalid generation parameter: {0}")]
    InvalidParameter(String),
}

impl CoreError {
    /// Create an invocation error.
    #[must_use]
    pub fn invoke(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invoke {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a parameter validation error.
    #[must_use]
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}
