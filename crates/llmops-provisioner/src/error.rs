//! Error types for llmops-provisioner.

use std::time::Duration;

use crate::types::{EndpointStatus, ResourceKind};

/// Result type alias using [`RegistryError`].
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type alias using [`ProvisionError`].
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Errors returned by a [`ResourceRegistry`](crate::registry::ResourceRegistry).
///
/// Adapters classify service failures into these kinds; nothing above the
/// adapter inspects error messages.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No resource of this kind and name exists.
    #[error("{kind} {name} not found")]
    NotFound {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource name.
        name: String,
    },

    /// The caller is not allowed to perform the operation.
    #[error("access denied for {kind} {name}: {message}")]
    AccessDenied {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource name.
        name: String,
        /// Service-provided detail.
        message: String,
    },

    /// The service refused the request (name collision, dangling reference,
    /// validation failure, throttling).
    #[error("{kind} {name} rejected ({code}): {message}")]
    Rejected {
        /// Resource kind.
        kind: ResourceKind,
        /// Resource name.
        name: String,
        /// Service error code.
        code: String,
        /// Service-provided detail.
        message: String,
    },

    /// The request never got a service answer.
    #[error("registry transport error: {0}")]
    Transport(String),

    /// The spec cannot be expressed as a service request.
    #[error("invalid resource spec: {0}")]
    InvalidSpec(String),
}

impl RegistryError {
    /// Create a not-found error.
    #[must_use]
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Create a rejection error.
    #[must_use]
    pub fn rejected(
        kind: ResourceKind,
        name: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Rejected {
            kind,
            name: name.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether this error means the resource does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors that abort a provisioning stage.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Removing the previous resource failed for a reason other than absence.
    #[error("failed to delete existing {kind} {name}: {source}")]
    Cleanup {
        kind: ResourceKind,
        name: String,
        #[source]
        source: RegistryError,
    },

    /// The create call failed.
    #[error("failed to create {kind} {name}: {source}")]
    Create {
        kind: ResourceKind,
        name: String,
        #[source]
        source: RegistryError,
    },

    /// Polling the registry failed.
    #[error("failed to describe {kind} {name}: {source}")]
    Describe {
        kind: ResourceKind,
        name: String,
        #[source]
        source: RegistryError,
    },

    /// The endpoint reached the terminal failed state.
    #[error("endpoint {name} entered {status}: {reason}")]
    ReadinessFailed {
        name: String,
        status: EndpointStatus,
        reason: String,
    },

    /// The endpoint did not reach a terminal state in time.
    #[error(
        "endpoint {name} not in service after {}s (last status: {})",
        .waited.as_secs(),
        describe_status(.last_status.as_ref())
    )]
    ReadinessTimeout {
        name: String,
        waited: Duration,
        last_status: Option<EndpointStatus>,
    },

    /// A deleted endpoint was still present when the deletion wait ran out.
    #[error(
        "endpoint {name} still present after {}s (last status: {})",
        .waited.as_secs(),
        describe_status(.last_status.as_ref())
    )]
    DeletionTimeout {
        name: String,
        waited: Duration,
        last_status: Option<EndpointStatus>,
    },

    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProvisionError {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// The underlying registry error, if the failure came from the registry.
    #[must_use]
    pub fn registry_error(&self) -> Option<&RegistryError> {
        match self {
            Self::Cleanup { source, .. }
            | Self::Create { source, .. }
            | Self::Describe { source, .. } => Some(source),
            _ => None,
        }
    }
}

fn describe_status(status: Option<&EndpointStatus>) -> &str {
    status.map_or("unknown", EndpointStatus::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_classified() {
        assert!(RegistryError::not_found(ResourceKind::Model, "m1").is_not_found());
        assert!(!RegistryError::rejected(
            ResourceKind::Model,
            "m1",
            "ValidationException",
            "bad"
        )
        .is_not_found());
        assert!(!RegistryError::Transport("reset".to_owned()).is_not_found());
    }

    #[test]
    fn timeout_message_names_last_status() {
        let err = ProvisionError::ReadinessTimeout {
            name: "ep".to_owned(),
            waited: Duration::from_secs(90),
            last_status: Some(EndpointStatus::Creating),
        };
        assert_eq!(
            err.to_string(),
            "endpoint ep not in service after 90s (last status: Creating)"
        );

        let err = ProvisionError::DeletionTimeout {
            name: "ep".to_owned(),
            waited: Duration::from_secs(5),
            last_status: None,
        };
        assert!(err.to_string().contains("last status: unknown"));
    }

    #[test]
    fn registry_error_is_exposed() {
        let err = ProvisionError::Create {
            kind: ResourceKind::Endpoint,
            name: "ep".to_owned(),
            source: RegistryError::Transport("reset".to_owned()),
        };
        assert!(err.registry_error().is_some());
        assert!(ProvisionError::config("x").registry_error().is_none());
    }
}
