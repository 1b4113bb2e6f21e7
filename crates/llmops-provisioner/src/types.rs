//! Core types for llmops-provisioner.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The three kinds of named singleton resource kept in the managed registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Inference artifact: container image plus model data.
    Model,
    /// Serving configuration referencing a model by name.
    EndpointConfig,
    /// Live serving endpoint referencing a configuration by name.
    Endpoint,
}

impl ResourceKind {
    /// Human-readable name used in logs and errors.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::EndpointConfig => "endpoint configuration",
            Self::Endpoint => "endpoint",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Desired state of a model resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Container image reference.
    pub image: String,
    /// Location of the packaged model artifact.
    pub model_data_url: String,
    /// Identity the serving containers run as.
    pub execution_role_arn: String,
    /// Environment passed to the serving container.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

/// One traffic variant of an endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionVariant {
    /// Variant name.
    pub variant_name: String,
    /// Model served by this variant.
    pub model_name: String,
    /// Compute instance type.
    pub instance_type: String,
    /// Number of instances to start with.
    pub initial_instance_count: u32,
}

/// Desired state of an endpoint configuration resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfigSpec {
    /// Production variants.
    pub variants: Vec<ProductionVariant>,
}

/// Desired state of an endpoint resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointSpec {
    /// Endpoint configuration to serve.
    pub endpoint_config_name: String,
}

/// Kind-specific payload for a create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceSpec {
    Model(ModelSpec),
    EndpointConfig(EndpointConfigSpec),
    Endpoint(EndpointSpec),
}

impl ResourceSpec {
    /// The kind of resource this spec creates.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Model(_) => ResourceKind::Model,
            Self::EndpointConfig(_) => ResourceKind::EndpointConfig,
            Self::Endpoint(_) => ResourceKind::Endpoint,
        }
    }
}

/// Status of an endpoint as reported by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointStatus {
    Creating,
    Updating,
    SystemUpdating,
    RollingBack,
    InService,
    OutOfService,
    Deleting,
    Failed,
    /// A status this crate does not know about.
    Other(String),
}

impl EndpointStatus {
    /// Parse the registry's status string.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "Creating" => Self::Creating,
            "Updating" => Self::Updating,
            "SystemUpdating" => Self::SystemUpdating,
            "RollingBack" => Self::RollingBack,
            "InService" => Self::InService,
            "OutOfService" => Self::OutOfService,
            "Deleting" => Self::Deleting,
            "Failed" => Self::Failed,
            other => Self::Other(other.to_owned()),
        }
    }

    /// The registry's spelling of this status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Creating => "Creating",
            Self::Updating => "Updating",
            Self::SystemUpdating => "SystemUpdating",
            Self::RollingBack => "RollingBack",
            Self::InService => "InService",
            Self::OutOfService => "OutOfService",
            Self::Deleting => "Deleting",
            Self::Failed => "Failed",
            Self::Other(other) => other,
        }
    }

    /// Whether the endpoint has stopped transitioning, successfully or not.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::InService | Self::Failed)
    }
}

impl fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// What the registry reports about an existing resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescription {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource name.
    pub name: String,
    /// Spec as recorded by the registry.
    pub spec: ResourceSpec,
    /// Lifecycle status; only endpoints have one.
    pub status: Option<EndpointStatus>,
    /// Why the endpoint failed, when it did.
    pub failure_reason: Option<String>,
}
