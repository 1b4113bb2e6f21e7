//! Managed-resource registry backends.
//!
//! The registry owns all resource state. The provisioner only issues
//! create/delete/describe calls through [`ResourceRegistry`] and never caches
//! what it gets back. The production backend talks to SageMaker; an in-memory
//! backend is provided for tests and dry runs.

mod memory;
mod sagemaker;

pub use memory::{MemoryRegistry, Operation};
pub use sagemaker::SageMakerRegistry;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{DeployConfig, RegistryType};
use crate::error::RegistryResult;
use crate::types::{ResourceDescription, ResourceKind, ResourceSpec};

/// Client for the managed registry holding models, endpoint configurations
/// and endpoints.
///
/// Implementations must report absence as
/// [`RegistryError::NotFound`](crate::error::RegistryError::NotFound) from
/// both `delete` and `describe`; the provisioner relies on that kind alone to
/// decide what is safe to ignore.
#[async_trait]
pub trait ResourceRegistry: Send + Sync {
    /// Create a resource. Fails if the name is taken or a referenced resource
    /// is missing.
    async fn create(&self, name: &str, spec: &ResourceSpec) -> RegistryResult<()>;

    /// Delete a resource by kind and name.
    async fn delete(&self, kind: ResourceKind, name: &str) -> RegistryResult<()>;

    /// Describe a resource by kind and name.
    async fn describe(&self, kind: ResourceKind, name: &str)
        -> RegistryResult<ResourceDescription>;
}

/// Create a registry from configuration.
pub async fn create_registry(config: &DeployConfig) -> Arc<dyn ResourceRegistry> {
    match config.registry {
        RegistryType::SageMaker => {
            let sdk_config = llmops_core::aws::load_sdk_config(Some(&config.aws.region)).await;
            Arc::new(SageMakerRegistry::new(&sdk_config))
        }
        RegistryType::Memory => Arc::new(MemoryRegistry::new()),
    }
}
