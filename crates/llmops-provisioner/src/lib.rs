//! Idempotent provisioning of a SageMaker inference endpoint.
//!
//! Three named singleton resources are (re)created in a fixed order:
//!
//! ```text
//! Model ──▶ EndpointConfig ──▶ Endpoint ──▶ InService
//! ```
//!
//! Each one is replaced rather than updated: the provisioner deletes any
//! resource of the same kind and name (absence is fine), creates it from the
//! desired spec, and for the endpoint polls until it is in service, fails, or
//! the readiness timeout runs out. The registry is the only source of truth;
//! nothing is cached between calls or runs.
//!
//! # Example
//!
//! ```ignore
//! use llmops_provisioner::{create_registry, DeployConfig, DeploymentPipeline, DeploymentPlan, Provisioner};
//!
//! let config = DeployConfig::load()?;
//! let registry = create_registry(&config).await;
//! let provisioner = Provisioner::new(registry, (&config.readiness).into());
//! let report = DeploymentPipeline::new(provisioner, DeploymentPlan::from_config(&config))
//!     .run()
//!     .await?;
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod pipeline;
pub mod provisioner;
pub mod registry;
pub mod types;

pub use config::{DeployConfig, RegistryType};
pub use error::{ProvisionError, ProvisionResult, RegistryError, RegistryResult};
pub use pipeline::{
    ConfigStage, DeploymentPipeline, DeploymentPlan, EndpointStage, ModelStage, Pipeline,
    PipelineReport, ResourceState, Stage, StageReport, StatusReport, TeardownReport,
};
pub use provisioner::{ProvisionOutcome, Provisioner, ReadinessPolicy};
pub use registry::{create_registry, MemoryRegistry, Operation, ResourceRegistry, SageMakerRegistry};
pub use types::{
    EndpointConfigSpec, EndpointSpec, EndpointStatus, ModelSpec, ProductionVariant,
    ResourceDescription, ResourceKind, ResourceSpec,
};
