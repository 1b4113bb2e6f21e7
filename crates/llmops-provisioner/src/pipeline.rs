//! Model → EndpointConfig → Endpoint deployment pipeline.
//!
//! The stage order is encoded in the type system: a [`Pipeline`] starts in
//! [`ModelStage`] and each `provision_*` call consumes it and returns the
//! next stage, so the endpoint cannot be provisioned before its
//! configuration, nor the configuration before its model.
//!
//! ```ignore
//! let pipeline = Pipeline::new(provisioner, plan);
//! let pipeline = pipeline.provision_model().await?;
//! let pipeline = pipeline.provision_endpoint_config().await?;
//! let report = pipeline.provision_endpoint().await?;
//! // pipeline.provision_model() here would not compile
//! ```

use std::marker::PhantomData;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::DeployConfig;
use crate::error::{ProvisionError, ProvisionResult};
use crate::provisioner::{ProvisionOutcome, Provisioner};
use crate::types::{
    EndpointConfigSpec, EndpointSpec, EndpointStatus, ModelSpec, ProductionVariant,
    ResourceDescription, ResourceKind, ResourceSpec,
};

// =============================================================================
// Plan
// =============================================================================

/// Names and specs for the three resources of one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    pub model_name: String,
    pub model: ModelSpec,
    pub endpoint_config_name: String,
    pub endpoint_config: EndpointConfigSpec,
    pub endpoint_name: String,
    pub endpoint: EndpointSpec,
}

impl DeploymentPlan {
    /// Build the plan from configuration. The variant references the model by
    /// name and the endpoint references the configuration by name.
    #[must_use]
    pub fn from_config(config: &DeployConfig) -> Self {
        let model = ModelSpec {
            image: config.model.image_uri.clone(),
            model_data_url: config.model.model_data_url.clone(),
            execution_role_arn: config.model.execution_role_arn.clone(),
            environment: config.model.environment.clone(),
        };

        let endpoint_config = EndpointConfigSpec {
            variants: vec![ProductionVariant {
                variant_name: config.endpoint_config.variant_name.clone(),
                model_name: config.model.name.clone(),
                instance_type: config.endpoint_config.instance_type.clone(),
                initial_instance_count: config.endpoint_config.initial_instance_count,
            }],
        };

        let endpoint = EndpointSpec {
            endpoint_config_name: config.endpoint_config.name.clone(),
        };

        Self {
            model_name: config.model.name.clone(),
            model,
            endpoint_config_name: config.endpoint_config.name.clone(),
            endpoint_config,
            endpoint_name: config.endpoint.name.clone(),
            endpoint,
        }
    }

    /// Every resource in provisioning order.
    #[must_use]
    pub fn resources(&self) -> [(ResourceKind, &str); 3] {
        [
            (ResourceKind::Model, self.model_name.as_str()),
            (ResourceKind::EndpointConfig, self.endpoint_config_name.as_str()),
            (ResourceKind::Endpoint, self.endpoint_name.as_str()),
        ]
    }
}

// =============================================================================
// Reports
// =============================================================================

/// Outcome of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub kind: ResourceKind,
    pub name: String,
    /// Whether an existing resource was deleted first.
    pub replaced: bool,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl StageReport {
    fn new(outcome: ProvisionOutcome, elapsed: Duration) -> Self {
        Self {
            kind: outcome.kind,
            name: outcome.name,
            replaced: outcome.replaced,
            elapsed,
        }
    }
}

/// Outcome of a full pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineReport {
    /// One entry per stage, in order.
    pub stages: Vec<StageReport>,
    pub endpoint_name: String,
    pub endpoint_status: EndpointStatus,
}

/// What a teardown removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    /// Resources that existed and were deleted, in deletion order.
    pub removed: Vec<(ResourceKind, String)>,
}

/// Current registry view of one planned resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceState {
    pub kind: ResourceKind,
    pub name: String,
    /// `None` when the resource does not exist.
    pub description: Option<ResourceDescription>,
}

impl ResourceState {
    /// Whether the resource exists.
    #[must_use]
    pub const fn exists(&self) -> bool {
        self.description.is_some()
    }
}

/// Registry view of every planned resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub resources: Vec<ResourceState>,
}

impl StatusReport {
    /// The endpoint's status, when it exists.
    #[must_use]
    pub fn endpoint_status(&self) -> Option<&EndpointStatus> {
        self.resources
            .iter()
            .find(|state| state.kind == ResourceKind::Endpoint)
            .and_then(|state| state.description.as_ref())
            .and_then(|description| description.status.as_ref())
    }
}

fn serialize_secs<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_f64(value.as_secs_f64())
}

// =============================================================================
// Stage markers (zero-sized)
// =============================================================================

/// Marker trait for pipeline stages.
pub trait Stage: private::Sealed + Send + Sync {
    /// Stage name for logs.
    fn name() -> &'static str;
}

mod private {
    pub trait Sealed {}
}

/// Nothing provisioned yet.
#[derive(Debug, Clone, Copy)]
pub struct ModelStage;

/// Model provisioned; configuration next.
#[derive(Debug, Clone, Copy)]
pub struct ConfigStage;

/// Configuration provisioned; endpoint next.
#[derive(Debug, Clone, Copy)]
pub struct EndpointStage;

impl private::Sealed for ModelStage {}
impl private::Sealed for ConfigStage {}
impl private::Sealed for EndpointStage {}

impl Stage for ModelStage {
    fn name() -> &'static str {
        "model"
    }
}

impl Stage for ConfigStage {
    fn name() -> &'static str {
        "endpoint_config"
    }
}

impl Stage for EndpointStage {
    fn name() -> &'static str {
        "endpoint"
    }
}

// =============================================================================
// Pipeline parameterised by stage
// =============================================================================

/// A deployment in progress, parameterised by the next stage to run.
#[derive(Debug)]
pub struct Pipeline<S: Stage> {
    provisioner: Provisioner,
    plan: DeploymentPlan,
    stages: Vec<StageReport>,
    _stage: PhantomData<S>,
}

impl<S: Stage> Pipeline<S> {
    fn advance<T: Stage>(self) -> Pipeline<T> {
        Pipeline {
            provisioner: self.provisioner,
            plan: self.plan,
            stages: self.stages,
            _stage: PhantomData,
        }
    }

    async fn run_stage(
        &mut self,
        name: String,
        spec: ResourceSpec,
    ) -> ProvisionResult<ProvisionOutcome> {
        let started = Instant::now();
        info!(
            stage = S::name(),
            step = self.stages.len() + 1,
            name = %name,
            "running deployment stage"
        );
        let outcome = self
            .provisioner
            .provision(&name, &spec)
            .await
            .inspect_err(|e| {
                warn!(stage = S::name(), error = %e, "deployment stage failed");
            })?;
        let elapsed = started.elapsed();
        info!(
            stage = S::name(),
            replaced = outcome.replaced,
            elapsed_secs = elapsed.as_secs_f64(),
            "deployment stage complete"
        );
        self.stages.push(StageReport::new(outcome.clone(), elapsed));
        Ok(outcome)
    }
}

impl Pipeline<ModelStage> {
    /// Start a pipeline for `plan`.
    #[must_use]
    pub fn new(provisioner: Provisioner, plan: DeploymentPlan) -> Self {
        Self {
            provisioner,
            plan,
            stages: Vec::with_capacity(3),
            _stage: PhantomData,
        }
    }

    /// Replace the model.
    pub async fn provision_model(mut self) -> ProvisionResult<Pipeline<ConfigStage>> {
        let name = self.plan.model_name.clone();
        let spec = ResourceSpec::Model(self.plan.model.clone());
        self.run_stage(name, spec).await?;
        Ok(self.advance())
    }
}

impl Pipeline<ConfigStage> {
    /// Replace the endpoint configuration that references the model.
    pub async fn provision_endpoint_config(mut self) -> ProvisionResult<Pipeline<EndpointStage>> {
        let name = self.plan.endpoint_config_name.clone();
        let spec = ResourceSpec::EndpointConfig(self.plan.endpoint_config.clone());
        self.run_stage(name, spec).await?;
        Ok(self.advance())
    }
}

impl Pipeline<EndpointStage> {
    /// Replace the endpoint and wait for it to come into service.
    pub async fn provision_endpoint(mut self) -> ProvisionResult<PipelineReport> {
        let name = self.plan.endpoint_name.clone();
        let spec = ResourceSpec::Endpoint(self.plan.endpoint.clone());
        let outcome = self.run_stage(name, spec).await?;

        Ok(PipelineReport {
            stages: self.stages,
            endpoint_name: outcome.name,
            endpoint_status: outcome.status.unwrap_or(EndpointStatus::InService),
        })
    }
}

// =============================================================================
// Whole-deployment operations
// =============================================================================

/// Runs, tears down and inspects a planned deployment.
#[derive(Debug, Clone)]
pub struct DeploymentPipeline {
    provisioner: Provisioner,
    plan: DeploymentPlan,
}

impl DeploymentPipeline {
    /// Create a pipeline for `plan`.
    #[must_use]
    pub fn new(provisioner: Provisioner, plan: DeploymentPlan) -> Self {
        Self { provisioner, plan }
    }

    /// Provision all three resources in order.
    pub async fn run(&self) -> ProvisionResult<PipelineReport> {
        info!(
            model = %self.plan.model_name,
            endpoint_config = %self.plan.endpoint_config_name,
            endpoint = %self.plan.endpoint_name,
            "starting deployment pipeline"
        );

        let report = Pipeline::new(self.provisioner.clone(), self.plan.clone())
            .provision_model()
            .await?
            .provision_endpoint_config()
            .await?
            .provision_endpoint()
            .await?;

        info!(
            endpoint = %report.endpoint_name,
            status = %report.endpoint_status,
            "endpoint is deployed and ready for inference"
        );
        Ok(report)
    }

    /// Delete Endpoint → EndpointConfig → Model, ignoring ones that are
    /// already gone.
    pub async fn teardown(&self) -> ProvisionResult<TeardownReport> {
        let mut report = TeardownReport::default();

        for (kind, name) in self.plan.resources().into_iter().rev() {
            if self.provisioner.remove_existing(kind, name).await? {
                if kind == ResourceKind::Endpoint {
                    self.provisioner.wait_deleted(name).await?;
                }
                report.removed.push((kind, name.to_owned()));
            }
        }

        info!(removed = report.removed.len(), "teardown complete");
        Ok(report)
    }

    /// Describe every planned resource. Missing resources are reported as
    /// absent; any other registry error is returned.
    pub async fn status(&self) -> ProvisionResult<StatusReport> {
        let registry = self.provisioner.registry();
        let mut resources = Vec::with_capacity(3);

        for (kind, name) in self.plan.resources() {
            let description = match registry.describe(kind, name).await {
                Ok(description) => Some(description),
                Err(err) if err.is_not_found() => None,
                Err(source) => {
                    warn!(kind = %kind, name = %name, error = %source, "describe failed");
                    return Err(ProvisionError::Describe {
                        kind,
                        name: name.to_owned(),
                        source,
                    });
                }
            };
            resources.push(ResourceState {
                kind,
                name: name.to_owned(),
                description,
            });
        }

        Ok(StatusReport { resources })
    }
}
