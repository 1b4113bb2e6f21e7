//! SageMaker-backed registry.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sagemaker::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_sagemaker::types::{
    ContainerDefinition, ProductionVariant as SageMakerVariant, ProductionVariantInstanceType,
};
use aws_sdk_sagemaker::Client;
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::types::{
    EndpointConfigSpec, EndpointSpec, EndpointStatus, ModelSpec, ProductionVariant,
    ResourceDescription, ResourceKind, ResourceSpec,
};

use super::ResourceRegistry;

/// Registry backed by the SageMaker control-plane API.
#[derive(Clone)]
pub struct SageMakerRegistry {
    client: Client,
}

impl fmt::Debug for SageMakerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SageMakerRegistry").finish_non_exhaustive()
    }
}

impl SageMakerRegistry {
    /// Create a registry from a shared SDK configuration.
    #[must_use]
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }

    /// Create from a pre-built client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn create_model(&self, name: &str, spec: &ModelSpec) -> RegistryResult<()> {
        let environment = spec
            .environment
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let container = ContainerDefinition::builder()
            .image(&spec.image)
            .model_data_url(&spec.model_data_url)
            .set_environment(Some(environment))
            .build();

        self.client
            .create_model()
            .model_name(name)
            .primary_container(container)
            .execution_role_arn(&spec.execution_role_arn)
            .send()
            .await
            .map_err(|e| classify(Call::Create, ResourceKind::Model, name, &e))?;
        Ok(())
    }

    async fn create_endpoint_config(
        &self,
        name: &str,
        spec: &EndpointConfigSpec,
    ) -> RegistryResult<()> {
        let variants = spec
            .variants
            .iter()
            .map(to_sagemaker_variant)
            .collect::<RegistryResult<Vec<_>>>()?;

        self.client
            .create_endpoint_config()
            .endpoint_config_name(name)
            .set_production_variants(Some(variants))
            .send()
            .await
            .map_err(|e| classify(Call::Create, ResourceKind::EndpointConfig, name, &e))?;
        Ok(())
    }

    async fn create_endpoint(&self, name: &str, spec: &EndpointSpec) -> RegistryResult<()> {
        self.client
            .create_endpoint()
            .endpoint_name(name)
            .endpoint_config_name(&spec.endpoint_config_name)
            .send()
            .await
            .map_err(|e| classify(Call::Create, ResourceKind::Endpoint, name, &e))?;
        Ok(())
    }

    async fn describe_model(&self, name: &str) -> RegistryResult<ResourceDescription> {
        let kind = ResourceKind::Model;
        let output = self
            .client
            .describe_model()
            .model_name(name)
            .send()
            .await
            .map_err(|e| classify(Call::Describe, kind, name, &e))?;

        let container = output.primary_container();
        let environment: BTreeMap<String, String> = container
            .and_then(ContainerDefinition::environment)
            .map(|env| env.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        let spec = ModelSpec {
            image: container
                .and_then(ContainerDefinition::image)
                .unwrap_or_default()
                .to_owned(),
            model_data_url: container
                .and_then(ContainerDefinition::model_data_url)
                .unwrap_or_default()
                .to_owned(),
            execution_role_arn: output.execution_role_arn().unwrap_or_default().to_owned(),
            environment,
        };

        Ok(ResourceDescription {
            kind,
            name: name.to_owned(),
            spec: ResourceSpec::Model(spec),
            status: None,
            failure_reason: None,
        })
    }

    async fn describe_endpoint_config(&self, name: &str) -> RegistryResult<ResourceDescription> {
        let kind = ResourceKind::EndpointConfig;
        let output = self
            .client
            .describe_endpoint_config()
            .endpoint_config_name(name)
            .send()
            .await
            .map_err(|e| classify(Call::Describe, kind, name, &e))?;

        let variants = output
            .production_variants()
            .iter()
            .map(|variant| ProductionVariant {
                variant_name: variant.variant_name().unwrap_or_default().to_owned(),
                model_name: variant.model_name().unwrap_or_default().to_owned(),
                instance_type: variant
                    .instance_type()
                    .map(|t| t.as_str().to_owned())
                    .unwrap_or_default(),
                initial_instance_count: variant
                    .initial_instance_count()
                    .and_then(|count| u32::try_from(count).ok())
                    .unwrap_or_default(),
            })
            .collect();

        Ok(ResourceDescription {
            kind,
            name: name.to_owned(),
            spec: ResourceSpec::EndpointConfig(EndpointConfigSpec { variants }),
            status: None,
            failure_reason: None,
        })
    }

    async fn describe_endpoint(&self, name: &str) -> RegistryResult<ResourceDescription> {
        let kind = ResourceKind::Endpoint;
        let output = self
            .client
            .describe_endpoint()
            .endpoint_name(name)
            .send()
            .await
            .map_err(|e| classify(Call::Describe, kind, name, &e))?;

        let status = output
            .endpoint_status()
            .map(|status| EndpointStatus::parse(status.as_str()));

        Ok(ResourceDescription {
            kind,
            name: name.to_owned(),
            spec: ResourceSpec::Endpoint(EndpointSpec {
                endpoint_config_name: output.endpoint_config_name().unwrap_or_default().to_owned(),
            }),
            status,
            failure_reason: output.failure_reason().map(ToOwned::to_owned),
        })
    }
}

fn to_sagemaker_variant(variant: &ProductionVariant) -> RegistryResult<SageMakerVariant> {
    let count = i32::try_from(variant.initial_instance_count).map_err(|_| {
        RegistryError::InvalidSpec(format!(
            "initial instance count {} out of range",
            variant.initial_instance_count
        ))
    })?;

    Ok(SageMakerVariant::builder()
        .variant_name(&variant.variant_name)
        .model_name(&variant.model_name)
        .instance_type(ProductionVariantInstanceType::from(
            variant.instance_type.as_str(),
        ))
        .initial_instance_count(count)
        .build())
}

/// Which registry call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Create,
    Delete,
    Describe,
}

/// Map a SageMaker SDK error onto a structured registry error.
///
/// SageMaker has no dedicated not-found exception for models, endpoint
/// configurations or endpoints: delete and describe answer with a
/// `ValidationException` whose message starts with "Could not find". That is
/// the only place the message is consulted. On create the same message names
/// a missing referenced resource, so it stays a rejection.
fn classify<E, R>(
    call: Call,
    kind: ResourceKind,
    name: &str,
    err: &SdkError<E, R>,
) -> RegistryError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: fmt::Debug,
{
    match err {
        SdkError::ServiceError(_) => {
            let code = err.code().unwrap_or("Unknown");
            let message = err.message().unwrap_or_default();
            debug!(kind = %kind, name = %name, code = %code, message = %message, "registry call failed");
            classify_service_error(call, kind, name, code, message)
        }
        _ => RegistryError::Transport(DisplayErrorContext(err).to_string()),
    }
}

fn classify_service_error(
    call: Call,
    kind: ResourceKind,
    name: &str,
    code: &str,
    message: &str,
) -> RegistryError {
    let names_target = matches!(call, Call::Delete | Call::Describe);
    match code {
        "ResourceNotFound" | "ResourceNotFoundException" if names_target => {
            RegistryError::not_found(kind, name)
        }
        "ValidationException" if names_target && message.starts_with("Could not find") => {
            RegistryError::not_found(kind, name)
        }
        "AccessDeniedException" | "AccessDenied" | "UnauthorizedOperation" => {
            RegistryError::AccessDenied {
                kind,
                name: name.to_owned(),
                message: message.to_owned(),
            }
        }
        _ => RegistryError::rejected(kind, name, code, message),
    }
}

#[async_trait]
impl ResourceRegistry for SageMakerRegistry {
    async fn create(&self, name: &str, spec: &ResourceSpec) -> RegistryResult<()> {
        match spec {
            ResourceSpec::Model(model) => self.create_model(name, model).await,
            ResourceSpec::EndpointConfig(config) => self.create_endpoint_config(name, config).await,
            ResourceSpec::Endpoint(endpoint) => self.create_endpoint(name, endpoint).await,
        }
    }

    async fn delete(&self, kind: ResourceKind, name: &str) -> RegistryResult<()> {
        match kind {
            ResourceKind::Model => {
                self.client
                    .delete_model()
                    .model_name(name)
                    .send()
                    .await
                    .map_err(|e| classify(Call::Delete, kind, name, &e))?;
            }
            ResourceKind::EndpointConfig => {
                self.client
                    .delete_endpoint_config()
                    .endpoint_config_name(name)
                    .send()
                    .await
                    .map_err(|e| classify(Call::Delete, kind, name, &e))?;
            }
            ResourceKind::Endpoint => {
                self.client
                    .delete_endpoint()
                    .endpoint_name(name)
                    .send()
                    .await
                    .map_err(|e| classify(Call::Delete, kind, name, &e))?;
            }
        }
        Ok(())
    }

    async fn describe(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> RegistryResult<ResourceDescription> {
        match kind {
            ResourceKind::Model => self.describe_model(name).await,
            ResourceKind::EndpointConfig => self.describe_endpoint_config(name).await,
            ResourceKind::Endpoint => self.describe_endpoint(name).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn could_not_find_is_not_found() {
        let err = classify_service_error(
            Call::Delete,
            ResourceKind::Model,
            "m1",
            "ValidationException",
            "Could not find model \"arn:aws:sagemaker:ca-central-1:123456789012:model/m1\".",
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn missing_reference_on_create_is_a_rejection() {
        let message = "Could not find endpoint configuration \"missing-cfg\".";
        let err = classify_service_error(
            Call::Create,
            ResourceKind::Endpoint,
            "ep",
            "ValidationException",
            message,
        );
        assert!(!err.is_not_found());
        match err {
            RegistryError::Rejected {
                kind,
                name,
                code,
                message: reported,
            } => {
                assert_eq!(kind, ResourceKind::Endpoint);
                assert_eq!(name, "ep");
                assert_eq!(code, "ValidationException");
                assert_eq!(reported, message);
            }
            other => panic!("expected rejection, got {other}"),
        }

        // The same answer to a describe means the endpoint itself is missing.
        let err = classify_service_error(
            Call::Describe,
            ResourceKind::Endpoint,
            "ep",
            "ValidationException",
            "Could not find endpoint \"ep\".",
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn other_validation_errors_are_rejections() {
        let err = classify_service_error(
            Call::Create,
            ResourceKind::Endpoint,
            "ep",
            "ValidationException",
            "Cannot create already existing endpoint \"ep\".",
        );
        assert!(matches!(err, RegistryError::Rejected { .. }));
    }

    #[test]
    fn access_denied_is_not_suppressible() {
        let err = classify_service_error(
            Call::Delete,
            ResourceKind::EndpointConfig,
            "cfg",
            "AccessDeniedException",
            "User is not authorized to perform: sagemaker:DeleteEndpointConfig",
        );
        assert!(matches!(err, RegistryError::AccessDenied { .. }));
        assert!(!err.is_not_found());
    }
}
