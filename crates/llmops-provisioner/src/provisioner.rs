//! Idempotent replacement of named singleton resources.
//!
//! Each call to [`Provisioner::provision`] runs delete-if-exists, then
//! create, then (for endpoints) waits for the endpoint to come into service.
//! Calls are strictly sequential and nothing is retried.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::ReadinessSettings;
use crate::error::{ProvisionError, ProvisionResult};
use crate::registry::ResourceRegistry;
use crate::types::{EndpointStatus, ResourceKind, ResourceSpec};

/// How long and how often to poll an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadinessPolicy {
    /// Delay between describes.
    pub poll_interval: Duration,
    /// Upper bound on waiting for `InService`.
    pub timeout: Duration,
    /// Upper bound on waiting for a deleted endpoint to disappear.
    pub deletion_timeout: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self::from(&ReadinessSettings::default())
    }
}

impl From<&ReadinessSettings> for ReadinessPolicy {
    fn from(settings: &ReadinessSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            timeout: settings.timeout(),
            deletion_timeout: settings.deletion_timeout(),
        }
    }
}

/// Result of provisioning one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionOutcome {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource name.
    pub name: String,
    /// Whether a previous resource of the same name was deleted first.
    pub replaced: bool,
    /// Final endpoint status; `None` for kinds without one.
    pub status: Option<EndpointStatus>,
}

/// Drives the replacement protocol against a registry.
#[derive(Clone)]
pub struct Provisioner {
    registry: Arc<dyn ResourceRegistry>,
    policy: ReadinessPolicy,
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Provisioner {
    /// Create a provisioner over a registry.
    #[must_use]
    pub fn new(registry: Arc<dyn ResourceRegistry>, policy: ReadinessPolicy) -> Self {
        Self { registry, policy }
    }

    /// The registry this provisioner drives.
    #[must_use]
    pub fn registry(&self) -> &Arc<dyn ResourceRegistry> {
        &self.registry
    }

    /// The polling policy in use.
    #[must_use]
    pub const fn policy(&self) -> &ReadinessPolicy {
        &self.policy
    }

    /// Replace the resource `name` with one built from `spec`.
    ///
    /// On success exactly one resource of this kind and name exists and was
    /// created from `spec`. Endpoints are additionally `InService`.
    pub async fn provision(
        &self,
        name: &str,
        spec: &ResourceSpec,
    ) -> ProvisionResult<ProvisionOutcome> {
        let kind = spec.kind();
        info!(kind = %kind, name = %name, "provisioning resource");

        let replaced = self.remove_existing(kind, name).await?;
        if replaced && kind == ResourceKind::Endpoint {
            self.wait_deleted(name).await?;
        }

        info!(kind = %kind, name = %name, "creating resource");
        self.registry
            .create(name, spec)
            .await
            .map_err(|source| ProvisionError::Create {
                kind,
                name: name.to_owned(),
                source,
            })?;

        let status = match kind {
            ResourceKind::Endpoint => Some(self.wait_in_service(name).await?),
            ResourceKind::Model | ResourceKind::EndpointConfig => None,
        };

        info!(kind = %kind, name = %name, replaced, "resource provisioned");
        Ok(ProvisionOutcome {
            kind,
            name: name.to_owned(),
            replaced,
            status,
        })
    }

    /// Delete the resource if it exists.
    ///
    /// Returns `true` when something was deleted and `false` when nothing by
    /// that name existed. Any other registry error is returned.
    pub async fn remove_existing(&self, kind: ResourceKind, name: &str) -> ProvisionResult<bool> {
        match self.registry.delete(kind, name).await {
            Ok(()) => {
                info!(kind = %kind, name = %name, "deleted existing resource");
                Ok(true)
            }
            Err(err) if err.is_not_found() => {
                debug!(kind = %kind, name = %name, "no existing resource to delete");
                Ok(false)
            }
            Err(source) => {
                warn!(kind = %kind, name = %name, error = %source, "cleanup failed");
                Err(ProvisionError::Cleanup {
                    kind,
                    name: name.to_owned(),
                    source,
                })
            }
        }
    }

    /// Poll until the endpoint is `InService`.
    ///
    /// `Failed` ends the wait with [`ProvisionError::ReadinessFailed`]; running
    /// out of time ends it with [`ProvisionError::ReadinessTimeout`]. A describe
    /// error ends it immediately.
    pub async fn wait_in_service(&self, name: &str) -> ProvisionResult<EndpointStatus> {
        let started = Instant::now();
        let deadline = started + self.policy.timeout;
        let mut last_status = None;

        info!(
            endpoint = %name,
            timeout_secs = self.policy.timeout.as_secs(),
            "waiting for endpoint to come into service"
        );

        loop {
            let description = self
                .registry
                .describe(ResourceKind::Endpoint, name)
                .await
                .map_err(|source| ProvisionError::Describe {
                    kind: ResourceKind::Endpoint,
                    name: name.to_owned(),
                    source,
                })?;

            match description.status {
                Some(EndpointStatus::InService) => {
                    info!(
                        endpoint = %name,
                        elapsed_secs = started.elapsed().as_secs(),
                        "endpoint in service"
                    );
                    return Ok(EndpointStatus::InService);
                }
                Some(EndpointStatus::Failed) => {
                    let reason = description
                        .failure_reason
                        .unwrap_or_else(|| "no failure reason reported".to_owned());
                    warn!(endpoint = %name, reason = %reason, "endpoint failed");
                    return Err(ProvisionError::ReadinessFailed {
                        name: name.to_owned(),
                        status: EndpointStatus::Failed,
                        reason,
                    });
                }
                status => {
                    debug!(
                        endpoint = %name,
                        status = %status.as_ref().map_or("unknown", EndpointStatus::as_str),
                        "endpoint not yet in service"
                    );
                    last_status = status;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ProvisionError::ReadinessTimeout {
                    name: name.to_owned(),
                    waited: now.duration_since(started),
                    last_status,
                });
            }
            sleep(self.policy.poll_interval.min(deadline - now)).await;
        }
    }

    /// Poll until the endpoint no longer exists.
    pub async fn wait_deleted(&self, name: &str) -> ProvisionResult<()> {
        let started = Instant::now();
        let deadline = started + self.policy.deletion_timeout;
        let mut last_status = None;

        loop {
            match self.registry.describe(ResourceKind::Endpoint, name).await {
                Err(err) if err.is_not_found() => {
                    info!(endpoint = %name, "previous endpoint is gone");
                    return Ok(());
                }
                Err(source) => {
                    return Err(ProvisionError::Describe {
                        kind: ResourceKind::Endpoint,
                        name: name.to_owned(),
                        source,
                    });
                }
                Ok(description) => {
                    debug!(
                        endpoint = %name,
                        status = %description.status.as_ref().map_or("unknown", EndpointStatus::as_str),
                        "waiting for previous endpoint to be deleted"
                    );
                    last_status = description.status;
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ProvisionError::DeletionTimeout {
                    name: name.to_owned(),
                    waited: now.duration_since(started),
                    last_status,
                });
            }
            sleep(self.policy.poll_interval.min(deadline - now)).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::{MemoryRegistry, Operation};
    use crate::types::ModelSpec;

    fn policy() -> ReadinessPolicy {
        ReadinessPolicy {
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(60),
            deletion_timeout: Duration::from_secs(30),
        }
    }

    fn model() -> ResourceSpec {
        ResourceSpec::Model(ModelSpec {
            image: "image:latest".to_owned(),
            model_data_url: "s3://bucket/model.tar.gz".to_owned(),
            execution_role_arn: "arn:aws:iam::123456789012:role/Exec".to_owned(),
            environment: Default::default(),
        })
    }

    #[test]
    fn policy_follows_settings() {
        let policy = ReadinessPolicy::default();
        assert_eq!(policy.poll_interval, Duration::from_secs(30));
        assert_eq!(policy.timeout, Duration::from_secs(3600));
        assert_eq!(policy.deletion_timeout, Duration::from_secs(600));
    }

    #[tokio::test]
    async fn fresh_model_is_created_without_replacement() {
        let registry = Arc::new(MemoryRegistry::new());
        let provisioner = Provisioner::new(registry.clone(), policy());

        let outcome = provisioner.provision("m1", &model()).await.unwrap();
        assert!(!outcome.replaced);
        assert_eq!(outcome.status, None);
        assert_eq!(
            registry.operations().unwrap(),
            vec![
                Operation::Delete(ResourceKind::Model, "m1".to_owned()),
                Operation::Create(ResourceKind::Model, "m1".to_owned()),
            ]
        );
    }

    #[tokio::test]
    async fn existing_model_is_replaced() {
        let registry = Arc::new(MemoryRegistry::new());
        registry.insert("m1", model()).unwrap();
        let provisioner = Provisioner::new(registry.clone(), policy());

        let outcome = provisioner.provision("m1", &model()).await.unwrap();
        assert!(outcome.replaced);
        assert_eq!(registry.count(ResourceKind::Model).unwrap(), 1);
    }

    #[tokio::test]
    async fn remove_existing_reports_absence_as_false() {
        let registry = Arc::new(MemoryRegistry::new());
        let provisioner = Provisioner::new(registry, policy());
        assert!(!provisioner
            .remove_existing(ResourceKind::EndpointConfig, "ghost")
            .await
            .unwrap());
    }
}
