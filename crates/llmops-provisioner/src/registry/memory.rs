//! In-memory registry for tests and dry runs.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{RegistryError, RegistryResult};
use crate::types::{EndpointStatus, ResourceDescription, ResourceKind, ResourceSpec};

use super::ResourceRegistry;

/// A call received by a [`MemoryRegistry`], in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Create(ResourceKind, String),
    Delete(ResourceKind, String),
    Describe(ResourceKind, String),
}

#[derive(Debug, Clone)]
struct StoredResource {
    spec: ResourceSpec,
    /// Statuses handed out by successive describes; the last one sticks,
    /// except while deleting, where running out means the resource is gone.
    statuses: VecDeque<EndpointStatus>,
    deleting: bool,
}

#[derive(Debug)]
struct Inner {
    resources: HashMap<(ResourceKind, String), StoredResource>,
    denied: HashSet<(ResourceKind, String)>,
    endpoint_script: Vec<EndpointStatus>,
    deletion_script: Vec<EndpointStatus>,
    failure_reason: Option<String>,
    operations: Vec<Operation>,
}

impl Default for Inner {
    fn default() -> Self {
        Self {
            resources: HashMap::new(),
            denied: HashSet::new(),
            endpoint_script: vec![EndpointStatus::Creating, EndpointStatus::InService],
            deletion_script: Vec::new(),
            failure_reason: None,
            operations: Vec::new(),
        }
    }
}

/// In-memory registry that mimics the managed service's rules: names are
/// unique per kind, references are checked on create, and endpoints walk
/// through a scripted sequence of statuses.
///
/// Data is lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    inner: RwLock<Inner>,
}

impl MemoryRegistry {
    /// Create an empty registry. New endpoints report `Creating` once, then
    /// `InService`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the statuses a newly created endpoint reports on successive
    /// describes.
    #[must_use]
    pub fn with_endpoint_statuses(self, statuses: Vec<EndpointStatus>) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            inner.endpoint_script = statuses;
        }
        self
    }

    /// Set the statuses a deleted endpoint reports before it disappears.
    /// Empty (the default) removes endpoints immediately.
    #[must_use]
    pub fn with_deletion_statuses(self, statuses: Vec<EndpointStatus>) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            inner.deletion_script = statuses;
        }
        self
    }

    /// Failure reason reported alongside a `Failed` status.
    #[must_use]
    pub fn with_failure_reason(self, reason: impl Into<String>) -> Self {
        if let Ok(mut inner) = self.inner.write() {
            inner.failure_reason = Some(reason.into());
        }
        self
    }

    /// Refuse every operation on this resource with an access-denied error.
    pub fn deny(&self, kind: ResourceKind, name: &str) -> RegistryResult<()> {
        self.write()?.denied.insert((kind, name.to_owned()));
        Ok(())
    }

    /// Seed a resource as if a previous run had created it.
    pub fn insert(&self, name: &str, spec: ResourceSpec) -> RegistryResult<()> {
        let mut inner = self.write()?;
        let statuses = initial_statuses(&spec, &inner.endpoint_script);
        inner
            .resources
            .insert(
                (spec.kind(), name.to_owned()),
                StoredResource {
                    spec,
                    statuses,
                    deleting: false,
                },
            );
        Ok(())
    }

    /// Whether a resource exists.
    pub fn contains(&self, kind: ResourceKind, name: &str) -> RegistryResult<bool> {
        Ok(self.read()?.resources.contains_key(&(kind, name.to_owned())))
    }

    /// Number of resources of one kind.
    pub fn count(&self, kind: ResourceKind) -> RegistryResult<usize> {
        Ok(self
            .read()?
            .resources
            .keys()
            .filter(|(k, _)| *k == kind)
            .count())
    }

    /// Every call received so far.
    pub fn operations(&self) -> RegistryResult<Vec<Operation>> {
        Ok(self.read()?.operations.clone())
    }

    fn read(&self) -> RegistryResult<std::sync::RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| RegistryError::Transport("lock poisoned".to_owned()))
    }

    fn write(&self) -> RegistryResult<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| RegistryError::Transport("lock poisoned".to_owned()))
    }
}

fn initial_statuses(spec: &ResourceSpec, script: &[EndpointStatus]) -> VecDeque<EndpointStatus> {
    match spec {
        ResourceSpec::Endpoint(_) => script.iter().cloned().collect(),
        ResourceSpec::Model(_) | ResourceSpec::EndpointConfig(_) => VecDeque::new(),
    }
}

fn access_denied(kind: ResourceKind, name: &str) -> RegistryError {
    RegistryError::AccessDenied {
        kind,
        name: name.to_owned(),
        message: format!("not authorized to act on {kind} {name}"),
    }
}

fn missing_reference(
    kind: ResourceKind,
    name: &str,
    referenced: ResourceKind,
    target: &str,
) -> RegistryError {
    RegistryError::rejected(
        kind,
        name,
        "ValidationException",
        format!("Could not find {referenced} \"{target}\"."),
    )
}

#[async_trait]
impl ResourceRegistry for MemoryRegistry {
    async fn create(&self, name: &str, spec: &ResourceSpec) -> RegistryResult<()> {
        let kind = spec.kind();
        let mut inner = self.write()?;
        inner.operations.push(Operation::Create(kind, name.to_owned()));

        let key = (kind, name.to_owned());
        if inner.denied.contains(&key) {
            return Err(access_denied(kind, name));
        }
        if inner.resources.contains_key(&key) {
            return Err(RegistryError::rejected(
                kind,
                name,
                "ValidationException",
                format!("Cannot create already existing {kind} \"{name}\"."),
            ));
        }

        match spec {
            ResourceSpec::Model(_) => {}
            ResourceSpec::EndpointConfig(config) => {
                for variant in &config.variants {
                    let model_key = (ResourceKind::Model, variant.model_name.clone());
                    if !inner.resources.contains_key(&model_key) {
                        return Err(missing_reference(
                            kind,
                            name,
                            ResourceKind::Model,
                            &variant.model_name,
                        ));
                    }
                }
            }
            ResourceSpec::Endpoint(endpoint) => {
                let config_key = (
                    ResourceKind::EndpointConfig,
                    endpoint.endpoint_config_name.clone(),
                );
                if !inner.resources.contains_key(&config_key) {
                    return Err(missing_reference(
                        kind,
                        name,
                        ResourceKind::EndpointConfig,
                        &endpoint.endpoint_config_name,
                    ));
                }
            }
        }

        let statuses = initial_statuses(spec, &inner.endpoint_script);
        inner.resources.insert(
            key,
            StoredResource {
                spec: spec.clone(),
                statuses,
                deleting: false,
            },
        );
        Ok(())
    }

    async fn delete(&self, kind: ResourceKind, name: &str) -> RegistryResult<()> {
        let mut inner = self.write()?;
        inner.operations.push(Operation::Delete(kind, name.to_owned()));

        let key = (kind, name.to_owned());
        if inner.denied.contains(&key) {
            return Err(access_denied(kind, name));
        }
        let script = inner.deletion_script.clone();
        match inner.resources.get_mut(&key) {
            None => Err(RegistryError::not_found(kind, name)),
            Some(stored) if kind == ResourceKind::Endpoint && !script.is_empty() => {
                if !stored.deleting {
                    stored.deleting = true;
                    stored.statuses = script.into_iter().collect();
                }
                Ok(())
            }
            Some(_) => {
                inner.resources.remove(&key);
                Ok(())
            }
        }
    }

    async fn describe(
        &self,
        kind: ResourceKind,
        name: &str,
    ) -> RegistryResult<ResourceDescription> {
        let mut inner = self.write()?;
        inner
            .operations
            .push(Operation::Describe(kind, name.to_owned()));

        let key = (kind, name.to_owned());
        if inner.denied.contains(&key) {
            return Err(access_denied(kind, name));
        }

        let failure_reason = inner.failure_reason.clone();
        let stored = inner
            .resources
            .get_mut(&key)
            .ok_or_else(|| RegistryError::not_found(kind, name))?;

        if stored.deleting && stored.statuses.is_empty() {
            inner.resources.remove(&key);
            return Err(RegistryError::not_found(kind, name));
        }

        let status = if stored.deleting || stored.statuses.len() > 1 {
            stored.statuses.pop_front()
        } else {
            stored.statuses.front().cloned()
        };
        let failure_reason = match status {
            Some(EndpointStatus::Failed) => failure_reason,
            _ => None,
        };

        Ok(ResourceDescription {
            kind,
            name: name.to_owned(),
            spec: stored.spec.clone(),
            status,
            failure_reason,
        })
    }
}
