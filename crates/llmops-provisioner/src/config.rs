//! Configuration for llmops-provisioner.
//!
//! Every identifier the pipeline touches (names, image, artifact, role,
//! region, account) comes from here. The keys without defaults are required:
//! loading fails at startup when any is missing or malformed.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Deserializer};

use crate::error::{ProvisionError, ProvisionResult};

/// Top-level configuration for a deployment run.
#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
    /// Target account and region.
    pub aws: AwsSettings,

    /// Which registry backend to drive.
    #[serde(default)]
    pub registry: RegistryType,

    /// Model resource.
    pub model: ModelSettings,

    /// Endpoint configuration resource.
    pub endpoint_config: EndpointConfigSettings,

    /// Endpoint resource.
    pub endpoint: EndpointSettings,

    /// Polling behaviour while waiting on the endpoint.
    #[serde(default)]
    pub readiness: ReadinessSettings,
}

impl DeployConfig {
    /// Load configuration from the default sources.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. `deploy.toml` in the current directory (if present)
    /// 2. Environment variables with `LLMOPS_DEPLOY_` prefix (`__` separates sections)
    pub fn load() -> ProvisionResult<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("deploy.toml"))
                .merge(Env::prefixed("LLMOPS_DEPLOY_").split("__")),
        )
    }

    /// Load configuration from a specific TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ProvisionResult<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file(path.as_ref()))
                .merge(Env::prefixed("LLMOPS_DEPLOY_").split("__")),
        )
    }

    fn from_figment(figment: Figment) -> ProvisionResult<Self> {
        let config: Self = figment
            .extract()
            .map_err(|e| ProvisionError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check required keys and cross-field consistency.
    pub fn validate(&self) -> ProvisionResult<()> {
        require("aws.region", &self.aws.region)?;
        require("model.name", &self.model.name)?;
        require("model.image_uri", &self.model.image_uri)?;
        require("model.model_data_url", &self.model.model_data_url)?;
        require("model.execution_role_arn", &self.model.execution_role_arn)?;
        require("endpoint_config.name", &self.endpoint_config.name)?;
        require("endpoint_config.variant_name", &self.endpoint_config.variant_name)?;
        require("endpoint_config.instance_type", &self.endpoint_config.instance_type)?;
        require("endpoint.name", &self.endpoint.name)?;

        let account_id = &self.aws.account_id;
        if account_id.len() != 12 || !account_id.chars().all(|c| c.is_ascii_digit()) {
            return Err(ProvisionError::config(format!(
                "aws.account_id must be 12 digits, got {account_id:?}"
            )));
        }

        match role_account(&self.model.execution_role_arn) {
            Some(role_account) if role_account == account_id => {}
            Some(role_account) => {
                return Err(ProvisionError::config(format!(
                    "model.execution_role_arn belongs to account {role_account}, expected {account_id}"
                )));
            }
            None => {
                return Err(ProvisionError::config(format!(
                    "model.execution_role_arn is not an IAM role ARN: {}",
                    self.model.execution_role_arn
                )));
            }
        }

        if !self.model.model_data_url.starts_with("s3://") {
            return Err(ProvisionError::config(format!(
                "model.model_data_url must be an s3:// URL, got {}",
                self.model.model_data_url
            )));
        }

        if self.endpoint_config.initial_instance_count == 0 {
            return Err(ProvisionError::config(
                "endpoint_config.initial_instance_count must be at least 1",
            ));
        }

        if self.readiness.poll_interval_secs == 0 {
            return Err(ProvisionError::config(
                "readiness.poll_interval_secs must be positive",
            ));
        }
        if self.readiness.timeout_secs < self.readiness.poll_interval_secs {
            return Err(ProvisionError::config(
                "readiness.timeout_secs must not be shorter than the poll interval",
            ));
        }
        if self.readiness.deletion_timeout_secs < self.readiness.poll_interval_secs {
            return Err(ProvisionError::config(
                "readiness.deletion_timeout_secs must not be shorter than the poll interval",
            ));
        }

        Ok(())
    }
}

fn require(key: &str, value: &str) -> ProvisionResult<()> {
    if value.trim().is_empty() {
        return Err(ProvisionError::config(format!("{key} must not be empty")));
    }
    Ok(())
}

/// Account id embedded in an IAM role ARN (`arn:<partition>:iam::<account>:role/<name>`).
fn role_account(arn: &str) -> Option<&str> {
    let mut parts = arn.splitn(6, ':');
    let (prefix, _partition, service, region, account, resource) = (
        parts.next()?,
        parts.next()?,
        parts.next()?,
        parts.next()?,
        parts.next()?,
        parts.next()?,
    );
    let is_role = prefix == "arn"
        && service == "iam"
        && region.is_empty()
        && resource.len() > "role/".len()
        && resource.starts_with("role/");
    is_role.then_some(account)
}

/// Target account and region.
#[derive(Debug, Clone, Deserialize)]
pub struct AwsSettings {
    /// Region the resources live in.
    pub region: String,

    /// Account the resources live in.
    #[serde(deserialize_with = "deserialize_account_id")]
    pub account_id: String,
}

/// Accepts the account id as a string or, when an environment provider has
/// already parsed it, as a number (leading zeros restored).
fn deserialize_account_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(text) => text,
        Raw::Number(number) => format!("{number:012}"),
    })
}

/// Type of registry backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryType {
    /// SageMaker control plane.
    #[default]
    #[serde(rename = "sagemaker")]
    SageMaker,

    /// In-process registry; nothing leaves the machine.
    Memory,
}

/// Model resource settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    /// Model resource name.
    pub name: String,

    /// Serving container image URI.
    pub image_uri: String,

    /// Packaged model artifact (`s3://...tar.gz`).
    pub model_data_url: String,

    /// Role the serving containers assume.
    pub execution_role_arn: String,

    /// Container environment.
    #[serde(default = "default_container_environment")]
    pub environment: BTreeMap<String, String>,
}

fn default_container_environment() -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "TRANSFORMERS_CACHE".to_owned(),
            "/tmp/huggingface/transformers".to_owned(),
        ),
        ("HF_HOME".to_owned(), "/tmp/huggingface".to_owned()),
    ])
}

/// Endpoint configuration resource settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfigSettings {
    /// Endpoint configuration resource name.
    pub name: String,

    /// Name of the single production variant.
    #[serde(default = "default_variant_name")]
    pub variant_name: String,

    /// Compute instance type.
    #[serde(default = "default_instance_type")]
    pub instance_type: String,

    /// Instances to start with.
    #[serde(default = "default_initial_instance_count")]
    pub initial_instance_count: u32,
}

fn default_variant_name() -> String {
    "AllTraffic".to_owned()
}

fn default_instance_type() -> String {
    "ml.g5.xlarge".to_owned()
}

const fn default_initial_instance_count() -> u32 {
    1
}

/// Endpoint resource settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointSettings {
    /// Endpoint resource name.
    pub name: String,
}

/// Readiness and deletion polling.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadinessSettings {
    /// Seconds between status polls.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Seconds to wait for the endpoint to come into service.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Seconds to wait for a deleted endpoint to disappear.
    #[serde(default = "default_deletion_timeout_secs")]
    pub deletion_timeout_secs: u64,
}

const fn default_poll_interval_secs() -> u64 {
    30
}

const fn default_timeout_secs() -> u64 {
    3600
}

const fn default_deletion_timeout_secs() -> u64 {
    600
}

impl Default for ReadinessSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            timeout_secs: default_timeout_secs(),
            deletion_timeout_secs: default_deletion_timeout_secs(),
        }
    }
}

impl ReadinessSettings {
    /// Poll interval as a duration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Readiness timeout as a duration.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Deletion timeout as a duration.
    #[must_use]
    pub const fn deletion_timeout(&self) -> Duration {
        Duration::from_secs(self.deletion_timeout_secs)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        [aws]
        region = "ca-central-1"
        account_id = "123456789012"

        [model]
        name = "stablelm-3b-model"
        image_uri = "123456789012.dkr.ecr.ca-central-1.amazonaws.com/stablelm-inference:latest"
        model_data_url = "s3://models/stablelm-3b/stablelm-3b-model.tar.gz"
        execution_role_arn = "arn:aws:iam::123456789012:role/LLMSageMakerExecutionRole"

        [endpoint_config]
        name = "stablelm-3b-config"

        [endpoint]
        name = "stablelm-3b-endpoint"
    "#;

    #[test]
    fn config_from_toml_applies_defaults() {
        let config: DeployConfig = toml::from_str(FULL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.registry, RegistryType::SageMaker);
        assert_eq!(config.endpoint_config.variant_name, "AllTraffic");
        assert_eq!(config.endpoint_config.instance_type, "ml.g5.xlarge");
        assert_eq!(config.endpoint_config.initial_instance_count, 1);
        assert_eq!(config.readiness.poll_interval(), Duration::from_secs(30));
        assert_eq!(
            config.model.environment.get("HF_HOME").map(String::as_str),
            Some("/tmp/huggingface")
        );
    }

    #[test]
    fn missing_required_key_fails_to_parse() {
        let without_role = FULL.replace(
            "execution_role_arn = \"arn:aws:iam::123456789012:role/LLMSageMakerExecutionRole\"",
            "",
        );
        assert!(toml::from_str::<DeployConfig>(&without_role).is_err());
    }

    #[test]
    fn role_in_other_account_is_rejected() {
        let mut config: DeployConfig = toml::from_str(FULL).unwrap();
        config.model.execution_role_arn = "arn:aws:iam::999999999999:role/Other".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("999999999999"));
    }

    #[test]
    fn empty_name_is_rejected() {
        let mut config: DeployConfig = toml::from_str(FULL).unwrap();
        config.endpoint.name = "  ".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("endpoint.name"));
    }

    #[test]
    fn deletion_timeout_must_cover_a_poll() {
        let mut config: DeployConfig = toml::from_str(FULL).unwrap();
        config.readiness.deletion_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("readiness.deletion_timeout_secs"));

        config.readiness.deletion_timeout_secs = config.readiness.poll_interval_secs;
        config.validate().unwrap();
    }

    #[test]
    fn non_s3_artifact_is_rejected() {
        let mut config: DeployConfig = toml::from_str(FULL).unwrap();
        config.model.model_data_url = "https://example.com/model.tar.gz".to_owned();
        assert!(config.validate().is_err());
    }

    #[test]
    fn role_account_parses_iam_role_arns() {
        assert_eq!(
            role_account("arn:aws:iam::123456789012:role/Exec"),
            Some("123456789012")
        );
        assert_eq!(
            role_account("arn:aws-cn:iam::123456789012:role/path/Exec"),
            Some("123456789012")
        );
        assert_eq!(role_account("arn:aws:iam::123456789012:user/Exec"), None);
        assert_eq!(role_account("not-an-arn"), None);
    }

    #[test]
    fn numeric_account_id_keeps_leading_zeros() {
        let toml = FULL.replace("account_id = \"123456789012\"", "account_id = 12345678901");
        let aws: DeployConfig = toml::from_str(&toml).unwrap();
        assert_eq!(aws.aws.account_id, "012345678901");
    }

    #[test]
    fn environment_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("deploy.toml", FULL)?;
            jail.set_env("LLMOPS_DEPLOY_ENDPOINT__NAME", "override-endpoint");
            jail.set_env("LLMOPS_DEPLOY_REGISTRY", "memory");

            let config = DeployConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.endpoint.name, "override-endpoint");
            assert_eq!(config.registry, RegistryType::Memory);
            Ok(())
        });
    }

    #[test]
    fn load_without_file_reports_missing_keys() {
        figment::Jail::expect_with(|_jail| {
            let err = DeployConfig::load().unwrap_err();
            assert!(matches!(err, ProvisionError::Config(_)));
            Ok(())
        });
    }
}
