//! Test fixtures for provisioner integration tests.

use std::collections::BTreeMap;

use llmops_provisioner::{
    DeployConfig, EndpointConfigSpec, EndpointSpec, ModelSpec, ProductionVariant, ResourceSpec,
};

/// Model spec pointing at the given artifact.
pub fn model(artifact: &str) -> ResourceSpec {
    ResourceSpec::Model(ModelSpec {
        image: "123456789012.dkr.ecr.ca-central-1.amazonaws.com/stablelm-inference:latest"
            .to_owned(),
        model_data_url: artifact.to_owned(),
        execution_role_arn: "arn:aws:iam::123456789012:role/LLMSageMakerExecutionRole".to_owned(),
        environment: BTreeMap::from([("HF_HOME".to_owned(), "/tmp/huggingface".to_owned())]),
    })
}

/// Single-variant endpoint configuration serving `model_name`.
pub fn endpoint_config(model_name: &str) -> ResourceSpec {
    ResourceSpec::EndpointConfig(EndpointConfigSpec {
        variants: vec![ProductionVariant {
            variant_name: "AllTraffic".to_owned(),
            model_name: model_name.to_owned(),
            instance_type: "ml.g5.xlarge".to_owned(),
            initial_instance_count: 1,
        }],
    })
}

/// Endpoint serving `config_name`.
pub fn endpoint(config_name: &str) -> ResourceSpec {
    ResourceSpec::Endpoint(EndpointSpec {
        endpoint_config_name: config_name.to_owned(),
    })
}

/// Deployment configuration naming `m`, `cfg` and `ep`.
pub fn deploy_config() -> DeployConfig {
    let config: DeployConfig = toml::from_str(
        r#"
        registry = "memory"

        [aws]
        region = "ca-central-1"
        account_id = "123456789012"

        [model]
        name = "m"
        image_uri = "123456789012.dkr.ecr.ca-central-1.amazonaws.com/stablelm-inference:latest"
        model_data_url = "s3://models/stablelm-3b-model.tar.gz"
        execution_role_arn = "arn:aws:iam::123456789012:role/LLMSageMakerExecutionRole"

        [endpoint_config]
        name = "cfg"

        [endpoint]
        name = "ep"

        [readiness]
        poll_interval_secs = 30
        timeout_secs = 300
        "#,
    )
    .unwrap();
    config.validate().unwrap();
    config
}
