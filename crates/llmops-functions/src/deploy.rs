//! Deploy the inference endpoint from a function invocation.

use llmops_provisioner::{
    create_registry, DeployConfig, DeploymentPipeline, DeploymentPlan, Provisioner,
};
use serde_json::{json, Value};
use tracing::info;

use crate::error::FunctionResult;

/// Pipeline for the configuration in `deploy.toml` and `LLMOPS_DEPLOY_*`.
pub async fn pipeline_from_env() -> FunctionResult<DeploymentPipeline> {
    let config = DeployConfig::load()?;
    info!(
        region = %config.aws.region,
        endpoint = %config.endpoint.name,
        "deployment configuration loaded"
    );

    let registry = create_registry(&config).await;
    let provisioner = Provisioner::new(registry, (&config.readiness).into());
    Ok(DeploymentPipeline::new(
        provisioner,
        DeploymentPlan::from_config(&config),
    ))
}

/// Run the pipeline; returns once the endpoint is in service.
pub async fn deploy_endpoint(pipeline: &DeploymentPipeline) -> FunctionResult<Value> {
    let report = pipeline.run().await?;

    for stage in &report.stages {
        info!(
            kind = %stage.kind,
            name = %stage.name,
            replaced = stage.replaced,
            elapsed_secs = stage.elapsed.as_secs_f64(),
            "stage complete"
        );
    }

    Ok(json!({
        "statusCode": 200,
        "body": format!(
            "SageMaker endpoint {} is deployed and ready for inference.",
            report.endpoint_name
        ),
    }))
}
