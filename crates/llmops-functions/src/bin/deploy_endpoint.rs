//! Function entry point: deploy the inference endpoint.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::error;

use llmops_functions::deploy::{deploy_endpoint, pipeline_from_env};
use llmops_functions::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let pipeline = pipeline_from_env().await?;

    let pipeline = &pipeline;
    lambda_runtime::run(service_fn(move |_event: LambdaEvent<Value>| async move {
        let response = deploy_endpoint(pipeline)
            .await
            .inspect_err(|e| error!(error = %e, "deployment failed"))?;
        Ok::<Value, Error>(response)
    }))
    .await
}
