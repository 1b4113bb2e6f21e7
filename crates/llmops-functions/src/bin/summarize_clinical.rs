//! Function entry point: summarize a finished transcript.

use aws_lambda_events::s3::S3Event;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::error;

use llmops_core::aws::load_sdk_config;
use llmops_core::SageMakerRuntimeInvoker;
use llmops_functions::events::first_record_location;
use llmops_functions::summarize::summarize_clinical;
use llmops_functions::{init_tracing, BucketStores, SesNotifier, SummaryConfig};

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = SummaryConfig::from_env()?;
    let sdk_config = load_sdk_config(config.aws_region.as_deref()).await;
    let storage = BucketStores::s3(config.aws_region.clone());
    let invoker = SageMakerRuntimeInvoker::new(&sdk_config);
    let notifier = SesNotifier::new(&sdk_config);

    let (config, storage, invoker, notifier) = (&config, &storage, &invoker, &notifier);
    lambda_runtime::run(service_fn(move |event: LambdaEvent<S3Event>| async move {
        let location = first_record_location(&event.payload)?;
        let response = summarize_clinical(&location, config, storage, invoker, notifier)
            .await
            .inspect_err(|e| error!(uri = %location.uri(), error = %e, "summary failed"))?;
        Ok::<Value, Error>(response)
    }))
    .await
}
