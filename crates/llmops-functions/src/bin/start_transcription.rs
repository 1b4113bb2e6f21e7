//! Function entry point: start a transcription job for an uploaded recording.

use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, Value};
use tracing::error;

use llmops_core::aws::load_sdk_config;
use llmops_functions::transcription::start_transcription;
use llmops_functions::{init_tracing, ObjectCreatedEvent, TranscribeClient, TranscriptionConfig};

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = TranscriptionConfig::from_env()?;
    let sdk_config = load_sdk_config(None).await;
    let service = TranscribeClient::new(&sdk_config);

    let config = &config;
    let service = &service;
    lambda_runtime::run(service_fn(move |event: LambdaEvent<ObjectCreatedEvent>| async move {
        let job = start_transcription(&event.payload, config, service)
            .await
            .inspect_err(|e| error!(error = %e, "transcription not started"))?;
        Ok::<Value, Error>(json!({
            "statusCode": 200,
            "job_name": job.map(|job| job.job_name),
        }))
    }))
    .await
}
