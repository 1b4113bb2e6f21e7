//! Invoking the managed inference endpoint.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_sagemakerruntime::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_sagemakerruntime::primitives::Blob;
use aws_sdk_sagemakerruntime::Client;
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::wire::{InferenceRequest, InferenceResponse, CONTENT_TYPE_JSON};

/// Synchronous request/response call into a named inference endpoint.
///
/// The endpoint must already be in service; callers do not wait for it.
#[async_trait]
pub trait EndpointInvoker: Send + Sync {
    /// Send one generation request and return the decoded response.
    async fn invoke(
        &self,
        endpoint_name: &str,
        request: &InferenceRequest,
    ) -> CoreResult<InferenceResponse>;
}

/// [`EndpointInvoker`] backed by the SageMaker runtime API.
#[derive(Debug, Clone)]
pub struct SageMakerRuntimeInvoker {
    client: Client,
}

impl SageMakerRuntimeInvoker {
    /// Create an invoker from a shared SDK configuration.
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
}

#[async_trait]
impl EndpointInvoker for SageMakerRuntimeInvoker {
    async fn invoke(
        &self,
        endpoint_name: &str,
        request: &InferenceRequest,
    ) -> CoreResult<InferenceResponse> {
        let body = serde_json::to_vec(request)?;
        debug!(endpoint = %endpoint_name, bytes = body.len(), "invoking endpoint");

        let output = self
            .client
            .invoke_endpoint()
            .endpoint_name(endpoint_name)
            .content_type(CONTENT_TYPE_JSON)
            .accept(CONTENT_TYPE_JSON)
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| {
                let message = match e.message() {
                    Some(message) => format!("{}: {message}", e.code().unwrap_or("unknown")),
                    None => DisplayErrorContext(&e).to_string(),
                };
                CoreError::invoke(endpoint_name, message)
            })?;

        let payload = output
            .body()
            .map(|blob| blob.as_ref().to_vec())
            .unwrap_or_default();

        decode_response(&payload)
    }
}

/// Decode a raw endpoint response body.
pub fn decode_response(payload: &[u8]) -> CoreResult<InferenceResponse> {
    serde_json::from_slice(payload).map_err(|e| CoreError::Decode(e.to_string()))
}
