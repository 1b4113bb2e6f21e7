//! Shared building blocks for the LLM MLOps services.
//!
//! - [`wire`]: the JSON contract spoken by the served model
//!   (`{"inputs": ...}` in, `{"generated_text": ...}` out)
//! - [`invoke`]: the [`EndpointInvoker`] seam used by every caller of the
//!   managed inference endpoint
//! - [`aws`]: loading an SDK configuration with an optional region override

#![forbid(unsafe_code)]

pub mod aws;
pub mod error;
pub mod invoke;
pub mod wire;

pub use error::{CoreError, CoreResult};
pub use invoke::{EndpointInvoker, SageMakerRuntimeInvoker};
pub use wire::{
    GenerationOverrides, GenerationParameters, InferenceRequest, InferenceResponse,
    CONTENT_TYPE_JSON,
};
