//! Text generation backends.
//!
//! Loading and generating are split: a [`ModelLoader`] is consumed once at
//! startup and yields the [`TextGenerator`] that serves every request
//! afterwards.

mod echo;
mod http;

pub use echo::{EchoGenerator, EchoLoader};
pub use http::{HttpGenerator, HttpLoader};

use std::sync::Arc;

use async_trait::async_trait;
use llmops_core::GenerationParameters;

use crate::config::{GeneratorType, ModelSettings};
use crate::error::InferenceResult;

/// A loaded model that turns prompts into text.
#[async_trait]
pub trait TextGenerator: Send + Sync + std::fmt::Debug {
    /// Generate a completion for `prompt`.
    async fn generate(
        &self,
        prompt: &str,
        parameters: &GenerationParameters,
    ) -> InferenceResult<String>;
}

/// Prepares a [`TextGenerator`]. Called once per process.
#[async_trait]
pub trait ModelLoader: Send + std::fmt::Debug {
    /// Load the model, returning the generator that serves it.
    async fn load(self: Box<Self>) -> InferenceResult<Arc<dyn TextGenerator>>;
}

/// Create the loader for the configured backend.
pub fn create_loader(settings: &ModelSettings) -> InferenceResult<Box<dyn ModelLoader>> {
    match settings.backend {
        GeneratorType::Http => Ok(Box::new(HttpLoader::new(settings)?)),
        GeneratorType::Echo => Ok(Box::new(EchoLoader)),
    }
}
