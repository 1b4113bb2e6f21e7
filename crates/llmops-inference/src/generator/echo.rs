//! Deterministic generator for development and tests.

use std::sync::Arc;

use async_trait::async_trait;
use llmops_core::GenerationParameters;

use crate::error::InferenceResult;

use super::{ModelLoader, TextGenerator};

/// Loader for [`EchoGenerator`]; always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoLoader;

#[async_trait]
impl ModelLoader for EchoLoader {
    async fn load(self: Box<Self>) -> InferenceResult<Arc<dyn TextGenerator>> {
        Ok(Arc::new(EchoGenerator))
    }
}

/// Repeats the prompt back, one whitespace-separated word per token, up to
/// `max_new_tokens` words.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoGenerator;

#[async_trait]
impl TextGenerator for EchoGenerator {
    async fn generate(
        &self,
        prompt: &str,
        parameters: &GenerationParameters,
    ) -> InferenceResult<String> {
        let limit = usize::try_from(parameters.max_new_tokens).unwrap_or(usize::MAX);
        Ok(prompt
            .split_whitespace()
            .take(limit)
            .collect::<Vec<_>>()
            .join(" "))
    }
}
