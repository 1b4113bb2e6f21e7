//! Client for the text-generation engine running beside the server.
//!
//! The engine serves the unpacked model weights and exposes `GET /health`
//! and `POST /generate` (`{"inputs", "parameters"}` in,
//! `{"generated_text"}` out).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use llmops_core::{GenerationParameters, InferenceResponse};
use reqwest::Client;
use serde::Serialize;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use crate::config::ModelSettings;
use crate::error::{InferenceError, InferenceResult};

use super::{ModelLoader, TextGenerator};

/// Waits for the engine to finish loading the model.
#[derive(Debug, Clone)]
pub struct HttpLoader {
    client: Client,
    base_url: String,
    model_dir: PathBuf,
    load_timeout: Duration,
    poll_interval: Duration,
}

impl HttpLoader {
    /// Create a loader from model settings.
    pub fn new(settings: &ModelSettings) -> InferenceResult<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(InferenceError::Engine)?;

        Ok(Self {
            client,
            base_url: settings.engine_url.trim_end_matches('/').to_owned(),
            model_dir: settings.model_dir.clone(),
            load_timeout: settings.load_timeout(),
            poll_interval: settings.health_poll_interval(),
        })
    }

    async fn engine_healthy(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, "engine not reachable yet");
                false
            }
        }
    }
}

#[async_trait]
impl ModelLoader for HttpLoader {
    async fn load(self: Box<Self>) -> InferenceResult<Arc<dyn TextGenerator>> {
        let metadata = tokio::fs::metadata(&self.model_dir).await.map_err(|e| {
            InferenceError::ModelLoadFailed(format!(
                "model directory {} unavailable: {e}",
                self.model_dir.display()
            ))
        })?;
        if !metadata.is_dir() {
            return Err(InferenceError::ModelLoadFailed(format!(
                "{} is not a directory",
                self.model_dir.display()
            )));
        }

        info!(
            model_dir = %self.model_dir.display(),
            engine = %self.base_url,
            "waiting for generation engine"
        );

        let deadline = Instant::now() + self.load_timeout;
        while !self.engine_healthy().await {
            if Instant::now() >= deadline {
                return Err(InferenceError::ModelLoadFailed(format!(
                    "engine at {} not healthy after {}s",
                    self.base_url,
                    self.load_timeout.as_secs()
                )));
            }
            sleep(self.poll_interval).await;
        }

        Ok(Arc::new(HttpGenerator {
            client: self.client.clone(),
            generate_url: format!("{}/generate", self.base_url),
        }))
    }
}

/// Forwards generation calls to the engine.
#[derive(Debug, Clone)]
pub struct HttpGenerator {
    client: Client,
    generate_url: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    inputs: &'a str,
    parameters: &'a GenerationParameters,
}

#[async_trait]
impl TextGenerator for HttpGenerator {
    async fn generate(
        &self,
        prompt: &str,
        parameters: &GenerationParameters,
    ) -> InferenceResult<String> {
        let response = self
            .client
            .post(&self.generate_url)
            .json(&GenerateRequest {
                inputs: prompt,
                parameters,
            })
            .send()
            .await
            .map_err(InferenceError::Engine)?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(InferenceError::generation(format!(
                "engine returned {status}: {detail}"
            )));
        }

        let body: InferenceResponse = response.json().await.map_err(InferenceError::Engine)?;
        Ok(body.generated_text)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn request_nests_parameters() {
        let parameters = GenerationParameters::default();
        let body = serde_json::to_value(GenerateRequest {
            inputs: "hello",
            parameters: &parameters,
        })
        .unwrap();
        assert_eq!(body["inputs"], "hello");
        assert_eq!(body["parameters"]["max_new_tokens"], 256);
        assert_eq!(body["parameters"]["do_sample"], true);
    }

    #[tokio::test]
    async fn missing_model_dir_fails_load() {
        let settings = ModelSettings {
            model_dir: PathBuf::from("/nonexistent/model/dir"),
            ..ModelSettings::default()
        };
        let loader = Box::new(HttpLoader::new(&settings).unwrap());
        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, InferenceError::ModelLoadFailed(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let settings = ModelSettings {
            engine_url: "http://localhost:8081/".to_owned(),
            ..ModelSettings::default()
        };
        let loader = HttpLoader::new(&settings).unwrap();
        assert_eq!(loader.base_url, "http://localhost:8081");
    }
}
