//! Configuration for llmops-inference.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use llmops_core::GenerationParameters;
use serde::Deserialize;

use crate::error::{InferenceError, InferenceResult};

/// Top-level configuration for the serving container.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InferenceConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Which generator to load and where its weights live.
    #[serde(default)]
    pub model: ModelSettings,

    /// Generation defaults applied when a request leaves a parameter unset.
    #[serde(default)]
    pub generation: GenerationParameters,

    /// Request limits.
    #[serde(default)]
    pub limits: LimitSettings,
}

impl InferenceConfig {
    /// Load configuration from the default sources.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. `inference.toml` in the current directory (if present)
    /// 2. Environment variables with `LLMOPS_INFERENCE_` prefix (`__` separates sections)
    pub fn load() -> InferenceResult<Self> {
        Self::from_figment(Figment::new().merge(Toml::file("inference.toml")))
    }

    /// Load configuration from a specific TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> InferenceResult<Self> {
        Self::from_figment(Figment::new().merge(Toml::file(path.as_ref())))
    }

    fn from_figment(figment: Figment) -> InferenceResult<Self> {
        let config: Self = figment
            .merge(Env::prefixed("LLMOPS_INFERENCE_").split("__"))
            .extract()
            .map_err(|e| InferenceError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the server cannot run with.
    pub fn validate(&self) -> InferenceResult<()> {
        self.generation
            .validate(self.limits.max_new_tokens)
            .map_err(|e| InferenceError::config(format!("generation defaults: {e}")))?;
        if self.limits.max_body_bytes == 0 {
            return Err(InferenceError::config("limits.max_body_bytes must be positive"));
        }
        if self.model.health_poll_interval_ms == 0 {
            return Err(InferenceError::config(
                "model.health_poll_interval_ms must be positive",
            ));
        }
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Address to listen on. The managed-container contract fixes port 8080.
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080)
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Type of generator backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorType {
    /// Text-generation engine running beside this server.
    #[default]
    Http,

    /// Deterministic local backend that repeats the prompt.
    Echo,
}

/// Model and generator settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSettings {
    /// Backend to use.
    #[serde(default)]
    pub backend: GeneratorType,

    /// Directory the platform unpacks the model artifact into.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Base URL of the text-generation engine.
    #[serde(default = "default_engine_url")]
    pub engine_url: String,

    /// How long to wait for the engine to report healthy.
    #[serde(default = "default_load_timeout_secs")]
    pub load_timeout_secs: u64,

    /// Delay between engine health probes while loading.
    #[serde(default = "default_health_poll_interval_ms")]
    pub health_poll_interval_ms: u64,

    /// Per-request timeout for generation calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("/opt/ml/model")
}

fn default_engine_url() -> String {
    "http://127.0.0.1:8081".to_owned()
}

const fn default_load_timeout_secs() -> u64 {
    900
}

const fn default_health_poll_interval_ms() -> u64 {
    1000
}

const fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            backend: GeneratorType::default(),
            model_dir: default_model_dir(),
            engine_url: default_engine_url(),
            load_timeout_secs: default_load_timeout_secs(),
            health_poll_interval_ms: default_health_poll_interval_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ModelSettings {
    /// Load timeout as a duration.
    #[must_use]
    pub const fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    /// Health probe interval as a duration.
    #[must_use]
    pub const fn health_poll_interval(&self) -> Duration {
        Duration::from_millis(self.health_poll_interval_ms)
    }

    /// Request timeout as a duration.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitSettings {
    /// Largest accepted request body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Upper bound on `max_new_tokens` per request.
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
}

const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

const fn default_max_new_tokens() -> u32 {
    2048
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_body_bytes: default_max_body_bytes(),
            max_new_tokens: default_max_new_tokens(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_container_contract() {
        let config = InferenceConfig::default();
        assert_eq!(config.server.bind_address.port(), 8080);
        assert_eq!(config.model.backend, GeneratorType::Http);
        assert_eq!(config.model.model_dir, PathBuf::from("/opt/ml/model"));
        assert_eq!(config.generation.max_new_tokens, 256);
        assert!(config.generation.do_sample);
        assert!((config.generation.temperature - 0.6).abs() < f32::EPSILON);
        config.validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config: InferenceConfig = toml::from_str(
            r#"
            [model]
            backend = "echo"

            [generation]
            temperature = 0.8
            "#,
        )
        .unwrap();
        assert_eq!(config.model.backend, GeneratorType::Echo);
        assert!((config.generation.temperature - 0.8).abs() < f32::EPSILON);
        assert!((config.generation.top_p - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.limits.max_new_tokens, 2048);
    }

    #[test]
    fn default_above_limit_is_rejected() {
        let mut config = InferenceConfig::default();
        config.generation.max_new_tokens = 10_000;
        assert!(config.validate().is_err());
    }

    #[test]
    fn environment_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "inference.toml",
                r#"
                [server]
                bind_address = "127.0.0.1:9000"
                "#,
            )?;
            jail.set_env("LLMOPS_INFERENCE_MODEL__BACKEND", "echo");
            jail.set_env("LLMOPS_INFERENCE_GENERATION__MAX_NEW_TOKENS", "64");

            let config = InferenceConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.server.bind_address.port(), 9000);
            assert_eq!(config.model.backend, GeneratorType::Echo);
            assert_eq!(config.generation.max_new_tokens, 64);
            Ok(())
        });
    }
}
