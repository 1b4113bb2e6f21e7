//! Configuration for llmops-chat.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::error::{ChatError, ChatResult};

/// Top-level configuration for the chat server.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub server: ServerSettings,

    /// Which endpoint answers the prompts.
    pub endpoint: EndpointSettings,
}

impl ChatConfig {
    /// Load configuration from the default sources.
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. `chat.toml` in the current directory (if present)
    /// 2. `SAGEMAKER_ENDPOINT_NAME` and `AWS_REGION`
    /// 3. Environment variables with `LLMOPS_CHAT_` prefix (`__` separates sections)
    pub fn load() -> ChatResult<Self> {
        Self::from_figment(Figment::new().merge(Toml::file("chat.toml")))
    }

    /// Load configuration from a specific TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ChatResult<Self> {
        Self::from_figment(Figment::new().merge(Toml::file(path.as_ref())))
    }

    fn from_figment(figment: Figment) -> ChatResult<Self> {
        let config: Self = figment
            .merge(
                Env::raw()
                    .only(&["SAGEMAKER_ENDPOINT_NAME"])
                    .map(|_| "endpoint.name".into()),
            )
            .merge(
                Env::raw()
                    .only(&["AWS_REGION"])
                    .map(|_| "endpoint.region".into()),
            )
            .merge(Env::prefixed("LLMOPS_CHAT_").split("__"))
            .extract()
            .map_err(|e| ChatError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ChatResult<()> {
        if self.endpoint.name.trim().is_empty() {
            return Err(ChatError::config("endpoint.name must not be empty"));
        }
        Ok(())
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 7860)
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Endpoint settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointSettings {
    /// Endpoint name.
    pub name: String,

    /// Region override; the SDK default chain applies when unset.
    #[serde(default)]
    pub region: Option<String>,
}
