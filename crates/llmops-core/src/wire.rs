//! Wire contract with the served model.
//!
//! Requests carry a prompt under `inputs` and, optionally, generation
//! parameters. Parameters may be flat at the top level (the shape the
//! clinical-summary handler sends) or nested under `parameters`; when both are
//! present the nested value wins.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// The only content type accepted or produced on either side of the wire.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Request body sent to the inference endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    /// Prompt text.
    pub inputs: String,

    /// Nested generation parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<GenerationOverrides>,

    /// Flat generation parameters.
    #[serde(flatten)]
    pub overrides: GenerationOverrides,
}

impl InferenceRequest {
    /// Create a request with no parameter overrides.
    #[must_use]
    pub fn new(inputs: impl Into<String>) -> Self {
        Self {
            inputs: inputs.into(),
            parameters: None,
            overrides: GenerationOverrides::default(),
        }
    }

    /// Set flat parameter overrides.
    #[must_use]
    pub fn with_overrides(mut self, overrides: GenerationOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Parameters requested by the caller, nested values taking precedence.
    #[must_use]
    pub fn effective_overrides(&self) -> GenerationOverrides {
        match &self.parameters {
            Some(nested) => nested.or(&self.overrides),
            None => self.overrides.clone(),
        }
    }
}

/// Response body returned by the inference endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceResponse {
    /// Generated text.
    pub generated_text: String,
}

/// Per-request generation settings. Unset fields fall back to the server's
/// static configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_sample: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,
}

impl GenerationOverrides {
    /// Field-wise merge: values set on `self` win, gaps are filled from `other`.
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        Self {
            max_new_tokens: self.max_new_tokens.or(other.max_new_tokens),
            do_sample: self.do_sample.or(other.do_sample),
            top_p: self.top_p.or(other.top_p),
            temperature: self.temperature.or(other.temperature),
            repetition_penalty: self.repetition_penalty.or(other.repetition_penalty),
        }
    }

    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Fully resolved generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,
    #[serde(default = "default_do_sample")]
    pub do_sample: bool,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,
}

const fn default_max_new_tokens() -> u32 {
    256
}

const fn default_do_sample() -> bool {
    true
}

const fn default_top_p() -> f32 {
    0.9
}

const fn default_temperature() -> f32 {
    0.6
}

const fn default_repetition_penalty() -> f32 {
    1.2
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            max_new_tokens: default_max_new_tokens(),
            do_sample: default_do_sample(),
            top_p: default_top_p(),
            temperature: default_temperature(),
            repetition_penalty: default_repetition_penalty(),
        }
    }
}

impl GenerationParameters {
    /// Apply request overrides on top of these settings.
    #[must_use]
    pub fn apply(&self, overrides: &GenerationOverrides) -> Self {
        Self {
            max_new_tokens: overrides.max_new_tokens.unwrap_or(self.max_new_tokens),
            do_sample: overrides.do_sample.unwrap_or(self.do_sample),
            top_p: overrides.top_p.unwrap_or(self.top_p),
            temperature: overrides.temperature.unwrap_or(self.temperature),
            repetition_penalty: overrides
                .repetition_penalty
                .unwrap_or(self.repetition_penalty),
        }
    }

    /// Reject values the generation engine cannot honour.
    pub fn validate(&self, max_new_tokens_limit: u32) -> CoreResult<()> {
        if self.max_new_tokens == 0 || self.max_new_tokens > max_new_tokens_limit {
            return Err(CoreError::invalid_parameter(format!(
                "max_new_tokens must be between 1 and {max_new_tokens_limit}, got {}",
                self.max_new_tokens
            )));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(CoreError::invalid_parameter(format!(
                "top_p must be in (0, 1], got {}",
                self.top_p
            )));
        }
        if !(self.temperature > 0.0 && self.temperature.is_finite()) {
            return Err(CoreError::invalid_parameter(format!(
                "temperature must be positive, got {}",
                self.temperature
            )));
        }
        if !(self.repetition_penalty > 0.0 && self.repetition_penalty.is_finite()) {
            return Err(CoreError::invalid_parameter(format!(
                "repetition_penalty must be positive, got {}",
                self.repetition_penalty
            )));
        }
        Ok(())
    }
}
