//! Handler configuration from the function's environment.
//!
//! Lambda functions get their settings as plain environment variables
//! (`SAGEMAKER_ENDPOINT_NAME`, `SOURCE_EMAIL`, ...), so these are read
//! unprefixed.

use figment::providers::Env;
use figment::Figment;
use serde::Deserialize;

use crate::error::{FunctionError, FunctionResult};

fn extract<T: for<'de> Deserialize<'de>>(keys: &[&str]) -> FunctionResult<T> {
    Figment::from(Env::raw().only(keys))
        .extract()
        .map_err(|e| FunctionError::config(e.to_string()))
}

fn require(key: &str, value: &str) -> FunctionResult<()> {
    if value.trim().is_empty() {
        return Err(FunctionError::config(format!("{key} must not be empty")));
    }
    Ok(())
}

fn require_prefix(key: &str, value: &str) -> FunctionResult<()> {
    require(key, value)?;
    if !value.ends_with('/') {
        return Err(FunctionError::config(format!("{key} must end with '/'")));
    }
    Ok(())
}

/// Settings for the start-transcription handler.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    /// Only objects under this prefix are transcribed.
    #[serde(default = "default_input_prefix")]
    pub input_prefix: String,

    /// Where transcripts are written, in the same bucket.
    #[serde(default = "default_transcripts_prefix")]
    pub transcripts_prefix: String,

    /// Spoken language of the recordings.
    #[serde(default = "default_language_code")]
    pub language_code: String,
}

fn default_input_prefix() -> String {
    "input/".to_owned()
}

fn default_transcripts_prefix() -> String {
    "transcripts/".to_owned()
}

fn default_language_code() -> String {
    "en-US".to_owned()
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            input_prefix: default_input_prefix(),
            transcripts_prefix: default_transcripts_prefix(),
            language_code: default_language_code(),
        }
    }
}

impl TranscriptionConfig {
    /// Read `INPUT_PREFIX`, `TRANSCRIPTS_PREFIX` and `LANGUAGE_CODE`.
    pub fn from_env() -> FunctionResult<Self> {
        let config: Self = extract(&["INPUT_PREFIX", "TRANSCRIPTS_PREFIX", "LANGUAGE_CODE"])?;
        config.validate()?;
        Ok(config)
    }

    /// Check the prefixes and language code.
    pub fn validate(&self) -> FunctionResult<()> {
        require_prefix("INPUT_PREFIX", &self.input_prefix)?;
        require_prefix("TRANSCRIPTS_PREFIX", &self.transcripts_prefix)?;
        require("LANGUAGE_CODE", &self.language_code)?;
        if self.input_prefix == self.transcripts_prefix {
            return Err(FunctionError::config(
                "INPUT_PREFIX and TRANSCRIPTS_PREFIX must differ",
            ));
        }
        Ok(())
    }
}

/// Settings for the summarize-clinical handler.
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryConfig {
    /// Endpoint serving the model.
    pub sagemaker_endpoint_name: String,

    /// Verified sender address.
    pub source_email: String,

    /// Recipient of the summary.
    pub patient_email: String,

    /// Region override for the SDK clients.
    #[serde(default)]
    pub aws_region: Option<String>,
}

impl SummaryConfig {
    /// Read `SAGEMAKER_ENDPOINT_NAME`, `SOURCE_EMAIL`, `PATIENT_EMAIL` and
    /// optionally `AWS_REGION`.
    pub fn from_env() -> FunctionResult<Self> {
        let config: Self = extract(&[
            "SAGEMAKER_ENDPOINT_NAME",
            "SOURCE_EMAIL",
            "PATIENT_EMAIL",
            "AWS_REGION",
        ])?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every required value is present.
    pub fn validate(&self) -> FunctionResult<()> {
        require("SAGEMAKER_ENDPOINT_NAME", &self.sagemaker_endpoint_name)?;
        require("SOURCE_EMAIL", &self.source_email)?;
        require("PATIENT_EMAIL", &self.patient_email)?;
        Ok(())
    }
}
