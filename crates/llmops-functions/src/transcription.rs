//! Start an asynchronous transcription job for a newly uploaded recording.

use std::fmt;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_transcribe::error::DisplayErrorContext;
use aws_sdk_transcribe::types::{LanguageCode, Media, MediaFormat};
use aws_sdk_transcribe::Client;
use serde::Serialize;
use tracing::info;

use crate::config::TranscriptionConfig;
use crate::error::{FunctionError, FunctionResult};
use crate::events::{ObjectCreatedEvent, ObjectLocation};

/// Media formats the transcription service accepts.
pub const SUPPORTED_FORMATS: &[&str] = &["amr", "flac", "m4a", "mp3", "mp4", "ogg", "wav", "webm"];

/// Everything needed to start one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptionJob {
    pub job_name: String,
    pub media_uri: String,
    pub media_format: String,
    pub language_code: String,
    /// Transcript destination; the summary handler listens here.
    pub output: ObjectLocation,
}

/// Starts transcription jobs.
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    async fn start_job(&self, job: &TranscriptionJob) -> FunctionResult<()>;
}

/// Transcription backed by Amazon Transcribe.
#[derive(Clone)]
pub struct TranscribeClient {
    client: Client,
}

impl fmt::Debug for TranscribeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranscribeClient").finish_non_exhaustive()
    }
}

impl TranscribeClient {
    #[must_use]
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl TranscriptionService for TranscribeClient {
    async fn start_job(&self, job: &TranscriptionJob) -> FunctionResult<()> {
        let media = Media::builder().media_file_uri(&job.media_uri).build();

        self.client
            .start_transcription_job()
            .transcription_job_name(&job.job_name)
            .media(media)
            .media_format(MediaFormat::from(job.media_format.as_str()))
            .language_code(LanguageCode::from(job.language_code.as_str()))
            .output_bucket_name(&job.output.bucket)
            .output_key(&job.output.key)
            .send()
            .await
            .map_err(|e| FunctionError::Transcription(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

/// Job name derived from the key's last segment: `.` becomes `-` and
/// anything outside `[0-9A-Za-z._-]` becomes `-`.
#[must_use]
pub fn job_name(key: &str) -> String {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Lowercase extension of the key, if it is a supported media format.
pub fn media_format(key: &str) -> FunctionResult<String> {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or_else(|| FunctionError::invalid_event(format!("{key} has no file extension")))?;

    if SUPPORTED_FORMATS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(FunctionError::invalid_event(format!(
            "unsupported media format {extension:?} for {key}"
        )))
    }
}

/// Build the job for a created object, or `None` when the object is outside
/// the input prefix.
pub fn plan_job(
    location: &ObjectLocation,
    config: &TranscriptionConfig,
) -> FunctionResult<Option<TranscriptionJob>> {
    if !location.key.starts_with(&config.input_prefix) {
        return Ok(None);
    }

    let job_name = job_name(&location.key);
    if job_name.is_empty() {
        return Err(FunctionError::invalid_event(format!(
            "cannot derive a job name from {}",
            location.key
        )));
    }

    Ok(Some(TranscriptionJob {
        media_uri: location.uri(),
        media_format: media_format(&location.key)?,
        language_code: config.language_code.clone(),
        output: ObjectLocation::new(
            &location.bucket,
            format!("{}{job_name}.json", config.transcripts_prefix),
        ),
        job_name,
    }))
}

/// Handle an "Object Created" event. Returns the started job, or `None` when
/// the object was skipped.
pub async fn start_transcription(
    event: &ObjectCreatedEvent,
    config: &TranscriptionConfig,
    service: &dyn TranscriptionService,
) -> FunctionResult<Option<TranscriptionJob>> {
    let location = event.location();

    let Some(job) = plan_job(&location, config)? else {
        info!(
            uri = %location.uri(),
            prefix = %config.input_prefix,
            "object outside input prefix, skipping"
        );
        return Ok(None);
    };

    info!(
        job = %job.job_name,
        media = %job.media_uri,
        format = %job.media_format,
        "starting transcription job"
    );
    service.start_job(&job).await?;
    info!(job = %job.job_name, output = %job.output.uri(), "transcription job started");

    Ok(Some(job))
}
