//! Turn a finished transcript into a structured clinical note, store it next
//! to the transcript and email it to the patient.

use bytes::Bytes;
use llmops_core::{EndpointInvoker, GenerationOverrides, InferenceRequest};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::config::SummaryConfig;
use crate::error::{FunctionError, FunctionResult};
use crate::events::ObjectLocation;
use crate::notify::{Email, Notifier};
use crate::storage::ObjectStorage;

/// Instructions placed ahead of the transcript.
pub const CLINICAL_PROMPT: &str = "
You are a clinical documentation assistant.
Convert the following doctor-patient conversation into a structured clinical note.

Use this format:

Chief Complaint:
History of Present Illness:
Past Medical History:
Medications:
Assessment:
Plan:

Transcript:
";

pub const EMAIL_SUBJECT: &str = "Your Clinical Summary is Ready";

const SUCCESS_BODY: &str = "Clinical summary generated and saved successfully!";

#[derive(Deserialize)]
struct TranscriptDocument {
    results: TranscriptResults,
}

#[derive(Deserialize)]
struct TranscriptResults {
    transcripts: Vec<TranscriptText>,
}

#[derive(Deserialize)]
struct TranscriptText {
    transcript: String,
}

/// Text of the first transcript in a transcription output document.
pub fn extract_transcript(document: &[u8]) -> FunctionResult<String> {
    let document: TranscriptDocument =
        serde_json::from_slice(document).map_err(|e| FunctionError::Transcript(e.to_string()))?;

    document
        .results
        .transcripts
        .into_iter()
        .next()
        .map(|t| t.transcript)
        .ok_or_else(|| FunctionError::Transcript("results.transcripts is empty".to_owned()))
}

/// Where the summary for `key` is written: `transcripts/` becomes
/// `summaries/` and `.json` becomes `_summary.txt`.
pub fn summary_key(key: &str) -> FunctionResult<String> {
    let summary = key
        .replace("transcripts/", "summaries/")
        .replace(".json", "_summary.txt");
    if summary == key {
        return Err(FunctionError::WouldOverwrite(key.to_owned()));
    }
    Ok(summary)
}

/// Generation request for one transcript.
#[must_use]
pub fn summary_request(transcript: &str) -> InferenceRequest {
    InferenceRequest::new(format!("{CLINICAL_PROMPT}{transcript}")).with_overrides(
        GenerationOverrides {
            max_new_tokens: Some(512),
            do_sample: Some(true),
            top_p: Some(0.9),
            temperature: Some(0.7),
            repetition_penalty: Some(1.2),
        },
    )
}

/// Notification sent once the summary is stored.
#[must_use]
pub fn summary_email(config: &SummaryConfig, summary: &str) -> Email {
    Email {
        from: config.source_email.clone(),
        to: config.patient_email.clone(),
        subject: EMAIL_SUBJECT.to_owned(),
        body: format!(
            "Hello,\n\nYour clinical summary has been generated and saved to your account.\n\n\
             Summary:\n{summary}\n\nBest regards,\nYour Healthcare Team"
        ),
    }
}

/// Summarize the transcript at `location`.
///
/// Steps run in order and the first failure ends the invocation: nothing is
/// emailed unless the summary was stored.
pub async fn summarize_clinical(
    location: &ObjectLocation,
    config: &SummaryConfig,
    storage: &dyn ObjectStorage,
    invoker: &dyn EndpointInvoker,
    notifier: &dyn Notifier,
) -> FunctionResult<Value> {
    let output = ObjectLocation::new(&location.bucket, summary_key(&location.key)?);

    let document = storage.get(location).await?;
    let transcript = extract_transcript(&document)?;
    info!(uri = %location.uri(), chars = transcript.len(), "transcript loaded");

    let response = invoker
        .invoke(&config.sagemaker_endpoint_name, &summary_request(&transcript))
        .await?;
    let summary = response.generated_text;
    info!(
        endpoint = %config.sagemaker_endpoint_name,
        chars = summary.len(),
        "summary generated"
    );

    storage
        .put(&output, Bytes::from(summary.clone().into_bytes()))
        .await?;
    info!(uri = %output.uri(), "summary stored");

    notifier.send(&summary_email(config, &summary)).await?;
    info!(to = %config.patient_email, "summary emailed");

    Ok(json!({
        "statusCode": 200,
        "body": serde_json::to_string(SUCCESS_BODY)?,
    }))
}
