//! Event-triggered handlers for the clinical summary workflow.
//!
//! - [`transcription`]: an uploaded recording starts a transcription job
//! - [`summarize`]: a finished transcript is summarized by the endpoint,
//!   stored and emailed
//! - [`deploy`]: runs the deployment pipeline on demand
//!
//! Each handler takes its collaborators as trait objects ([`ObjectStorage`],
//! [`TranscriptionService`], [`Notifier`], [`llmops_core::EndpointInvoker`]);
//! the binaries under `src/bin` wire in the AWS-backed implementations.

#![forbid(unsafe_code)]

pub mod config;
pub mod deploy;
pub mod error;
pub mod events;
pub mod notify;
pub mod storage;
pub mod summarize;
pub mod transcription;

pub use config::{SummaryConfig, TranscriptionConfig};
pub use error::{FunctionError, FunctionResult};
pub use events::{ObjectCreatedEvent, ObjectLocation};
pub use notify::{Email, Notifier, SesNotifier};
pub use storage::{BucketStores, ObjectStorage};
pub use transcription::{TranscribeClient, TranscriptionJob, TranscriptionService};

use tracing_subscriber::EnvFilter;

/// Log setup for function binaries. The log service timestamps every line,
/// so neither time nor colour is written.
pub fn init_tracing() {
    let filter = match "llmops_functions=info".parse() {
        Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
        Err(_) => EnvFilter::from_default_env(),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .without_time()
        .init();
}
