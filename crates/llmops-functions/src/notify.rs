//! Email notification through Amazon SES.

use std::fmt;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ses::error::DisplayErrorContext;
use aws_sdk_ses::types::{Body, Content, Destination, Message};
use aws_sdk_ses::Client;

use crate::error::{FunctionError, FunctionResult};

const CHARSET: &str = "UTF-8";

/// A plain-text email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Sends notifications.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: &Email) -> FunctionResult<()>;
}

/// Notifier backed by SES `SendEmail`.
#[derive(Clone)]
pub struct SesNotifier {
    client: Client,
}

impl fmt::Debug for SesNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SesNotifier").finish_non_exhaustive()
    }
}

impl SesNotifier {
    #[must_use]
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }
}

fn content(data: &str) -> FunctionResult<Content> {
    Content::builder()
        .data(data)
        .charset(CHARSET)
        .build()
        .map_err(|e| FunctionError::Notification(e.to_string()))
}

#[async_trait]
impl Notifier for SesNotifier {
    async fn send(&self, email: &Email) -> FunctionResult<()> {
        let message = Message::builder()
            .subject(content(&email.subject)?)
            .body(Body::builder().text(content(&email.body)?).build())
            .build();

        self.client
            .send_email()
            .source(&email.from)
            .destination(Destination::builder().to_addresses(&email.to).build())
            .message(message)
            .send()
            .await
            .map_err(|e| FunctionError::Notification(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}
