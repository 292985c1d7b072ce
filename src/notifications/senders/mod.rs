use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::models::IncidentEvent;

pub mod discord;
pub mod email;
pub mod slack;
pub mod teams;

/// Timeout for one outbound webhook POST.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Invalid configuration for sender: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

/// A trait for delivering one incident event over a specific channel type.
/// All concrete sender implementations (email, Slack, Teams, Discord) must
/// implement this trait.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Delivers the event to `address`: an email address for the email
    /// channel, a webhook URL for the others.
    async fn send(
        &self,
        address: &str,
        event: &IncidentEvent,
        application_name: &str,
    ) -> Result<(), SenderError>;
}

pub(crate) fn webhook_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(WEBHOOK_TIMEOUT)
        .build()
        .unwrap() // Should not fail with default settings
}

/// POSTs a JSON payload and turns a non-success status into a SenderError,
/// capturing the response body for the log.
pub(crate) async fn post_json<T: serde::Serialize>(
    client: &reqwest::Client,
    url: &str,
    payload: &T,
) -> Result<(), SenderError> {
    let response = client.post(url).json(payload).send().await?;
    let status = response.status();

    if !status.is_success() {
        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        return Err(SenderError::SendFailed(format!(
            "Webhook returned non-success status: {status}. Body: {error_body}"
        )));
    }

    Ok(())
}
