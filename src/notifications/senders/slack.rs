use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use super::{NotificationSender, SenderError, post_json, webhook_client};
use crate::notifications::models::{IncidentEvent, slack_payload};

/// Sends incident events to a Slack incoming webhook.
pub struct SlackSender {
    client: Client,
}

impl Default for SlackSender {
    fn default() -> Self {
        Self::new()
    }
}

impl SlackSender {
    pub fn new() -> Self {
        Self {
            client: webhook_client(),
        }
    }
}

#[async_trait]
impl NotificationSender for SlackSender {
    async fn send(
        &self,
        address: &str,
        event: &IncidentEvent,
        application_name: &str,
    ) -> Result<(), SenderError> {
        if address.is_empty() {
            return Err(SenderError::InvalidConfiguration(
                "Empty Slack webhook URL.".to_string(),
            ));
        }

        let payload = slack_payload(event.kind, &event.incident, application_name);
        post_json(&self.client, address, &payload).await?;

        info!(incident_id = event.incident.id, "Slack notification sent.");
        Ok(())
    }
}
