use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use super::{NotificationSender, SenderError, post_json, webhook_client};
use crate::notifications::models::{IncidentEvent, discord_payload};

/// Sends incident events to a Discord webhook as embed payloads.
pub struct DiscordSender {
    client: Client,
}

impl Default for DiscordSender {
    fn default() -> Self {
        Self::new()
    }
}

impl DiscordSender {
    pub fn new() -> Self {
        Self {
            client: webhook_client(),
        }
    }
}

#[async_trait]
impl NotificationSender for DiscordSender {
    async fn send(
        &self,
        address: &str,
        event: &IncidentEvent,
        application_name: &str,
    ) -> Result<(), SenderError> {
        if address.is_empty() {
            return Err(SenderError::InvalidConfiguration(
                "Empty Discord webhook URL.".to_string(),
            ));
        }

        let payload = discord_payload(event.kind, &event.incident, application_name);
        post_json(&self.client, address, &payload).await?;

        info!(incident_id = event.incident.id, "Discord notification sent.");
        Ok(())
    }
}
