use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use super::{NotificationSender, SenderError, post_json, webhook_client};
use crate::notifications::models::{IncidentEvent, teams_payload};

/// Sends incident events to a Microsoft Teams connector webhook as
/// MessageCard payloads.
pub struct TeamsSender {
    client: Client,
}

impl Default for TeamsSender {
    fn default() -> Self {
        Self::new()
    }
}

impl TeamsSender {
    pub fn new() -> Self {
        Self {
            client: webhook_client(),
        }
    }
}

#[async_trait]
impl NotificationSender for TeamsSender {
    async fn send(
        &self,
        address: &str,
        event: &IncidentEvent,
        application_name: &str,
    ) -> Result<(), SenderError> {
        if address.is_empty() {
            return Err(SenderError::InvalidConfiguration(
                "Empty Teams webhook URL.".to_string(),
            ));
        }

        let payload = teams_payload(event.kind, &event.incident, application_name);
        post_json(&self.client, address, &payload).await?;

        info!(incident_id = event.incident.id, "Teams notification sent.");
        Ok(())
    }
}
