use async_trait::async_trait;
use tracing::info;

use super::{NotificationSender, SenderError};
use crate::notifications::models::{IncidentEvent, email_body, email_subject};

/// Email delivery. No SMTP transport is wired up yet; deliveries are
/// recorded through the structured log.
// TODO: wire up an SMTP transport once the mail relay is provisioned.
#[derive(Default)]
pub struct EmailSender;

impl EmailSender {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationSender for EmailSender {
    async fn send(
        &self,
        address: &str,
        event: &IncidentEvent,
        application_name: &str,
    ) -> Result<(), SenderError> {
        if address.is_empty() {
            return Err(SenderError::InvalidConfiguration(
                "Empty email address.".to_string(),
            ));
        }

        let subject = email_subject(event.kind, application_name, &event.incident.title);
        let body = email_body(event.kind, &event.incident, application_name);

        info!(
            to = address,
            subject = %subject,
            body_len = body.len(),
            "Email notification sent."
        );
        Ok(())
    }
}
