//! Notification dispatch: receives incident events from the monitoring side
//! over a channel, resolves the recipients, and fans the event out to the
//! configured channel senders.
//!
//! Delivery failures are isolated per recipient and per channel: one failing
//! webhook never prevents the remaining deliveries of the same event.

use sea_orm::{DatabaseConnection, DbErr};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::db::enums::NotificationChannel;
use crate::notifications::models::IncidentEvent;
use crate::notifications::resolver::{self, Delivery};
use crate::notifications::senders::{
    NotificationSender, SenderError, discord::DiscordSender, email::EmailSender,
    slack::SlackSender, teams::TeamsSender,
};

#[derive(Error, Debug)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Application {0} not found for incident notification")]
    ApplicationNotFound(i32),
    #[error(transparent)]
    Sender(#[from] SenderError),
}

/// Cloneable handle used by the incident engine to hand events to the
/// dispatcher without blocking on delivery.
#[derive(Clone)]
pub struct NotificationHandle {
    tx: mpsc::UnboundedSender<IncidentEvent>,
}

impl NotificationHandle {
    /// Queues an event for delivery. Dropped with a warning when the
    /// dispatcher has shut down; incident persistence must not depend on it.
    pub fn emit(&self, event: IncidentEvent) {
        if self.tx.send(event).is_err() {
            warn!("Notification dispatcher is gone, dropping incident event.");
        }
    }

    /// A handle whose events go nowhere. Useful for one-off operations that
    /// should not notify, and for tests.
    pub fn disconnected() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx }
    }
}

pub struct NotificationService {
    db: DatabaseConnection,
    email: EmailSender,
    slack: SlackSender,
    teams: TeamsSender,
    discord: DiscordSender,
}

impl NotificationService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            email: EmailSender::new(),
            slack: SlackSender::new(),
            teams: TeamsSender::new(),
            discord: DiscordSender::new(),
        }
    }

    fn sender_for(&self, channel: NotificationChannel) -> &dyn NotificationSender {
        match channel {
            NotificationChannel::Email => &self.email,
            NotificationChannel::Slack => &self.slack,
            NotificationChannel::Teams => &self.teams,
            NotificationChannel::Discord => &self.discord,
        }
    }

    /// Resolves recipients for the event and delivers it on every subscribed
    /// channel. Returns the number of successful deliveries.
    pub async fn dispatch(&self, event: &IncidentEvent) -> Result<usize, NotificationError> {
        let context = resolver::resolve_recipients(&self.db, &event.incident).await?;
        let application_name = context.application.name.as_str();

        if context.deliveries.is_empty() {
            info!(
                incident_id = event.incident.id,
                application = application_name,
                "No notification recipients for incident event."
            );
            return Ok(0);
        }

        let mut delivered = 0usize;
        for delivery in &context.deliveries {
            if self.deliver_one(delivery, event, application_name).await {
                delivered += 1;
            }
        }

        info!(
            incident_id = event.incident.id,
            event = event.kind.as_str(),
            delivered,
            total = context.deliveries.len(),
            "Incident event dispatched."
        );
        Ok(delivered)
    }

    async fn deliver_one(
        &self,
        delivery: &Delivery,
        event: &IncidentEvent,
        application_name: &str,
    ) -> bool {
        let Some(address) = delivery.address.as_deref() else {
            warn!(
                user_id = delivery.user_id,
                channel = delivery.channel.as_str(),
                incident_id = event.incident.id,
                "No address configured for channel, skipping delivery."
            );
            return false;
        };

        match self
            .sender_for(delivery.channel)
            .send(address, event, application_name)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                error!(
                    user_id = delivery.user_id,
                    channel = delivery.channel.as_str(),
                    incident_id = event.incident.id,
                    error = %e,
                    "Failed to deliver incident notification."
                );
                false
            }
        }
    }
}

/// Spawns the background dispatcher task and returns the handle producers use
/// to queue events. The worker drains the queue in order and exits once every
/// handle has been dropped, so awaiting the returned task after dropping the
/// handles flushes all pending notifications.
pub fn spawn_dispatcher(db: DatabaseConnection) -> (NotificationHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<IncidentEvent>();
    let service = NotificationService::new(db);

    let worker = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Err(e) = service.dispatch(&event).await {
                error!(
                    incident_id = event.incident.id,
                    error = %e,
                    "Incident notification dispatch failed."
                );
            }
        }
    });

    (NotificationHandle { tx }, worker)
}
