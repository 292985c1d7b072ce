//! Resolves which deliveries an incident event fans out to.
//!
//! Collects active subscriptions on the incident's application, then on the
//! application's group when it has one, then the application owner's
//! user-level channel configuration as implicit deliveries. The result is
//! deduplicated per (user, channel), first occurrence winning, so an explicit
//! subscription always takes precedence over the implicit owner fallback.

use std::collections::{HashMap, HashSet};

use sea_orm::{DatabaseConnection, EntityTrait};

use crate::db::entities::{incident, prelude::*, subscription, user};
use crate::db::enums::{NotificationChannel, SubscriptionTarget};
use crate::db::services::subscription_service;
use crate::notifications::service::NotificationError;

/// One unit of outbound delivery: a user, a channel, and the address to use.
/// `address` is `None` when neither the subscription nor the user carries a
/// usable address for the channel; the dispatcher skips those with a warning.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub user_id: i32,
    pub channel: NotificationChannel,
    pub address: Option<String>,
    pub subscription_id: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct NotificationContext {
    pub application: crate::db::entities::application::Model,
    pub deliveries: Vec<Delivery>,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(|v| v.to_string())
}

fn effective_address(
    sub: &subscription::Model,
    user: Option<&user::Model>,
    channel: NotificationChannel,
) -> Option<String> {
    match channel {
        NotificationChannel::Email => non_empty(sub.email.as_deref())
            .or_else(|| user.and_then(|u| non_empty(u.notification_email.as_deref()))),
        NotificationChannel::Slack => non_empty(sub.webhook_url.as_deref())
            .or_else(|| user.and_then(|u| non_empty(u.slack_webhook_url.as_deref()))),
        NotificationChannel::Teams => non_empty(sub.webhook_url.as_deref())
            .or_else(|| user.and_then(|u| non_empty(u.teams_webhook_url.as_deref()))),
        NotificationChannel::Discord => non_empty(sub.webhook_url.as_deref())
            .or_else(|| user.and_then(|u| non_empty(u.discord_webhook_url.as_deref()))),
    }
}

pub async fn resolve_recipients(
    db: &DatabaseConnection,
    incident: &incident::Model,
) -> Result<NotificationContext, NotificationError> {
    let application = Application::find_by_id(incident.application_id)
        .one(db)
        .await?
        .ok_or(NotificationError::ApplicationNotFound(
            incident.application_id,
        ))?;

    let mut subscriptions = subscription_service::active_subscriptions_for_target(
        db,
        SubscriptionTarget::Application(application.id),
    )
    .await?;
    if let Some(group_id) = application.application_group_id {
        subscriptions.extend(
            subscription_service::active_subscriptions_for_target(
                db,
                SubscriptionTarget::ApplicationGroup(group_id),
            )
            .await?,
        );
    }

    let mut users: HashMap<i32, Option<user::Model>> = HashMap::new();
    let mut seen: HashSet<(i32, NotificationChannel)> = HashSet::new();
    let mut deliveries = Vec::new();

    for sub in &subscriptions {
        if !users.contains_key(&sub.user_id) {
            let loaded = User::find_by_id(sub.user_id).one(db).await?;
            users.insert(sub.user_id, loaded);
        }
        let user = users.get(&sub.user_id).and_then(|u| u.as_ref());

        for channel in sub.channels() {
            if !seen.insert((sub.user_id, channel)) {
                continue;
            }
            deliveries.push(Delivery {
                user_id: sub.user_id,
                channel,
                address: effective_address(sub, user, channel),
                subscription_id: Some(sub.id),
            });
        }
    }

    // The application owner's user-level configuration acts as an implicit
    // subscription, appended after the explicit ones.
    if let Some(owner) = User::find_by_id(application.user_id).one(db).await? {
        let owner_channels = [
            (
                NotificationChannel::Email,
                non_empty(owner.notification_email.as_deref()),
            ),
            (
                NotificationChannel::Slack,
                non_empty(owner.slack_webhook_url.as_deref()),
            ),
            (
                NotificationChannel::Teams,
                non_empty(owner.teams_webhook_url.as_deref()),
            ),
            (
                NotificationChannel::Discord,
                non_empty(owner.discord_webhook_url.as_deref()),
            ),
        ];
        for (channel, address) in owner_channels {
            let Some(address) = address else { continue };
            if seen.insert((owner.id, channel)) {
                deliveries.push(Delivery {
                    user_id: owner.id,
                    channel,
                    address: Some(address),
                    subscription_id: None,
                });
            }
        }
    }

    Ok(NotificationContext {
        application,
        deliveries,
    })
}
