use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
};
use thiserror::Error;
use tracing::info;

use crate::db::entities::{prelude::*, subscription};
use crate::db::enums::{NotificationChannel, SubscriptionTarget};

#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Subscription {0} not found")]
    NotFound(i32),
    #[error("User {user_id} is already subscribed to this target")]
    AlreadySubscribed { user_id: i32 },
}

fn channels_json(channels: &[NotificationChannel]) -> serde_json::Value {
    serde_json::Value::Array(
        channels
            .iter()
            .map(|channel| serde_json::Value::String(channel.as_str().to_string()))
            .collect(),
    )
}

/// Creates a subscription for a user on a target. The channel set is
/// normalized so email is always present, and a user can hold at most one
/// subscription per target.
pub async fn subscribe<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    target: SubscriptionTarget,
    channels: &[NotificationChannel],
    email: Option<String>,
    webhook_url: Option<String>,
) -> Result<subscription::Model, SubscriptionError> {
    let existing = Subscription::find()
        .filter(subscription::Column::UserId.eq(user_id))
        .filter(subscription::Column::SubscribableType.eq(target.kind()))
        .filter(subscription::Column::SubscribableId.eq(target.id()))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(SubscriptionError::AlreadySubscribed { user_id });
    }

    let now = Utc::now();
    let saved = subscription::ActiveModel {
        user_id: Set(user_id),
        subscribable_type: Set(target.kind()),
        subscribable_id: Set(target.id()),
        notification_channels: Set(channels_json(&NotificationChannel::normalize(channels))),
        email: Set(email),
        webhook_url: Set(webhook_url),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(
        subscription_id = saved.id,
        user_id,
        target = ?target,
        "Subscription created."
    );
    Ok(saved)
}

/// Subscribes the owner of a freshly created target with the default channel
/// set. Invoked from the create-application/create-group flows.
pub async fn subscribe_owner<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    target: SubscriptionTarget,
) -> Result<subscription::Model, SubscriptionError> {
    subscribe(
        db,
        user_id,
        target,
        &NotificationChannel::defaults(),
        None,
        None,
    )
    .await
}

pub async fn unsubscribe<C: ConnectionTrait>(
    db: &C,
    subscription_id: i32,
) -> Result<(), SubscriptionError> {
    let result = Subscription::delete_by_id(subscription_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(SubscriptionError::NotFound(subscription_id));
    }
    Ok(())
}

/// Replaces the channel set of an existing subscription, re-applying the
/// email-always-included rule.
pub async fn update_channels<C: ConnectionTrait>(
    db: &C,
    subscription_id: i32,
    channels: &[NotificationChannel],
) -> Result<subscription::Model, SubscriptionError> {
    let model = Subscription::find_by_id(subscription_id)
        .one(db)
        .await?
        .ok_or(SubscriptionError::NotFound(subscription_id))?;

    let mut active: subscription::ActiveModel = model.into();
    active.notification_channels = Set(channels_json(&NotificationChannel::normalize(channels)));
    active.updated_at = Set(Utc::now());
    Ok(active.update(db).await?)
}

pub async fn active_subscriptions_for_target<C: ConnectionTrait>(
    db: &C,
    target: SubscriptionTarget,
) -> Result<Vec<subscription::Model>, DbErr> {
    Subscription::find()
        .filter(subscription::Column::SubscribableType.eq(target.kind()))
        .filter(subscription::Column::SubscribableId.eq(target.id()))
        .filter(subscription::Column::IsActive.eq(true))
        .all(db)
        .await
}
