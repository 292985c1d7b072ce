use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use thiserror::Error;
use tracing::info;

use crate::db::entities::{application, application_group, incident, prelude::*, subscription};
use crate::db::enums::{SubscribableType, SubscriptionTarget};
use crate::db::services::subscription_service::{self, SubscriptionError};

pub const DEFAULT_EXPECTED_HTTP_CODE: i32 = 200;
pub const DEFAULT_MONITORING_INTERVAL_MINUTES: i32 = 5;

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Application {0} not found")]
    NotFound(i32),
    #[error("Application group {0} not found")]
    GroupNotFound(i32),
    #[error("The effective monitor URL must not be empty")]
    EmptyMonitorUrl,
    #[error("An application group named '{0}' already exists for this user")]
    DuplicateGroupName(String),
    #[error("Subscription error: {0}")]
    Subscription(#[from] SubscriptionError),
}

#[derive(Debug, Clone)]
pub struct CreateApplication {
    pub user_id: i32,
    pub application_group_id: Option<i32>,
    pub name: String,
    pub url: String,
    pub url_to_watch: Option<String>,
    pub expected_http_code: Option<i32>,
    pub monitoring_interval: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct CreateApplicationGroup {
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
}

/// Creates an application and auto-subscribes its owner on the default
/// channel set, in one transaction.
pub async fn create_application(
    db: &DatabaseConnection,
    data: CreateApplication,
) -> Result<application::Model, ApplicationError> {
    let effective_url = data
        .url_to_watch
        .as_deref()
        .filter(|url| !url.is_empty())
        .unwrap_or(&data.url);
    if effective_url.is_empty() {
        return Err(ApplicationError::EmptyMonitorUrl);
    }

    let txn = db.begin().await?;

    let now = Utc::now();
    let saved = application::ActiveModel {
        user_id: Set(data.user_id),
        application_group_id: Set(data.application_group_id),
        name: Set(data.name),
        url: Set(data.url),
        url_to_watch: Set(data.url_to_watch),
        expected_http_code: Set(data.expected_http_code.unwrap_or(DEFAULT_EXPECTED_HTTP_CODE)),
        monitoring_interval: Set(data
            .monitoring_interval
            .unwrap_or(DEFAULT_MONITORING_INTERVAL_MINUTES)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    subscription_service::subscribe_owner(
        &txn,
        saved.user_id,
        SubscriptionTarget::Application(saved.id),
    )
    .await?;

    txn.commit().await?;

    info!(
        application_id = saved.id,
        user_id = saved.user_id,
        "Application created with owner subscription."
    );
    Ok(saved)
}

/// Deletes an application along with its incidents and subscriptions.
pub async fn delete_application(
    db: &DatabaseConnection,
    application_id: i32,
) -> Result<(), ApplicationError> {
    let txn = db.begin().await?;

    incident::Entity::delete_many()
        .filter(incident::Column::ApplicationId.eq(application_id))
        .exec(&txn)
        .await?;
    subscription::Entity::delete_many()
        .filter(subscription::Column::SubscribableType.eq(SubscribableType::Application))
        .filter(subscription::Column::SubscribableId.eq(application_id))
        .exec(&txn)
        .await?;

    let result = Application::delete_by_id(application_id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(ApplicationError::NotFound(application_id));
    }

    txn.commit().await?;
    info!(application_id, "Application deleted with incidents and subscriptions.");
    Ok(())
}

/// Creates a group (name unique per owning user) and auto-subscribes its
/// owner on the default channel set.
pub async fn create_group(
    db: &DatabaseConnection,
    data: CreateApplicationGroup,
) -> Result<application_group::Model, ApplicationError> {
    let duplicate = ApplicationGroup::find()
        .filter(application_group::Column::UserId.eq(data.user_id))
        .filter(application_group::Column::Name.eq(data.name.clone()))
        .one(db)
        .await?;
    if duplicate.is_some() {
        return Err(ApplicationError::DuplicateGroupName(data.name));
    }

    let txn = db.begin().await?;

    let now = Utc::now();
    let saved = application_group::ActiveModel {
        user_id: Set(data.user_id),
        name: Set(data.name),
        description: Set(data.description),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    subscription_service::subscribe_owner(
        &txn,
        saved.user_id,
        SubscriptionTarget::ApplicationGroup(saved.id),
    )
    .await?;

    txn.commit().await?;

    info!(group_id = saved.id, user_id = saved.user_id, "Application group created.");
    Ok(saved)
}

/// Deletes a group. Its applications are detached (group id nulled), never
/// deleted; the group's subscriptions are removed.
pub async fn delete_group(db: &DatabaseConnection, group_id: i32) -> Result<(), ApplicationError> {
    let txn = db.begin().await?;

    application::Entity::update_many()
        .col_expr(
            application::Column::ApplicationGroupId,
            sea_orm::sea_query::Expr::value(sea_orm::Value::Int(None)),
        )
        .filter(application::Column::ApplicationGroupId.eq(group_id))
        .exec(&txn)
        .await?;

    subscription::Entity::delete_many()
        .filter(subscription::Column::SubscribableType.eq(SubscribableType::ApplicationGroup))
        .filter(subscription::Column::SubscribableId.eq(group_id))
        .exec(&txn)
        .await?;

    let result = ApplicationGroup::delete_by_id(group_id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(ApplicationError::GroupNotFound(group_id));
    }

    txn.commit().await?;
    info!(group_id, "Application group deleted, applications detached.");
    Ok(())
}

/// Candidate set for a monitoring pass, optionally narrowed to one
/// application or one group.
pub async fn applications_for_monitoring(
    db: &DatabaseConnection,
    application_id: Option<i32>,
    group_id: Option<i32>,
) -> Result<Vec<application::Model>, DbErr> {
    let mut query = Application::find();
    if let Some(id) = application_id {
        query = query.filter(application::Column::Id.eq(id));
    }
    if let Some(id) = group_id {
        query = query.filter(application::Column::ApplicationGroupId.eq(id));
    }
    query.all(db).await
}
