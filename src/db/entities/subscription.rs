use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::{NotificationChannel, SubscribableType, SubscriptionTarget};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    #[sea_orm(indexed)]
    pub subscribable_type: SubscribableType,
    #[sea_orm(indexed)]
    pub subscribable_id: i32,
    /// JSON array of channel names. Email is always present, enforced when
    /// the subscription is written.
    #[sea_orm(column_type = "JsonBinary")]
    pub notification_channels: Json,
    pub email: Option<String>,
    pub webhook_url: Option<String>,
    pub is_active: bool,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

impl Model {
    pub fn target(&self) -> SubscriptionTarget {
        match self.subscribable_type {
            SubscribableType::Application => SubscriptionTarget::Application(self.subscribable_id),
            SubscribableType::ApplicationGroup => {
                SubscriptionTarget::ApplicationGroup(self.subscribable_id)
            }
        }
    }

    /// Decodes the stored channel array. Rows written through
    /// [`crate::db::services::subscription_service`] always decode; anything
    /// unreadable falls back to the default channel set.
    pub fn channels(&self) -> Vec<NotificationChannel> {
        serde_json::from_value(self.notification_channels.clone())
            .unwrap_or_else(|_| NotificationChannel::defaults())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
