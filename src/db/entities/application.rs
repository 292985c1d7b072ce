use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "applications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub application_group_id: Option<i32>,
    pub name: String,
    pub url: String,
    pub url_to_watch: Option<String>,
    pub expected_http_code: i32,
    /// Minutes between health checks.
    pub monitoring_interval: i32,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

impl Model {
    /// The URL actually probed: `url_to_watch` when present and non-empty,
    /// otherwise `url`.
    pub fn effective_monitor_url(&self) -> &str {
        match self.url_to_watch.as_deref() {
            Some(watch) if !watch.is_empty() => watch,
            _ => &self.url,
        }
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

    #[sea_orm(
        belongs_to = "super::application_group::Entity",
        from = "Column::ApplicationGroupId",
        to = "super::application_group::Column::Id",
        on_delete = "SetNull"
    )]
    ApplicationGroup,

    #[sea_orm(has_many = "super::incident::Entity")]
    Incidents,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::application_group::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApplicationGroup.def()
    }
}

impl Related<super::incident::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Incidents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
