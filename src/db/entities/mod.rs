//! SeaORM Entities
//!
//! Defines the SeaORM entities that map to database tables.
//! Each entity is defined in its own module (e.g., `user.rs`, `application.rs`).

pub mod application;
pub mod application_group;
pub mod incident;
pub mod subscription;
pub mod user;

// Prelude module for easy importing of all entities and their related types
pub mod prelude {
    pub use super::user::Entity as User;
    pub use super::user::Model as UserModel;
    pub use super::user::ActiveModel as UserActiveModel;
    pub use super::user::Column as UserColumn;

    pub use super::application::Entity as Application;
    pub use super::application::Model as ApplicationModel;
    pub use super::application::ActiveModel as ApplicationActiveModel;
    pub use super::application::Column as ApplicationColumn;

    pub use super::application_group::Entity as ApplicationGroup;
    pub use super::application_group::Model as ApplicationGroupModel;
    pub use super::application_group::ActiveModel as ApplicationGroupActiveModel;
    pub use super::application_group::Column as ApplicationGroupColumn;

    pub use super::incident::Entity as Incident;
    pub use super::incident::Model as IncidentModel;
    pub use super::incident::ActiveModel as IncidentActiveModel;
    pub use super::incident::Column as IncidentColumn;

    pub use super::subscription::Entity as Subscription;
    pub use super::subscription::Model as SubscriptionModel;
    pub use super::subscription::ActiveModel as SubscriptionActiveModel;
    pub use super::subscription::Column as SubscriptionColumn;
}
