//! The `services` module provides a high-level API for interacting with the database.
//! It encapsulates all the data access patterns, allowing the rest of the
//! application (scheduler, notification dispatcher, external request handlers)
//! to work with domain models without needing to know about the underlying
//! schema or queries.
//!
//! This module is organized into sub-modules, each responsible for a specific
//! domain area. All public functions from these sub-modules are re-exported
//! here for convenient access under the `crate::db::services::` path.

pub mod application_service;
pub mod incident_service;
pub mod subscription_service;

pub use application_service::*;
pub use incident_service::*;
pub use subscription_service::*;
