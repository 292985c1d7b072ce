//! The incident engine.
//!
//! Consumes health check outcomes and maintains the incident lifecycle:
//! opening incidents on failed checks, auto-resolving them on recovery, and
//! validating the manual resolve/reopen/status-update operations against the
//! status transition graph. All state changes that subscribers care about are
//! emitted as [`IncidentEvent`]s for the notification dispatcher.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::db::entities::{application, incident, prelude::*};
use crate::db::enums::{IncidentSeverity, IncidentStatus};
use crate::monitoring::health_checker::CheckOutcome;
use crate::notifications::models::{IncidentEvent, IncidentEventKind};
use crate::notifications::service::NotificationHandle;

#[derive(Error, Debug)]
pub enum IncidentError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Incident {0} not found")]
    NotFound(i32),
    #[error("Incident is already resolved")]
    AlreadyResolved,
    #[error("Only resolved incidents can be reopened")]
    NotResolved,
    #[error("Cannot transition from {from} to {to}. Allowed transitions: {allowed}")]
    InvalidTransition {
        from: IncidentStatus,
        to: IncidentStatus,
        allowed: String,
    },
}

pub fn severity_for_status(status_code: u16) -> IncidentSeverity {
    if status_code == 0 {
        IncidentSeverity::Critical
    } else if status_code >= 500 {
        IncidentSeverity::High
    } else {
        IncidentSeverity::Low
    }
}

pub fn title_for_status(status_code: u16) -> &'static str {
    match status_code {
        0 => "Connection Failed",
        code if code >= 500 => "Server Error",
        code if code >= 400 => "Client Error",
        _ => "Application Issue",
    }
}

pub fn description_for(status_code: u16, detail: &str) -> String {
    if status_code == 0 {
        format!("Failed to connect to application: {detail}")
    } else {
        format!("Application returned HTTP {status_code}. Error: {detail}")
    }
}

/// Applies one health check outcome to the application's incident state.
///
/// A healthy outcome resolves every OPEN incident for the application (by
/// construction there is at most one). An unhealthy outcome opens a new
/// incident unless one is already OPEN for the ongoing outage.
pub async fn process_check_outcome(
    db: &DatabaseConnection,
    events: &NotificationHandle,
    application: &application::Model,
    outcome: &CheckOutcome,
) -> Result<(), IncidentError> {
    if outcome.healthy {
        resolve_open_incidents(db, events, application.id).await
    } else {
        open_incident_if_absent(db, events, application, outcome).await
    }
}

async fn resolve_open_incidents(
    db: &DatabaseConnection,
    events: &NotificationHandle,
    application_id: i32,
) -> Result<(), IncidentError> {
    let open_incidents = Incident::find()
        .filter(incident::Column::ApplicationId.eq(application_id))
        .filter(incident::Column::Status.eq(IncidentStatus::Open))
        .all(db)
        .await?;

    for model in open_incidents {
        let incident_id = model.id;
        let now = Utc::now();
        let mut active: incident::ActiveModel = model.into();
        active.status = Set(IncidentStatus::Resolved);
        active.ended_at = Set(Some(now));
        active.resolved_at = Set(Some(now));
        active.updated_at = Set(now);
        let updated = active.update(db).await?;

        info!(
            incident_id,
            application_id, "Incident resolved after healthy check."
        );
        events.emit(IncidentEvent {
            kind: IncidentEventKind::Resolved,
            incident: updated,
        });
    }

    Ok(())
}

async fn open_incident_if_absent(
    db: &DatabaseConnection,
    events: &NotificationHandle,
    application: &application::Model,
    outcome: &CheckOutcome,
) -> Result<(), IncidentError> {
    let txn = db.begin().await?;

    // Row lock so two overlapping checks for the same application cannot
    // both observe "no open incident" and both insert one.
    let existing = Incident::find()
        .filter(incident::Column::ApplicationId.eq(application.id))
        .filter(incident::Column::Status.eq(IncidentStatus::Open))
        .lock_exclusive()
        .one(&txn)
        .await?;

    if existing.is_some() {
        txn.commit().await?;
        info!(
            application_id = application.id,
            "Open incident already recorded for ongoing outage, skipping."
        );
        return Ok(());
    }

    let now = Utc::now();
    let new_incident = incident::ActiveModel {
        application_id: Set(application.id),
        user_id: Set(application.user_id),
        title: Set(title_for_status(outcome.status_code).to_string()),
        description: Set(description_for(outcome.status_code, &outcome.detail)),
        status: Set(IncidentStatus::Open),
        severity: Set(severity_for_status(outcome.status_code)),
        response_code: Set((outcome.status_code != 0).then(|| i32::from(outcome.status_code))),
        response_time: Set(outcome.response_time_ms),
        error_message: Set(Some(outcome.detail.clone())),
        started_at: Set(now),
        ended_at: Set(None),
        resolved_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let saved = new_incident.insert(&txn).await?;
    txn.commit().await?;

    warn!(
        incident_id = saved.id,
        application_id = application.id,
        severity = %saved.severity,
        status_code = outcome.status_code,
        "Incident opened after failed health check."
    );
    events.emit(IncidentEvent {
        kind: IncidentEventKind::Created,
        incident: saved,
    });

    Ok(())
}

/// Records a CRITICAL incident when the check itself could not run, so that
/// monitoring failures stay visible instead of vanishing into a log line.
/// Returns `None` when the outage is already covered by an OPEN incident.
pub async fn record_monitoring_failure(
    db: &DatabaseConnection,
    application: &application::Model,
    error_text: &str,
) -> Result<Option<incident::Model>, IncidentError> {
    let txn = db.begin().await?;

    let existing = Incident::find()
        .filter(incident::Column::ApplicationId.eq(application.id))
        .filter(incident::Column::Status.eq(IncidentStatus::Open))
        .lock_exclusive()
        .one(&txn)
        .await?;

    if existing.is_some() {
        txn.commit().await?;
        return Ok(None);
    }

    let now = Utc::now();
    let new_incident = incident::ActiveModel {
        application_id: Set(application.id),
        user_id: Set(application.user_id),
        title: Set("Monitoring System Failure".to_string()),
        description: Set(format!("Failed to monitor application: {error_text}")),
        status: Set(IncidentStatus::Open),
        severity: Set(IncidentSeverity::Critical),
        response_code: Set(None),
        response_time: Set(None),
        error_message: Set(Some(error_text.to_string())),
        started_at: Set(now),
        ended_at: Set(None),
        resolved_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let saved = new_incident.insert(&txn).await?;
    txn.commit().await?;

    error!(
        incident_id = saved.id,
        application_id = application.id,
        error = error_text,
        "Monitoring failure recorded as incident."
    );

    Ok(Some(saved))
}

async fn find_incident(
    db: &DatabaseConnection,
    incident_id: i32,
) -> Result<incident::Model, IncidentError> {
    Incident::find_by_id(incident_id)
        .one(db)
        .await?
        .ok_or(IncidentError::NotFound(incident_id))
}

/// Marks an incident resolved, regardless of whether it passed through
/// IN_PROGRESS. Rejected only when the incident is already RESOLVED.
pub async fn resolve_incident(
    db: &DatabaseConnection,
    events: &NotificationHandle,
    incident_id: i32,
) -> Result<incident::Model, IncidentError> {
    let model = find_incident(db, incident_id).await?;
    if model.status == IncidentStatus::Resolved {
        return Err(IncidentError::AlreadyResolved);
    }

    let now = Utc::now();
    let mut active: incident::ActiveModel = model.into();
    active.status = Set(IncidentStatus::Resolved);
    active.ended_at = Set(Some(now));
    active.resolved_at = Set(Some(now));
    active.updated_at = Set(now);
    let updated = active.update(db).await?;

    info!(incident_id, "Incident manually resolved.");
    events.emit(IncidentEvent {
        kind: IncidentEventKind::Resolved,
        incident: updated.clone(),
    });

    Ok(updated)
}

/// Reopens a resolved incident. Only RESOLVED incidents can be reopened.
pub async fn reopen_incident(
    db: &DatabaseConnection,
    events: &NotificationHandle,
    incident_id: i32,
) -> Result<incident::Model, IncidentError> {
    let model = find_incident(db, incident_id).await?;
    if model.status != IncidentStatus::Resolved {
        return Err(IncidentError::NotResolved);
    }

    let now = Utc::now();
    let mut active: incident::ActiveModel = model.into();
    active.status = Set(IncidentStatus::Open);
    active.ended_at = Set(None);
    active.resolved_at = Set(None);
    active.updated_at = Set(now);
    let updated = active.update(db).await?;

    info!(incident_id, "Incident reopened.");
    events.emit(IncidentEvent {
        kind: IncidentEventKind::Reopened,
        incident: updated.clone(),
    });

    Ok(updated)
}

/// Applies an explicit status change, validated against the transition graph.
pub async fn update_incident_status(
    db: &DatabaseConnection,
    events: &NotificationHandle,
    incident_id: i32,
    new_status: IncidentStatus,
) -> Result<incident::Model, IncidentError> {
    let model = find_incident(db, incident_id).await?;
    let current = model.status;

    if !current.can_transition_to(new_status) {
        let allowed = current
            .allowed_transitions()
            .iter()
            .map(|status| status.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(IncidentError::InvalidTransition {
            from: current,
            to: new_status,
            allowed,
        });
    }

    let now = Utc::now();
    let mut active: incident::ActiveModel = model.into();
    active.status = Set(new_status);
    if new_status.is_closed() {
        active.ended_at = Set(Some(now));
    } else {
        active.ended_at = Set(None);
        active.resolved_at = Set(None);
    }
    active.updated_at = Set(now);
    let updated = active.update(db).await?;

    info!(incident_id, from = %current, to = %new_status, "Incident status updated.");
    if new_status == IncidentStatus::Resolved {
        events.emit(IncidentEvent {
            kind: IncidentEventKind::Resolved,
            incident: updated.clone(),
        });
    }

    Ok(updated)
}

pub async fn delete_incident(
    db: &DatabaseConnection,
    incident_id: i32,
) -> Result<(), IncidentError> {
    let result = Incident::delete_by_id(incident_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(IncidentError::NotFound(incident_id));
    }
    Ok(())
}

/// The reference point for the scheduler's due computation: the `started_at`
/// of the application's most recently created incident, or the application's
/// own creation time when it has no incidents yet.
pub async fn last_check_time(
    db: &DatabaseConnection,
    application: &application::Model,
) -> Result<chrono::DateTime<Utc>, DbErr> {
    let latest = Incident::find()
        .filter(incident::Column::ApplicationId.eq(application.id))
        .order_by_desc(incident::Column::CreatedAt)
        .one(db)
        .await?;
    Ok(latest
        .map(|incident| incident.started_at)
        .unwrap_or(application.created_at))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IncidentStats {
    pub total: u64,
    pub open: u64,
    pub resolved: u64,
    pub critical: u64,
    pub high: u64,
    pub low: u64,
}

/// Incident counts across all applications owned by one user.
pub async fn incident_stats(db: &DatabaseConnection, user_id: i32) -> Result<IncidentStats, DbErr> {
    let base = Incident::find().filter(incident::Column::UserId.eq(user_id));

    Ok(IncidentStats {
        total: base.clone().count(db).await?,
        open: base
            .clone()
            .filter(incident::Column::Status.eq(IncidentStatus::Open))
            .count(db)
            .await?,
        resolved: base
            .clone()
            .filter(incident::Column::Status.eq(IncidentStatus::Resolved))
            .count(db)
            .await?,
        critical: base
            .clone()
            .filter(incident::Column::Severity.eq(IncidentSeverity::Critical))
            .count(db)
            .await?,
        high: base
            .clone()
            .filter(incident::Column::Severity.eq(IncidentSeverity::High))
            .count(db)
            .await?,
        low: base
            .filter(incident::Column::Severity.eq(IncidentSeverity::Low))
            .count(db)
            .await?,
    })
}
