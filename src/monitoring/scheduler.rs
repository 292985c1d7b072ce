//! Drives periodic health checks over the monitored applications.
//!
//! A pass loads the candidate applications, decides which are due based on
//! their per-application interval and the time of the last check, probes the
//! due ones concurrently and feeds each outcome into the incident engine.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::{DatabaseConnection, DbErr};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::db::entities::application;
use crate::db::services::incident_service::{self, IncidentError};
use crate::db::services::application_service;
use crate::monitoring::health_checker::{CheckOutcome, HttpHealthChecker};
use crate::notifications::service::NotificationHandle;

/// Timing knobs for one monitoring pass.
#[derive(Debug, Clone)]
pub struct MonitorPolicy {
    /// Timeout for a single HTTP probe.
    pub probe_timeout: Duration,
    /// Upper bound on one attempt, probe plus bookkeeping.
    pub attempt_timeout: Duration,
    /// How many probe attempts before the check counts as failed.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub retry_backoff: Duration,
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(15),
            attempt_timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_backoff: Duration::from_secs(60),
        }
    }
}

/// Narrows a pass to one application or one group. `force` checks the
/// selected applications even when their interval has not elapsed.
#[derive(Debug, Clone, Default)]
pub struct MonitorFilter {
    pub application_id: Option<i32>,
    pub group_id: Option<i32>,
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSummary {
    pub processed: usize,
    pub skipped: usize,
    pub total: usize,
}

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error(transparent)]
    Incident(#[from] IncidentError),
}

pub struct MonitorScheduler {
    db: DatabaseConnection,
    checker: Arc<HttpHealthChecker>,
    events: NotificationHandle,
    policy: MonitorPolicy,
    // Held for the duration of a periodic pass so overlapping ticks skip
    // instead of piling up behind a slow batch of probes.
    tick_guard: Arc<tokio::sync::Mutex<()>>,
}

impl MonitorScheduler {
    pub fn new(db: DatabaseConnection, events: NotificationHandle, policy: MonitorPolicy) -> Self {
        let checker = Arc::new(HttpHealthChecker::with_timeout(policy.probe_timeout));
        Self {
            db,
            checker,
            events,
            policy,
            tick_guard: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Runs one monitoring pass over the applications selected by `filter`.
    pub async fn run_pass(&self, filter: &MonitorFilter) -> Result<MonitorSummary, MonitorError> {
        let applications = application_service::applications_for_monitoring(
            &self.db,
            filter.application_id,
            filter.group_id,
        )
        .await?;
        let total = applications.len();

        let mut due = Vec::new();
        let mut skipped = 0usize;
        for app in applications {
            if filter.force || self.is_due(&app).await? {
                due.push(app);
            } else {
                skipped += 1;
            }
        }

        let handles: Vec<_> = due
            .into_iter()
            .map(|app| {
                let db = self.db.clone();
                let checker = Arc::clone(&self.checker);
                let events = self.events.clone();
                let policy = self.policy.clone();
                tokio::spawn(async move {
                    if let Err(e) = monitor_application(&db, &checker, &events, &app, &policy).await
                    {
                        error!(
                            application_id = app.id,
                            application = %app.name,
                            error = %e,
                            "Health check processing failed."
                        );
                    }
                })
            })
            .collect();
        let processed = handles.len();
        for result in futures::future::join_all(handles).await {
            if let Err(e) = result {
                error!(error = %e, "Health check task panicked.");
            }
        }

        info!(processed, skipped, total, "Monitoring pass finished.");
        Ok(MonitorSummary {
            processed,
            skipped,
            total,
        })
    }

    /// An application is due when its interval has elapsed since the last
    /// check, boundary inclusive.
    async fn is_due(&self, application: &application::Model) -> Result<bool, MonitorError> {
        let last = incident_service::last_check_time(&self.db, application).await?;
        let due_at = last + chrono::Duration::minutes(i64::from(application.monitoring_interval));
        Ok(Utc::now() >= due_at)
    }

    /// Spawns the daemon loop: one pass every `period`, skipping ticks that
    /// would overlap a pass still in flight.
    pub fn start_periodic(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let guard = match Arc::clone(&self.tick_guard).try_lock_owned() {
                    Ok(guard) => guard,
                    Err(_) => {
                        warn!("Previous monitoring pass still running, skipping tick.");
                        continue;
                    }
                };
                let scheduler = Arc::clone(&self);
                tokio::spawn(async move {
                    let _pass = guard;
                    if let Err(e) = scheduler.run_pass(&MonitorFilter::default()).await {
                        error!(error = %e, "Monitoring pass failed.");
                    }
                });
            }
        })
    }
}

/// Probes one application, retrying per the policy, and records the result
/// in the incident engine. Exhausted retries with no HTTP outcome at all are
/// recorded as a monitoring failure rather than an application incident.
pub async fn monitor_application(
    db: &DatabaseConnection,
    checker: &HttpHealthChecker,
    events: &NotificationHandle,
    application: &application::Model,
    policy: &MonitorPolicy,
) -> Result<(), MonitorError> {
    match probe_with_retries(checker, application, policy).await {
        Ok(outcome) => {
            incident_service::process_check_outcome(db, events, application, &outcome).await?;
        }
        Err(error_text) => {
            incident_service::record_monitoring_failure(db, application, &error_text).await?;
        }
    }
    Ok(())
}

async fn probe_with_retries(
    checker: &HttpHealthChecker,
    application: &application::Model,
    policy: &MonitorPolicy,
) -> Result<CheckOutcome, String> {
    let mut last_error = String::new();
    for attempt in 1..=policy.max_attempts {
        match tokio::time::timeout(policy.attempt_timeout, checker.check(application)).await {
            Ok(Ok(outcome)) => {
                debug!(
                    application_id = application.id,
                    attempt,
                    healthy = outcome.healthy,
                    status = outcome.status_code,
                    "Health check attempt completed."
                );
                return Ok(outcome);
            }
            Ok(Err(e)) => {
                last_error = e.to_string();
            }
            Err(_) => {
                last_error = format!(
                    "Health check attempt timed out after {}s",
                    policy.attempt_timeout.as_secs()
                );
            }
        }
        warn!(
            application_id = application.id,
            application = %application.name,
            attempt,
            max_attempts = policy.max_attempts,
            error = %last_error,
            "Health check attempt failed."
        );
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.retry_backoff).await;
        }
    }
    Err(last_error)
}
