//! Shared fixtures for the integration tests: an in-memory SQLite schema
//! mirroring the production tables and a small axum server that captures
//! webhook deliveries.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Database, DatabaseConnection, Set};

use appwatch::db::entities::{application, incident, user};
use appwatch::db::enums::{IncidentSeverity, IncidentStatus};

const SCHEMA: &[&str] = &[
    "CREATE TABLE users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT,
        notification_email TEXT,
        slack_webhook_url TEXT,
        teams_webhook_url TEXT,
        discord_webhook_url TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE application_groups (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        description TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE applications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        application_group_id INTEGER,
        name TEXT NOT NULL,
        url TEXT NOT NULL,
        url_to_watch TEXT,
        expected_http_code INTEGER NOT NULL,
        monitoring_interval INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE incidents (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        application_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL,
        status TEXT NOT NULL,
        severity TEXT NOT NULL,
        response_code INTEGER,
        response_time INTEGER,
        error_message TEXT,
        started_at TEXT NOT NULL,
        ended_at TEXT,
        resolved_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE TABLE subscriptions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        subscribable_type TEXT NOT NULL,
        subscribable_id INTEGER NOT NULL,
        notification_channels TEXT NOT NULL,
        email TEXT,
        webhook_url TEXT,
        is_active INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
];

pub async fn setup_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect to in-memory sqlite");
    for statement in SCHEMA {
        db.execute_unprepared(statement).await.expect("create table");
    }
    db
}

pub async fn create_user(db: &DatabaseConnection, name: &str) -> user::Model {
    let now = Utc::now();
    user::ActiveModel {
        name: Set(name.to_string()),
        email: Set(format!("{name}@example.com")),
        password_hash: Set(None),
        notification_email: Set(None),
        slack_webhook_url: Set(None),
        teams_webhook_url: Set(None),
        discord_webhook_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert user")
}

/// Inserts an application row directly, bypassing the owner auto-subscribe
/// that the service layer performs.
pub async fn insert_application(
    db: &DatabaseConnection,
    user_id: i32,
    name: &str,
    url: &str,
) -> application::Model {
    let now = Utc::now();
    application::ActiveModel {
        user_id: Set(user_id),
        application_group_id: Set(None),
        name: Set(name.to_string()),
        url: Set(url.to_string()),
        url_to_watch: Set(None),
        expected_http_code: Set(200),
        monitoring_interval: Set(5),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert application")
}

/// Inserts an incident row directly, for tests exercising the manual
/// lifecycle operations.
pub async fn insert_incident(
    db: &DatabaseConnection,
    application_id: i32,
    user_id: i32,
    status: IncidentStatus,
) -> incident::Model {
    let now = Utc::now();
    incident::ActiveModel {
        application_id: Set(application_id),
        user_id: Set(user_id),
        title: Set("Server Error".to_string()),
        description: Set("Application returned HTTP 500. Error: 500 Internal Server Error".to_string()),
        status: Set(status),
        severity: Set(IncidentSeverity::High),
        response_code: Set(Some(500)),
        response_time: Set(Some(42)),
        error_message: Set(Some("500 Internal Server Error".to_string())),
        started_at: Set(now),
        ended_at: Set(None),
        resolved_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert incident")
}

/// Like [`insert_incident`] but with a chosen `started_at`/`created_at`, for
/// steering the scheduler's due computation.
pub async fn insert_incident_at(
    db: &DatabaseConnection,
    application_id: i32,
    user_id: i32,
    status: IncidentStatus,
    started_at: chrono::DateTime<Utc>,
) -> incident::Model {
    incident::ActiveModel {
        application_id: Set(application_id),
        user_id: Set(user_id),
        title: Set("Server Error".to_string()),
        description: Set("Application returned HTTP 500. Error: 500 Internal Server Error".to_string()),
        status: Set(status),
        severity: Set(IncidentSeverity::High),
        response_code: Set(Some(500)),
        response_time: Set(Some(42)),
        error_message: Set(Some("500 Internal Server Error".to_string())),
        started_at: Set(started_at),
        ended_at: Set(None),
        resolved_at: Set(None),
        created_at: Set(started_at),
        updated_at: Set(started_at),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert incident")
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub body: String,
}

#[derive(Default)]
pub struct CaptureState {
    pub requests: Mutex<Vec<CapturedRequest>>,
}

impl CaptureState {
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().expect("capture lock").clone()
    }
}

async fn capture_hook(
    State(state): State<Arc<CaptureState>>,
    Path(name): Path<String>,
    body: String,
) -> StatusCode {
    state
        .requests
        .lock()
        .expect("capture lock")
        .push(CapturedRequest {
            path: format!("/hook/{name}"),
            body,
        });
    StatusCode::OK
}

async fn failing_hook(State(state): State<Arc<CaptureState>>, body: String) -> StatusCode {
    state
        .requests
        .lock()
        .expect("capture lock")
        .push(CapturedRequest {
            path: "/fail".to_string(),
            body,
        });
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Starts a local capture server. `POST /hook/{name}` records the request and
/// answers 200; `POST /fail` records it and answers 500.
pub async fn spawn_capture_server() -> (String, Arc<CaptureState>) {
    let state = Arc::new(CaptureState::default());
    let app = Router::new()
        .route("/hook/{name}", post(capture_hook))
        .route("/fail", post(failing_hook))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind capture server");
    let addr: SocketAddr = listener.local_addr().expect("capture server addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("capture server");
    });

    (format!("http://{addr}"), state)
}

async fn health_endpoint(State(status): State<Arc<AtomicU16>>) -> StatusCode {
    StatusCode::from_u16(status.load(Ordering::SeqCst)).expect("valid status code")
}

/// Starts a local health endpoint whose status code can be flipped at
/// runtime, for simulating an outage and the subsequent recovery.
pub async fn spawn_health_server(initial_status: u16) -> (String, Arc<AtomicU16>) {
    let status = Arc::new(AtomicU16::new(initial_status));
    let app = Router::new()
        .route("/health", get(health_endpoint))
        .with_state(Arc::clone(&status));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind health server");
    let addr: SocketAddr = listener.local_addr().expect("health server addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("health server");
    });

    (format!("http://{addr}/health"), status)
}
