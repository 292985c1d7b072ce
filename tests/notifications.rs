mod common;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};

use appwatch::db::entities::{application, user};
use appwatch::db::enums::{IncidentStatus, NotificationChannel, SubscriptionTarget};
use appwatch::db::services::subscription_service;
use appwatch::notifications::models::{IncidentEvent, IncidentEventKind};
use appwatch::notifications::service::NotificationService;

async fn set_slack_webhook(
    db: &sea_orm::DatabaseConnection,
    user: user::Model,
    url: &str,
) -> user::Model {
    let mut active: user::ActiveModel = user.into();
    active.slack_webhook_url = Set(Some(url.to_string()));
    active.updated_at = Set(Utc::now());
    active.update(db).await.unwrap()
}

#[tokio::test]
async fn fans_out_to_every_webhook_subscriber() {
    let db = common::setup_db().await;
    let (base, captured) = common::spawn_capture_server().await;

    let owner = common::create_user(&db, "owner").await;
    let app = common::insert_application(&db, owner.id, "Shop API", "http://localhost:1").await;

    let channels = [
        ("alice", NotificationChannel::Slack),
        ("bob", NotificationChannel::Teams),
        ("carol", NotificationChannel::Discord),
    ];
    for (name, channel) in channels {
        let user = common::create_user(&db, name).await;
        subscription_service::subscribe(
            &db,
            user.id,
            SubscriptionTarget::Application(app.id),
            &[channel],
            None,
            Some(format!("{base}/hook/{name}")),
        )
        .await
        .unwrap();
    }

    let incident = common::insert_incident(&db, app.id, owner.id, IncidentStatus::Open).await;
    let event = IncidentEvent {
        kind: IncidentEventKind::Created,
        incident,
    };

    let delivered = NotificationService::new(db.clone())
        .dispatch(&event)
        .await
        .unwrap();
    assert_eq!(delivered, 3);

    let requests = captured.requests();
    assert_eq!(requests.len(), 3);
    let mut paths: Vec<_> = requests.iter().map(|r| r.path.as_str()).collect();
    paths.sort();
    assert_eq!(paths, vec!["/hook/alice", "/hook/bob", "/hook/carol"]);
    for request in &requests {
        assert!(request.body.contains("Server Error"));
        assert!(request.body.contains("Shop API"));
    }
}

#[tokio::test]
async fn one_failing_webhook_does_not_block_the_rest() {
    let db = common::setup_db().await;
    let (base, captured) = common::spawn_capture_server().await;

    let owner = common::create_user(&db, "owner").await;
    let app = common::insert_application(&db, owner.id, "Shop API", "http://localhost:1").await;

    let targets = [
        ("alice", format!("{base}/hook/alice")),
        ("bob", format!("{base}/fail")),
        ("carol", format!("{base}/hook/carol")),
    ];
    for (name, url) in &targets {
        let user = common::create_user(&db, name).await;
        subscription_service::subscribe(
            &db,
            user.id,
            SubscriptionTarget::Application(app.id),
            &[NotificationChannel::Slack],
            None,
            Some(url.clone()),
        )
        .await
        .unwrap();
    }

    let incident = common::insert_incident(&db, app.id, owner.id, IncidentStatus::Open).await;
    let event = IncidentEvent {
        kind: IncidentEventKind::Created,
        incident,
    };

    let delivered = NotificationService::new(db.clone())
        .dispatch(&event)
        .await
        .unwrap();
    assert_eq!(delivered, 2);
    // All three were attempted, including the failing endpoint.
    assert_eq!(captured.requests().len(), 3);
}

#[tokio::test]
async fn duplicate_user_channel_pairs_deliver_once() {
    let db = common::setup_db().await;
    let (base, captured) = common::spawn_capture_server().await;

    let owner = common::create_user(&db, "owner").await;
    let now = Utc::now();
    let app = application::ActiveModel {
        user_id: Set(owner.id),
        application_group_id: Set(Some(7)),
        name: Set("Shop API".to_string()),
        url: Set("http://localhost:1".to_string()),
        url_to_watch: Set(None),
        expected_http_code: Set(200),
        monitoring_interval: Set(5),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&db)
    .await
    .unwrap();

    let subscriber = common::create_user(&db, "alice").await;
    subscription_service::subscribe(
        &db,
        subscriber.id,
        SubscriptionTarget::Application(app.id),
        &[NotificationChannel::Slack],
        None,
        Some(format!("{base}/hook/direct")),
    )
    .await
    .unwrap();
    subscription_service::subscribe(
        &db,
        subscriber.id,
        SubscriptionTarget::ApplicationGroup(7),
        &[NotificationChannel::Slack],
        None,
        Some(format!("{base}/hook/group")),
    )
    .await
    .unwrap();

    let incident = common::insert_incident(&db, app.id, owner.id, IncidentStatus::Open).await;
    let event = IncidentEvent {
        kind: IncidentEventKind::Created,
        incident,
    };

    let delivered = NotificationService::new(db.clone())
        .dispatch(&event)
        .await
        .unwrap();
    assert_eq!(delivered, 1);

    // The application-level subscription wins over the group-level one.
    let requests = captured.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/hook/direct");
}

#[tokio::test]
async fn owner_profile_acts_as_implicit_subscription() {
    let db = common::setup_db().await;
    let (base, captured) = common::spawn_capture_server().await;

    let owner = common::create_user(&db, "owner").await;
    let owner = set_slack_webhook(&db, owner, &format!("{base}/hook/owner")).await;
    let app = common::insert_application(&db, owner.id, "Shop API", "http://localhost:1").await;

    let incident = common::insert_incident(&db, app.id, owner.id, IncidentStatus::Open).await;
    let event = IncidentEvent {
        kind: IncidentEventKind::Created,
        incident,
    };

    let delivered = NotificationService::new(db.clone())
        .dispatch(&event)
        .await
        .unwrap();
    assert_eq!(delivered, 1);

    let requests = captured.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/hook/owner");
}

#[tokio::test]
async fn subscription_address_falls_back_to_user_profile() {
    let db = common::setup_db().await;
    let (base, captured) = common::spawn_capture_server().await;

    let owner = common::create_user(&db, "owner").await;
    let app = common::insert_application(&db, owner.id, "Shop API", "http://localhost:1").await;

    let subscriber = common::create_user(&db, "alice").await;
    let subscriber = set_slack_webhook(&db, subscriber, &format!("{base}/hook/profile")).await;
    subscription_service::subscribe(
        &db,
        subscriber.id,
        SubscriptionTarget::Application(app.id),
        &[NotificationChannel::Slack],
        None,
        None,
    )
    .await
    .unwrap();

    let incident = common::insert_incident(&db, app.id, owner.id, IncidentStatus::Open).await;
    let event = IncidentEvent {
        kind: IncidentEventKind::Created,
        incident,
    };

    let delivered = NotificationService::new(db.clone())
        .dispatch(&event)
        .await
        .unwrap();
    assert_eq!(delivered, 1);
    assert_eq!(captured.requests()[0].path, "/hook/profile");
}

#[tokio::test]
async fn unconfigured_channels_are_skipped() {
    let db = common::setup_db().await;
    let (_base, captured) = common::spawn_capture_server().await;

    let owner = common::create_user(&db, "owner").await;
    let app = common::insert_application(&db, owner.id, "Shop API", "http://localhost:1").await;

    // Discord subscription with no webhook anywhere, and no email address.
    let subscriber = common::create_user(&db, "alice").await;
    subscription_service::subscribe(
        &db,
        subscriber.id,
        SubscriptionTarget::Application(app.id),
        &[NotificationChannel::Discord],
        None,
        None,
    )
    .await
    .unwrap();

    let incident = common::insert_incident(&db, app.id, owner.id, IncidentStatus::Open).await;
    let event = IncidentEvent {
        kind: IncidentEventKind::Created,
        incident,
    };

    let delivered = NotificationService::new(db.clone())
        .dispatch(&event)
        .await
        .unwrap();
    assert_eq!(delivered, 0);
    assert!(captured.requests().is_empty());
}

#[tokio::test]
async fn resolved_events_render_as_green_resolution() {
    let db = common::setup_db().await;
    let (base, captured) = common::spawn_capture_server().await;

    let owner = common::create_user(&db, "owner").await;
    let app = common::insert_application(&db, owner.id, "Shop API", "http://localhost:1").await;

    let subscriber = common::create_user(&db, "alice").await;
    subscription_service::subscribe(
        &db,
        subscriber.id,
        SubscriptionTarget::Application(app.id),
        &[NotificationChannel::Slack],
        None,
        Some(format!("{base}/hook/alice")),
    )
    .await
    .unwrap();

    let incident = common::insert_incident(&db, app.id, owner.id, IncidentStatus::Resolved).await;
    let event = IncidentEvent {
        kind: IncidentEventKind::Resolved,
        incident,
    };

    NotificationService::new(db.clone())
        .dispatch(&event)
        .await
        .unwrap();

    let requests = captured.requests();
    assert_eq!(requests.len(), 1);
    let payload: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert!(payload["text"].as_str().unwrap().contains("*Resolved*"));
    assert_eq!(payload["attachments"][0]["color"], "good");
}
