use super::*;
use crate::state::test_helpers;
use time::macros::datetime;

#[test]
fn email_status_round_trips() {
    for status in [EmailStatus::Queued, EmailStatus::Sent, EmailStatus::Failed] {
        assert_eq!(EmailStatus::parse(status.as_str()), Some(status));
    }
    assert_eq!(EmailStatus::parse("bounced"), None);
}

#[test]
fn clamp_limit_applies_default_and_bounds() {
    assert_eq!(clamp_limit(None), DEFAULT_LIST_LIMIT);
    assert_eq!(clamp_limit(Some(0)), 1);
    assert_eq!(clamp_limit(Some(-5)), 1);
    assert_eq!(clamp_limit(Some(10_000)), MAX_LIST_LIMIT);
    assert_eq!(clamp_limit(Some(25)), 25);
}

#[test]
fn email_log_serializes_camel_case() {
    let log = EmailLog {
        id: Uuid::nil(),
        client_id: None,
        recipient: "pat@example.com".into(),
        subject: "Hello".into(),
        template: "client_invite".into(),
        status: EmailStatus::Sent,
        error: None,
        is_read: true,
        sent_at: Some(datetime!(2024-02-01 09:30 UTC)),
        created_at: datetime!(2024-02-01 09:29 UTC),
    };
    let value = serde_json::to_value(&log).unwrap();
    assert_eq!(value["status"], "sent");
    assert_eq!(value["isRead"], true);
    assert_eq!(value["sentAt"], "2024-02-01T09:30:00Z");
}

#[tokio::test]
async fn client_users_cannot_list_logs() {
    let state = test_helpers::test_app_state();
    let user = test_helpers::user_with_role(Role::Client);
    let err = list_email_logs(&state.pool, &user, &EmailLogFilter::default())
        .await
        .expect_err("client role should be rejected before any query");
    assert!(matches!(err, EmailLogError::Access(AccessError::Forbidden)));
}

#[tokio::test]
async fn client_users_cannot_read_single_log() {
    let state = test_helpers::test_app_state();
    let user = test_helpers::user_with_role(Role::Client);
    let err = get_email_log(&state.pool, &user, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EmailLogError::Access(AccessError::Forbidden)));
}

// =============================================================================
// live database
// =============================================================================

#[cfg(feature = "live-db-tests")]
use std::collections::HashSet;

#[cfg(feature = "live-db-tests")]
async fn seed_client(pool: &PgPool, cpa_id: Uuid, service_center_id: Option<Uuid>) -> Uuid {
    sqlx::query_scalar("INSERT INTO clients (name, cpa_id, service_center_id) VALUES ('Log Co', $1, $2) RETURNING id")
        .bind(cpa_id)
        .bind(service_center_id)
        .fetch_one(pool)
        .await
        .expect("client insert should succeed")
}

#[cfg(feature = "live-db-tests")]
async fn seed_log(pool: &PgPool, client_id: Uuid) -> Uuid {
    let email = OutgoingEmail {
        to: "owner@example.com".into(),
        subject: "Hello".into(),
        html: "<p>Hello</p>".into(),
        template: "test",
        client_id: Some(client_id),
    };
    insert_queued(pool, &email).await.expect("log insert should succeed")
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn staff_see_only_logs_of_their_clients() {
    let pool = test_helpers::integration_pool().await;
    let cpa_x = test_helpers::insert_user(&pool, Role::Cpa, None).await;
    let cpa_y = test_helpers::insert_user(&pool, Role::Cpa, None).await;
    let center = test_helpers::insert_user(&pool, Role::ServiceCenter, None).await;

    let assisted = seed_client(&pool, cpa_x.id, Some(center.id)).await;
    let solo = seed_client(&pool, cpa_x.id, None).await;
    let foreign = seed_client(&pool, cpa_y.id, None).await;
    let assisted_log = seed_log(&pool, assisted).await;
    let solo_log = seed_log(&pool, solo).await;
    let foreign_log = seed_log(&pool, foreign).await;

    let ids = |logs: Vec<EmailLog>| logs.into_iter().map(|l| l.id).collect::<HashSet<Uuid>>();

    let everything = EmailLogFilter::default();
    let seen = ids(list_email_logs(&pool, &cpa_x, &everything).await.unwrap());
    assert_eq!(seen, HashSet::from([assisted_log, solo_log]));
    let seen = ids(list_email_logs(&pool, &cpa_y, &everything).await.unwrap());
    assert_eq!(seen, HashSet::from([foreign_log]));
    let seen = ids(list_email_logs(&pool, &center, &everything).await.unwrap());
    assert_eq!(seen, HashSet::from([assisted_log]));

    let narrowed = EmailLogFilter { client_id: Some(solo), ..EmailLogFilter::default() };
    let seen = ids(list_email_logs(&pool, &cpa_x, &narrowed).await.unwrap());
    assert_eq!(seen, HashSet::from([solo_log]));

    let err = list_email_logs(&pool, &center, &narrowed).await.unwrap_err();
    assert!(matches!(err, EmailLogError::Access(AccessError::NotFound(_))));
    let err = get_email_log(&pool, &cpa_y, solo_log).await.unwrap_err();
    assert!(matches!(err, EmailLogError::Access(_) | EmailLogError::NotFound(_)));

    let sent = EmailLogFilter { status: Some(EmailStatus::Sent), ..EmailLogFilter::default() };
    assert!(list_email_logs(&pool, &cpa_x, &sent).await.unwrap().is_empty());
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn client_users_cannot_list_logs() {
    let pool = test_helpers::integration_pool().await;
    let cpa = test_helpers::insert_user(&pool, Role::Cpa, None).await;
    let client_id = seed_client(&pool, cpa.id, None).await;
    let owner = test_helpers::insert_user(&pool, Role::Client, Some(client_id)).await;
    seed_log(&pool, client_id).await;

    let err = list_email_logs(&pool, &owner, &EmailLogFilter::default()).await.unwrap_err();
    assert!(matches!(err, EmailLogError::Access(AccessError::Forbidden)));
}
