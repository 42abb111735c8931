use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use salon_queue::config::AppConfig;
use salon_queue::db::{self, queries::PgQueueHistory, QueueHistory};
use salon_queue::directory::{PgSalonDirectory, SalonDirectory};
use salon_queue::models::QueueStatus;
use salon_queue::services::fanout::EventBus;
use salon_queue::services::store::{QueuePolicy, QueueStore};
use salon_queue::services::verification::CheckInAttempt;

/// Integration test: full queue lifecycle against Postgres
///
/// This test verifies the complete integration:
/// 1. Database connection and schema
/// 2. Salon directory resolution
/// 3. Queue lifecycle (join/check-in/advance/complete)
/// 4. Write-ahead history (restore from a fresh store)
/// 5. Review stamping on terminal entries
///
/// Note: This requires a running PostgreSQL instance configured via
/// environment variables.
#[tokio::test]
#[ignore] // Run with: cargo test --test integration_test -- --ignored
async fn test_full_queue_lifecycle() {
    // Load config from environment
    let config = AppConfig::from_env().expect("Failed to load config");

    // Initialize database
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run migrations");

    // Seed a salon with one service
    let salon_id = Uuid::new_v4();
    let service_id = Uuid::new_v4();
    sqlx::query("INSERT INTO salons (id, name, latitude, longitude) VALUES ($1, $2, $3, $4)")
        .bind(salon_id)
        .bind("Integration Test Salon")
        .bind(40.7484)
        .bind(-73.9857)
        .execute(&db_pool)
        .await
        .expect("Failed to seed salon");
    sqlx::query(
        "INSERT INTO salon_services (id, salon_id, name, price_cents, duration_minutes) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(service_id)
    .bind(salon_id)
    .bind("Cut")
    .bind(4_500_i64)
    .bind(30_i64)
    .execute(&db_pool)
    .await
    .expect("Failed to seed service");

    // 1. Test directory resolution
    let directory = PgSalonDirectory::new(db_pool.clone());
    let profile = directory
        .resolve(salon_id)
        .await
        .expect("Failed to resolve salon")
        .expect("Salon not found");
    assert_eq!(profile.catalogue.len(), 1);

    // 2. Test the queue lifecycle through the durable store
    let history = Arc::new(PgQueueHistory::new(db_pool.clone()));
    let store = QueueStore::new(
        history.clone(),
        Arc::new(EventBus::default()),
        QueuePolicy::default(),
    );

    let user_id = format!("it-user-{}", Uuid::new_v4());
    let services = profile
        .select_services(&[service_id])
        .expect("Failed to select services");
    let entry = store
        .join(&profile, &user_id, services)
        .await
        .expect("Failed to join queue");

    assert_eq!(entry.position, Some(1));
    assert_eq!(entry.status, QueueStatus::Notified);
    assert_eq!(entry.total_duration_minutes, 30);

    // 3. Check in from the salon's doorstep
    let outcome = store
        .submit_check_in(
            entry.id,
            CheckInAttempt {
                latitude: Some(40.7485),
                longitude: Some(-73.9857),
                accuracy_m: Some(15.0),
                captured_at: Utc::now(),
            },
        )
        .await
        .expect("Failed to check in");
    assert_eq!(outcome.entry.status, QueueStatus::Nearby);

    // 4. Test restore from the write-ahead history in a fresh store
    let restored_store = QueueStore::new(
        history.clone(),
        Arc::new(EventBus::default()),
        QueuePolicy::default(),
    );
    let restored = restored_store
        .restore(&directory)
        .await
        .expect("Failed to restore");
    assert!(restored >= 1, "expected at least the live entry back");
    let snapshot = restored_store.snapshot(salon_id).await;
    let found = snapshot
        .entries
        .iter()
        .find(|e| e.id == entry.id)
        .expect("Live entry missing after restore");
    assert_eq!(found.status, QueueStatus::Nearby);

    // 5. Advance and complete on the original store
    let started = store
        .advance(salon_id)
        .await
        .expect("Failed to advance queue");
    assert_eq!(started.id, entry.id);
    assert_eq!(started.status, QueueStatus::InProgress);

    let done = store.complete(entry.id).await.expect("Failed to complete");
    assert_eq!(done.status, QueueStatus::Completed);
    assert!(done.completed_at.is_some());

    // 6. Test review stamping on the terminal row
    let stamped = history
        .mark_review_submitted(entry.id, &user_id, Utc::now())
        .await
        .expect("Failed to stamp review");
    assert!(stamped);
    let again = history
        .mark_review_submitted(entry.id, &user_id, Utc::now())
        .await
        .expect("Failed to re-stamp review");
    assert!(!again, "review must only be stampable once");

    // Cleanup
    sqlx::query("DELETE FROM queue_entries WHERE salon_id = $1")
        .bind(salon_id)
        .execute(&db_pool)
        .await
        .expect("Failed to delete test entries");
    sqlx::query("DELETE FROM salon_services WHERE salon_id = $1")
        .bind(salon_id)
        .execute(&db_pool)
        .await
        .expect("Failed to delete test services");
    sqlx::query("DELETE FROM salons WHERE id = $1")
        .bind(salon_id)
        .execute(&db_pool)
        .await
        .expect("Failed to delete test salon");

    println!("✅ All integration tests passed!");
}
