//! Traffic reset runs against a live PostgreSQL server.
//!
//! Set `TRAFFIC_RESET_TEST_POSTGRES_URL` to a scratch database to run these;
//! without it every test returns early. The `clients` table is dropped and
//! recreated by each test.

#![cfg(feature = "postgres")]

use std::env;

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use serial_test::serial;
use sqlx::postgres::PgPoolOptions;

use traffic_reset::jobs::{run_traffic_reset_at, CommitMode, JobError};
use traffic_reset::server::Database;
use traffic_reset::{Client, TrafficStore};

const GB: i64 = 1024 * 1024 * 1024;

/// Helper: connect and create a `clients` table whose row 3 rejects zeroed counters.
async fn setup_test_db() -> Option<Database> {
    let Ok(url) = env::var("TRAFFIC_RESET_TEST_POSTGRES_URL") else {
        eprintln!("TRAFFIC_RESET_TEST_POSTGRES_URL not set, skipping");
        return None;
    };

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("db connect failed");

    sqlx::query("DROP TABLE IF EXISTS clients")
        .execute(&pool)
        .await
        .expect("clients table drop failed");

    sqlx::query(
        r#"
        CREATE TABLE clients (
            id                 BIGINT PRIMARY KEY,
            name               TEXT NOT NULL,
            traffic_reset_day  INTEGER NOT NULL DEFAULT 0,
            expiry             BIGINT NOT NULL DEFAULT 0,
            last_traffic_reset BIGINT NOT NULL DEFAULT 0,
            up                 BIGINT NOT NULL DEFAULT 0,
            down               BIGINT NOT NULL DEFAULT 0,
            CHECK (id <> 3 OR up > 0)
        )
        "#,
    )
    .execute(&pool)
    .await
    .expect("clients table create failed");

    Some(Database::Postgres(pool))
}

async fn insert(db: &Database, id: i64, last_reset: i64) {
    db.insert_client(&Client {
        id,
        name: format!("client-{id}"),
        traffic_reset_day: 0,
        expiry: 0,
        last_traffic_reset: last_reset,
        up: 5 * GB,
        down: 3 * GB,
    })
    .await
    .expect("failed to insert client");
}

fn reset_day() -> DateTime<FixedOffset> {
    Utc.with_ymd_and_hms(2025, 6, 22, 12, 0, 0)
        .unwrap()
        .fixed_offset()
}

async fn counters(db: &Database, id: i64) -> (i64, i64, i64) {
    let c = db.get_client(id).await.unwrap().expect("client missing");
    (c.up, c.down, c.last_traffic_reset)
}

#[tokio::test]
#[serial]
async fn failed_update_does_not_abort_the_postgres_transaction() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    let now = reset_day();
    let due = (now - Duration::days(35)).timestamp();
    for id in [1, 3, 4] {
        insert(&db, id, due).await;
    }

    let summary = run_traffic_reset_at(&db, &now, CommitMode::BestEffort)
        .await
        .expect("per-client failures must not fail the run");

    assert_eq!(summary.candidates, 3);
    assert_eq!(summary.reset, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(counters(&db, 1).await, (0, 0, now.timestamp()));
    assert_eq!(counters(&db, 3).await, (5 * GB, 3 * GB, due));
    assert_eq!(counters(&db, 4).await, (0, 0, now.timestamp()));
}

#[tokio::test]
#[serial]
async fn all_or_nothing_rolls_back_on_postgres() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    let now = reset_day();
    let due = (now - Duration::days(35)).timestamp();
    for id in [1, 3, 4] {
        insert(&db, id, due).await;
    }

    let result = run_traffic_reset_at(&db, &now, CommitMode::AllOrNothing).await;

    assert!(matches!(result, Err(JobError::ExecutionError(_))));
    for id in [1, 3, 4] {
        assert_eq!(counters(&db, id).await, (5 * GB, 3 * GB, due));
    }
}

#[tokio::test]
#[serial]
async fn update_after_a_failed_one_commits() {
    let Some(db) = setup_test_db().await else {
        return;
    };
    insert(&db, 3, 0).await;
    insert(&db, 4, 0).await;

    let mut tx = db.begin().await.expect("begin failed");
    assert!(db.reset_client_traffic(&mut tx, 3, 1_750_000_000).await.is_err());
    db.reset_client_traffic(&mut tx, 4, 1_750_000_000)
        .await
        .expect("transaction must stay usable");
    db.commit(tx).await.expect("commit failed");

    assert_eq!(counters(&db, 4).await, (0, 0, 1_750_000_000));
}
