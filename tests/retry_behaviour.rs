//! Retry wrapper behaviour over plain operations.

use std::time::Duration;

use tokio::time::Instant;

use finance_store::db::DbError;
use finance_store::resilience::backoff::cumulative_backoff;
use finance_store::resilience::classify::{is_transient, Classify};
use finance_store::{Database, RetryPolicy};

mod common;

use common::{memory_database, statement_exists, statement_missing};

#[tokio::test(start_paused = true)]
async fn test_first_attempt_success() {
    let db = memory_database();
    let start = Instant::now();
    let mut calls = 0;

    let result: Result<&str, DbError> = db
        .with_retry(|| {
            calls += 1;
            async { Ok("balance loaded") }
        })
        .await;

    assert_eq!(result, Ok("balance loaded"));
    assert_eq!(calls, 1);
    assert_eq!(db.client().disconnect_count(), 0);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_non_transient_error_is_not_retried() {
    let db = memory_database();
    let start = Instant::now();
    let mut calls = 0;

    let result: Result<(), DbError> = db
        .with_retry_limit(
            || {
                calls += 1;
                async { Err(DbError::new("unique constraint violated")) }
            },
            3,
        )
        .await;

    assert_eq!(result, Err(DbError::new("unique constraint violated")));
    assert_eq!(calls, 1);
    assert_eq!(db.client().disconnect_count(), 0);
    assert_eq!(db.client().connect_count(), 0);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_recovers_after_two_statement_errors() {
    let db = memory_database();
    let start = Instant::now();
    let mut calls = 0;

    let result: Result<&str, DbError> = db
        .with_retry_limit(
            || {
                calls += 1;
                let attempt = calls;
                async move {
                    if attempt <= 2 {
                        Err(statement_exists())
                    } else {
                        Ok("ok")
                    }
                }
            },
            3,
        )
        .await;

    assert_eq!(result, Ok("ok"));
    assert_eq!(calls, 3);
    assert_eq!(db.client().disconnect_count(), 2);
    assert_eq!(db.client().connect_count(), 2);

    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(300), "waited {:?}", waited);
    assert!(waited < Duration::from_millis(310), "waited {:?}", waited);
}

#[tokio::test(start_paused = true)]
async fn test_success_on_attempt_k() {
    for k in 1..=4u32 {
        let db = Database::with_policy(
            finance_store::db::MemoryClient::new(),
            RetryPolicy::new(4, 100),
        );
        let start = Instant::now();
        let mut calls = 0;

        let result: Result<u32, DbError> = db
            .with_retry(|| {
                calls += 1;
                let attempt = calls;
                async move {
                    if attempt < k {
                        Err(statement_missing(attempt))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result, Ok(k));
        assert_eq!(db.client().disconnect_count(), (k - 1) as usize);

        let expected = cumulative_backoff(k - 1, 100);
        let waited = start.elapsed();
        assert!(waited >= expected, "k={} waited {:?}", k, waited);
        assert!(waited < expected + Duration::from_millis(10), "k={} waited {:?}", k, waited);
    }
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_returns_final_error() {
    let db = Database::with_policy(
        finance_store::db::MemoryClient::new(),
        RetryPolicy::new(4, 100),
    );
    let mut calls = 0;

    let result: Result<(), DbError> = db
        .with_retry(|| {
            calls += 1;
            let attempt = calls;
            async move { Err(statement_missing(attempt)) }
        })
        .await;

    assert_eq!(result, Err(statement_missing(4)));
    assert_eq!(calls, 4);
    assert_eq!(db.client().disconnect_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_transient_then_permanent_error() {
    let db = memory_database();
    let mut calls = 0;

    let result: Result<(), DbError> = db
        .with_retry(|| {
            calls += 1;
            let attempt = calls;
            async move {
                if attempt == 1 {
                    Err(statement_exists())
                } else {
                    Err(DbError::with_code("23503", "foreign key constraint failed"))
                }
            }
        })
        .await;

    assert_eq!(
        result,
        Err(DbError::with_code("23503", "foreign key constraint failed"))
    );
    assert_eq!(calls, 2);
    assert_eq!(db.client().disconnect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_configured_backoff_unit() {
    let config = finance_store::config::RetryConfig {
        max_attempts: 3,
        base_delay_ms: 25,
        coalesce_refresh: true,
    };
    let db = Database::new(finance_store::db::MemoryClient::new(), &config);
    let start = Instant::now();

    let result: Result<(), DbError> = db.with_retry(|| async { Err(statement_exists()) }).await;

    assert!(result.is_err());
    let waited = start.elapsed();
    assert!(waited >= Duration::from_millis(75), "waited {:?}", waited);
    assert!(waited < Duration::from_millis(85), "waited {:?}", waited);
}

#[test]
fn test_classification_samples() {
    assert!(statement_exists().is_transient());
    assert!(statement_missing(7).is_transient());
    assert!(DbError::new("prepared statement \"s3\" already exists").is_transient());
    assert!(is_transient("", Some("42P05")));
    assert!(is_transient("", Some("26000")));

    assert!(!DbError::new("unique constraint violated").is_transient());
    assert!(!DbError::with_code("P2025", "Record to update not found.").is_transient());
    assert!(!DbError::with_code("57P01", "terminating connection due to administrator command")
        .is_transient());
}
