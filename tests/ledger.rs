//! Durable ledger and verifier tests against a real database.
//!
//! Point `VIGILO_TEST_DSN` at a disposable PostgreSQL database to run these;
//! they skip themselves otherwise.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use secrecy::SecretString;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::sync::Arc;
use uuid::Uuid;
use vigilo::api::handlers::auth::{
    lockout,
    verifier::{self, Denial, VerifyOutcome},
    AuthConfig, AuthState, MemoryRateLimiter, NoopRateLimiter, RateLimitConfig,
};

const SCHEMA_SQL: &str = include_str!("../db/sql/01_vigilo.sql");

fn test_dsn() -> Option<String> {
    std::env::var("VIGILO_TEST_DSN").ok()
}

async fn get_test_pool(dsn: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(dsn)
        .await?;

    sqlx::Executor::execute(&pool, SCHEMA_SQL)
        .await
        .context("failed to execute schema SQL")?;

    Ok(pool)
}

fn hash_secret(secret: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("failed to hash secret: {err}"))?
        .to_string())
}

async fn insert_admin(pool: &PgPool, email: &str, secret: &str) -> Result<Uuid> {
    let row = sqlx::query("INSERT INTO admins (email, password_hash) VALUES ($1, $2) RETURNING id")
        .bind(email)
        .bind(hash_secret(secret)?)
        .fetch_one(pool)
        .await
        .context("failed to insert admin")?;
    Ok(row.get("id"))
}

fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

fn noop_state() -> AuthState {
    AuthState::new(
        AuthConfig::new(SecretString::from("test-signing-key".to_string())),
        Arc::new(NoopRateLimiter),
    )
}

fn limited_state() -> AuthState {
    AuthState::new(
        AuthConfig::new(SecretString::from("test-signing-key".to_string())),
        Arc::new(MemoryRateLimiter::new(RateLimitConfig::default())),
    )
}

#[tokio::test]
async fn failure_ceiling_sets_durable_lock_and_success_clears_it() -> Result<()> {
    let Some(dsn) = test_dsn() else {
        eprintln!("Skipping integration test: VIGILO_TEST_DSN not set");
        return Ok(());
    };
    let pool = get_test_pool(&dsn).await?;
    let email = unique_email("ledger");
    let admin_id = insert_admin(&pool, &email, "hunter2").await?;

    for attempt in 1..=4 {
        let outcome = lockout::record_failure(&pool, admin_id).await?;
        assert_eq!(outcome.failed_attempts, attempt);
        assert!(outcome.locked_until.is_none(), "locked too early");
    }

    // Fifth failure crosses the ceiling and must set the lock.
    let outcome = lockout::record_failure(&pool, admin_id).await?;
    assert_eq!(outcome.failed_attempts, 5);
    assert!(outcome.locked_until.is_some());

    lockout::record_success(&pool, admin_id, "10.0.0.1").await?;
    let record = lockout::lookup_admin(&pool, &email)
        .await?
        .context("admin disappeared")?;
    assert_eq!(record.failed_attempts, 0);
    assert!(record.locked_until.is_none());

    let row = sqlx::query("SELECT last_login_at, last_login_origin FROM admins WHERE id = $1")
        .bind(admin_id)
        .fetch_one(&pool)
        .await?;
    assert!(row
        .get::<Option<chrono::DateTime<chrono::Utc>>, _>("last_login_at")
        .is_some());
    assert_eq!(
        row.get::<Option<String>, _>("last_login_origin"),
        Some("10.0.0.1".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn durable_lock_denies_even_with_correct_secret() -> Result<()> {
    let Some(dsn) = test_dsn() else {
        eprintln!("Skipping integration test: VIGILO_TEST_DSN not set");
        return Ok(());
    };
    let pool = get_test_pool(&dsn).await?;
    let email = unique_email("locked");
    insert_admin(&pool, &email, "hunter2").await?;

    // Noop ephemeral limiter models a freshly restarted process: the durable
    // ledger alone must keep the account locked.
    let state = noop_state();
    let wrong = SecretString::from("wrong".to_string());
    for _ in 0..5 {
        let outcome = verifier::verify(&pool, &state, &email, &wrong, "unknown").await;
        assert!(matches!(
            outcome,
            VerifyOutcome::Denied(Denial::InvalidCredentials)
        ));
    }

    let right = SecretString::from("hunter2".to_string());
    let outcome = verifier::verify(&pool, &state, &email, &right, "unknown").await;
    let VerifyOutcome::Denied(Denial::AccountLocked { retry_minutes }) = outcome else {
        panic!("expected account lock, got {outcome:?}");
    };
    assert!((1..=30).contains(&retry_minutes));
    Ok(())
}

#[tokio::test]
async fn unknown_identifier_matches_wrong_secret_shape() -> Result<()> {
    let Some(dsn) = test_dsn() else {
        eprintln!("Skipping integration test: VIGILO_TEST_DSN not set");
        return Ok(());
    };
    let pool = get_test_pool(&dsn).await?;
    let email = unique_email("known");
    insert_admin(&pool, &email, "hunter2").await?;

    let state = noop_state();
    let wrong = SecretString::from("wrong".to_string());

    let against_known = verifier::verify(&pool, &state, &email, &wrong, "unknown").await;
    let against_unknown = verifier::verify(
        &pool,
        &state,
        &unique_email("ghost"),
        &wrong,
        "unknown",
    )
    .await;

    assert!(matches!(
        against_known,
        VerifyOutcome::Denied(Denial::InvalidCredentials)
    ));
    assert!(matches!(
        against_unknown,
        VerifyOutcome::Denied(Denial::InvalidCredentials)
    ));
    Ok(())
}

#[tokio::test]
async fn granted_login_clears_both_layers() -> Result<()> {
    let Some(dsn) = test_dsn() else {
        eprintln!("Skipping integration test: VIGILO_TEST_DSN not set");
        return Ok(());
    };
    let pool = get_test_pool(&dsn).await?;
    let email = unique_email("grant");
    let admin_id = insert_admin(&pool, &email, "hunter2").await?;

    let state = limited_state();
    let wrong = SecretString::from("wrong".to_string());
    for _ in 0..3 {
        verifier::verify(&pool, &state, &email, &wrong, "1.2.3.4").await;
    }

    let right = SecretString::from("hunter2".to_string());
    let outcome = verifier::verify(&pool, &state, &email, &right, "1.2.3.4").await;
    let VerifyOutcome::Granted(granted) = outcome else {
        panic!("expected grant, got {outcome:?}");
    };
    assert_eq!(granted.admin_id, admin_id);
    assert_eq!(granted.identifier, email);
    assert_eq!(granted.role, "administrator");

    let record = lockout::lookup_admin(&pool, &email)
        .await?
        .context("admin disappeared")?;
    assert_eq!(record.failed_attempts, 0);
    assert!(record.locked_until.is_none());

    // Ephemeral entry was reset too: a fresh window of attempts is available.
    for _ in 0..5 {
        let outcome = verifier::verify(&pool, &state, &email, &wrong, "1.2.3.4").await;
        assert!(
            matches!(outcome, VerifyOutcome::Denied(Denial::InvalidCredentials)),
            "ephemeral counter was not reset"
        );
    }
    Ok(())
}

#[tokio::test]
async fn ephemeral_limit_reports_rate_limited_not_account_locked() -> Result<()> {
    let Some(dsn) = test_dsn() else {
        eprintln!("Skipping integration test: VIGILO_TEST_DSN not set");
        return Ok(());
    };
    let pool = get_test_pool(&dsn).await?;

    // No durable record exists for this identifier, so any lockout can only
    // come from the ephemeral layer.
    let email = unique_email("ephemeral");
    let state = limited_state();
    let wrong = SecretString::from("wrong".to_string());

    for _ in 0..5 {
        let outcome = verifier::verify(&pool, &state, &email, &wrong, "unknown").await;
        assert!(matches!(
            outcome,
            VerifyOutcome::Denied(Denial::InvalidCredentials)
        ));
    }

    let outcome = verifier::verify(&pool, &state, &email, &wrong, "unknown").await;
    let VerifyOutcome::Denied(Denial::RateLimited { retry_minutes }) = outcome else {
        panic!("expected rate limit, got {outcome:?}");
    };
    assert!((1..=30).contains(&retry_minutes));
    Ok(())
}
