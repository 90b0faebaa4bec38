//! Durable lockout ledger kept on the admin credential record.
//!
//! The policy lives here; storage is plain `PostgreSQL`. Every failed attempt
//! is persisted immediately so the ledger reflects reality even if the
//! process crashes right after, and the ledger survives restarts that wipe
//! the ephemeral limiter.
//!
//! Scaling: the database synchronizes lock state across service instances.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

/// Failed attempts that trigger a durable account lock.
pub const FAILED_ATTEMPT_LIMIT: i32 = 5;
/// How long a durable lock holds.
pub const ACCOUNT_LOCK_MINUTES: i64 = 30;

/// Admin principal row, as read for verification.
#[derive(Clone, Debug)]
pub struct AdminRecord {
    pub id: Uuid,
    pub email: String,
    pub password_hash: Option<String>,
    pub role: String,
    pub failed_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Ledger state after persisting a failed attempt.
#[derive(Clone, Copy, Debug)]
pub struct FailureOutcome {
    pub failed_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Look up an admin by normalized email.
///
/// # Errors
/// Returns an error when the store is unreachable or the query fails.
pub async fn lookup_admin(pool: &PgPool, email: &str) -> Result<Option<AdminRecord>> {
    let query = r"
        SELECT id, email, password_hash, role, failed_attempts, locked_until
        FROM admins
        WHERE email = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT"
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup admin")?;

    Ok(row.map(|row| AdminRecord {
        id: row.get("id"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        role: row.get("role"),
        failed_attempts: row.get("failed_attempts"),
        locked_until: row.get("locked_until"),
    }))
}

/// Persist a failed attempt, locking the account when the counter reaches
/// the ceiling.
///
/// Increment and lock happen in one statement so that crossing the threshold
/// sets the lock even under concurrent writers.
///
/// # Errors
/// Returns an error when the store is unreachable or the row is gone.
pub async fn record_failure(pool: &PgPool, admin_id: Uuid) -> Result<FailureOutcome> {
    let query = r"
        UPDATE admins
        SET failed_attempts = failed_attempts + 1,
            locked_until = CASE
                WHEN failed_attempts + 1 >= $2
                    THEN NOW() + ($3 * INTERVAL '1 minute')
                ELSE locked_until
            END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING failed_attempts, locked_until
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE"
    );
    let row = sqlx::query(query)
        .bind(admin_id)
        .bind(FAILED_ATTEMPT_LIMIT)
        .bind(ACCOUNT_LOCK_MINUTES)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to record failed attempt")?;

    Ok(FailureOutcome {
        failed_attempts: row.get("failed_attempts"),
        locked_until: row.get("locked_until"),
    })
}

/// Clear the ledger after a successful verification and stamp the login
/// metadata.
///
/// # Errors
/// Returns an error when the store is unreachable.
pub async fn record_success(pool: &PgPool, admin_id: Uuid, origin: &str) -> Result<()> {
    let query = r"
        UPDATE admins
        SET failed_attempts = 0,
            locked_until = NULL,
            last_login_at = NOW(),
            last_login_origin = $2,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE"
    );
    sqlx::query(query)
        .bind(admin_id)
        .bind(origin)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to record successful login")?;
    Ok(())
}

/// Lock timestamp if it is still in the future.
#[must_use]
pub fn active_lock(
    locked_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    locked_until.filter(|until| *until > now)
}

/// Minutes left until a lock expires, rounded up for display.
#[must_use]
pub fn remaining_minutes(locked_until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = locked_until.signed_duration_since(now).num_seconds();
    if seconds <= 0 {
        0
    } else {
        (seconds + 59) / 60
    }
}
