//! Credential verifier: the login state machine.
//!
//! Flow Overview:
//! 1) Normalize the identifier and consult the ephemeral rate limiter.
//! 2) Look up the principal in the durable store (bounded by a timeout).
//! 3) Check the durable lockout ledger.
//! 4) Compare the secret against the stored hash (constant time).
//! 5) Update both layers from the outcome; mint a session only on success.
//!
//! Every denial and grant is logged with the identifier, never the secret.
//! Any store error or timeout fails closed: deny, never allow.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use std::sync::OnceLock;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    lockout,
    rate_limit::{RateLimitDecision, DEFAULT_LOCKOUT_MINUTES},
    state::AuthState,
    utils::normalize_identifier,
};

/// Why an attempt was denied.
///
/// `InvalidCredentials` is deliberately the same whether the identifier is
/// unknown or the secret is wrong, so callers cannot enumerate accounts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Denial {
    #[error("Too many attempts, try again in {retry_minutes} minutes")]
    RateLimited { retry_minutes: i64 },
    #[error("Account locked, try again in {retry_minutes} minutes")]
    AccountLocked { retry_minutes: i64 },
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Authentication service unavailable")]
    Infrastructure,
}

/// Verified identity handed to the session issuer.
#[derive(Clone, Debug)]
pub struct GrantedLogin {
    pub admin_id: Uuid,
    pub identifier: String,
    pub role: String,
}

#[derive(Debug)]
pub enum VerifyOutcome {
    Granted(GrantedLogin),
    Denied(Denial),
}

// Verifying unknown identifiers against this hash keeps their timing in line
// with the wrong-password path.
static DUMMY_HASH: OnceLock<String> = OnceLock::new();

fn dummy_hash() -> &'static str {
    DUMMY_HASH.get_or_init(|| {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(b"vigilo-equalizer", &salt)
            .map(|hash| hash.to_string())
            .unwrap_or_default()
    })
}

fn verify_secret(secret: &SecretString, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(secret.expose_secret().as_bytes(), &parsed)
        .is_ok()
}

/// Run the full verification state machine for one login attempt.
///
/// The ephemeral check runs before any durable I/O (cheap, reversible), and
/// durable state is only mutated after the secret comparison has actually
/// run.
pub async fn verify(
    pool: &PgPool,
    state: &AuthState,
    identifier: &str,
    secret: &SecretString,
    origin: &str,
) -> VerifyOutcome {
    let identifier = normalize_identifier(identifier);
    let now = Utc::now();

    // Fast in-memory layer first: no storage round-trip for hot abuse.
    if let RateLimitDecision::Limited { locked_until } = state.rate_limiter().check(&identifier) {
        let retry_minutes = locked_until
            .map_or(DEFAULT_LOCKOUT_MINUTES, |until| {
                lockout::remaining_minutes(until, now)
            });
        warn!(identifier, retry_minutes, "Login denied: rate limited");
        return VerifyOutcome::Denied(Denial::RateLimited { retry_minutes });
    }

    let timeout = state.config().store_timeout();
    let record = match tokio::time::timeout(timeout, lockout::lookup_admin(pool, &identifier)).await
    {
        Ok(Ok(record)) => record,
        Ok(Err(err)) => {
            error!(identifier, "Login denied: credential store error: {err}");
            return VerifyOutcome::Denied(Denial::Infrastructure);
        }
        Err(_) => {
            error!(
                identifier,
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                "Login denied: credential store timed out"
            );
            return VerifyOutcome::Denied(Denial::Infrastructure);
        }
    };

    // Unknown identifier or no stored hash: burn a comparison against the
    // dummy hash so the response shape and timing match a wrong password.
    let Some(record) = record else {
        let _ = verify_secret(secret, dummy_hash());
        info!(identifier, "Login denied: invalid credentials");
        return VerifyOutcome::Denied(Denial::InvalidCredentials);
    };
    let Some(stored_hash) = record.password_hash.as_deref() else {
        let _ = verify_secret(secret, dummy_hash());
        info!(identifier, "Login denied: invalid credentials");
        return VerifyOutcome::Denied(Denial::InvalidCredentials);
    };

    // Durable lockout survives restarts and is shared across instances.
    if let Some(until) = lockout::active_lock(record.locked_until, now) {
        let retry_minutes = lockout::remaining_minutes(until, now);
        warn!(identifier, retry_minutes, "Login denied: account locked");
        return VerifyOutcome::Denied(Denial::AccountLocked { retry_minutes });
    }

    if !verify_secret(secret, stored_hash) {
        // Persist immediately; the ledger must reflect every failed attempt
        // even if the process dies right after. A failed write is logged and
        // swallowed: the caller is denied either way, and surfacing an
        // infrastructure error here would reveal that the account exists.
        match tokio::time::timeout(timeout, lockout::record_failure(pool, record.id)).await {
            Ok(Ok(outcome)) => {
                if let Some(locked_until) = outcome.locked_until {
                    warn!(
                        identifier,
                        failed_attempts = outcome.failed_attempts,
                        %locked_until,
                        "Account locked after repeated failures"
                    );
                }
            }
            Ok(Err(err)) => error!(identifier, "Failed to persist failed attempt: {err}"),
            Err(_) => error!(identifier, "Timed out persisting failed attempt"),
        }
        info!(identifier, "Login denied: invalid credentials");
        return VerifyOutcome::Denied(Denial::InvalidCredentials);
    }

    // Durable reset first: granting without clearing the counters would
    // desynchronize the layers, so a failed reset fails closed.
    match tokio::time::timeout(timeout, lockout::record_success(pool, record.id, origin)).await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            error!(identifier, "Login denied: failed to clear ledger: {err}");
            return VerifyOutcome::Denied(Denial::Infrastructure);
        }
        Err(_) => {
            error!(identifier, "Login denied: timed out clearing ledger");
            return VerifyOutcome::Denied(Denial::Infrastructure);
        }
    }

    state.rate_limiter().reset(&identifier);
    info!(identifier, origin, "Login granted");

    VerifyOutcome::Granted(GrantedLogin {
        admin_id: record.id,
        identifier: record.email,
        role: record.role,
    })
}
