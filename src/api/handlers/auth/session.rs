//! Signed session claims and cookie handling.
//!
//! Claims are minted only after a successful verification, carried in an
//! `HttpOnly` cookie, and tamper-evident to holders: the token is
//! `base64url(claims_json) . base64url(hmac_sha256)` over the payload.
//!
//! Sessions roll forward: claims older than 30 minutes are silently re-signed
//! with a fresh issuance window on any authenticated request, so the 2-hour
//! expiry extends as long as activity continues.

use anyhow::{Context, Result};
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

pub const SESSION_COOKIE_NAME: &str = "vigilo_session";

/// Claims expire two hours after issuance.
pub const SESSION_TTL_SECONDS: i64 = 2 * 60 * 60;
/// Claims older than this are re-signed on the next authenticated request.
pub const SESSION_REFRESH_SECONDS: i64 = 30 * 60;

type HmacSha256 = Hmac<Sha256>;

/// Signed assertion of identity held by the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub admin_id: Uuid,
    pub identifier: String,
    pub role: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl SessionClaims {
    #[must_use]
    pub fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        now.timestamp() - self.issued_at
    }
}

/// Mints and verifies signed session claims.
pub struct SessionSigner {
    key: Vec<u8>,
}

impl SessionSigner {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        Self {
            key: secret.expose_secret().as_bytes().to_vec(),
        }
    }

    /// Issue fresh claims for a verified identity.
    ///
    /// # Errors
    /// Returns an error if serialization or signing fails.
    pub fn issue(&self, admin_id: Uuid, identifier: &str, role: &str) -> Result<String> {
        self.issue_at(admin_id, identifier, role, Utc::now())
    }

    fn issue_at(
        &self,
        admin_id: Uuid,
        identifier: &str,
        role: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let claims = SessionClaims {
            admin_id,
            identifier: identifier.to_string(),
            role: role.to_string(),
            issued_at: now.timestamp(),
            expires_at: now.timestamp() + SESSION_TTL_SECONDS,
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &SessionClaims) -> Result<String> {
        let payload = serde_json::to_vec(claims).context("failed to serialize session claims")?;
        let encoded = URL_SAFE_NO_PAD.encode(&payload);

        let mut mac =
            HmacSha256::new_from_slice(&self.key).context("failed to initialize session MAC")?;
        mac.update(encoded.as_bytes());
        let tag = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{encoded}.{tag}"))
    }

    /// Verify a presented token: signature first, then expiry.
    ///
    /// Returns `None` for anything invalid; callers treat that as "no
    /// session" rather than an error.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        self.verify_at(token, Utc::now())
    }

    fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Option<SessionClaims> {
        let (encoded, tag) = token.split_once('.')?;
        let tag = URL_SAFE_NO_PAD.decode(tag).ok()?;

        let mut mac = HmacSha256::new_from_slice(&self.key).ok()?;
        mac.update(encoded.as_bytes());
        // verify_slice is constant-time.
        mac.verify_slice(&tag).ok()?;

        let payload = URL_SAFE_NO_PAD.decode(encoded).ok()?;
        let claims: SessionClaims = serde_json::from_slice(&payload).ok()?;

        if claims.expires_at <= now.timestamp() {
            return None;
        }
        Some(claims)
    }

    /// Re-sign claims that have aged past the refresh threshold.
    ///
    /// Returns `Ok(None)` when the claims are still fresh.
    ///
    /// # Errors
    /// Returns an error if signing the replacement token fails.
    pub fn refresh(&self, claims: &SessionClaims) -> Result<Option<String>> {
        self.refresh_at(claims, Utc::now())
    }

    fn refresh_at(&self, claims: &SessionClaims, now: DateTime<Utc>) -> Result<Option<String>> {
        if claims.age_seconds(now) < SESSION_REFRESH_SECONDS {
            return Ok(None);
        }
        self.issue_at(claims.admin_id, &claims.identifier, &claims.role, now)
            .map(Some)
    }
}

/// Build the `HttpOnly` cookie carrying the signed claims.
pub fn session_cookie(secure: bool, token: &str) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={SESSION_TTL_SECONDS}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub fn clear_session_cookie(secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Pull the session token out of the request cookies, if present.
#[must_use]
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let header = headers.get(COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}
