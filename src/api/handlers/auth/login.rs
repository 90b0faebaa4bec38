//! Login, session, and logout endpoints.

use axum::{
    extract::Extension,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use secrecy::SecretString;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::{
    session::{clear_session_cookie, extract_session_token, session_cookie},
    state::AuthState,
    types::{LoginRequest, LoginResponse, SessionResponse},
    utils::{extract_login_origin, normalize_identifier, valid_identifier},
    verifier::{self, Denial, VerifyOutcome},
};

fn denial_status(denial: Denial) -> StatusCode {
    match denial {
        Denial::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        Denial::AccountLocked { .. } => StatusCode::LOCKED,
        Denial::InvalidCredentials => StatusCode::UNAUTHORIZED,
        Denial::Infrastructure => StatusCode::SERVICE_UNAVAILABLE,
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, session cookie set", body = LoginResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Invalid credentials", body = String),
        (status = 423, description = "Account locked", body = String),
        (status = 429, description = "Rate limited", body = String),
        (status = 503, description = "Credential store unavailable", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let identifier = normalize_identifier(&request.identifier);
    if !valid_identifier(&identifier) {
        return (StatusCode::BAD_REQUEST, "Invalid identifier".to_string()).into_response();
    }

    let secret = SecretString::from(request.secret);
    let origin = extract_login_origin(&headers);

    match verifier::verify(&pool, &auth_state, &identifier, &secret, &origin).await {
        VerifyOutcome::Granted(granted) => {
            let token = match auth_state
                .signer()
                .issue(granted.admin_id, &granted.identifier, &granted.role)
            {
                Ok(token) => token,
                Err(err) => {
                    error!("Failed to sign session claims: {err}");
                    return (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Authentication service unavailable".to_string(),
                    )
                        .into_response();
                }
            };

            let mut response_headers = HeaderMap::new();
            match session_cookie(auth_state.config().secure_cookies(), &token) {
                Ok(cookie) => {
                    response_headers.insert(SET_COOKIE, cookie);
                }
                Err(err) => {
                    error!("Failed to build session cookie: {err}");
                    return (
                        StatusCode::SERVICE_UNAVAILABLE,
                        "Authentication service unavailable".to_string(),
                    )
                        .into_response();
                }
            }

            let response = LoginResponse {
                admin_id: granted.admin_id.to_string(),
                identifier: granted.identifier,
                role: granted.role,
            };
            (StatusCode::OK, response_headers, Json(response)).into_response()
        }
        VerifyOutcome::Denied(denial) => {
            (denial_status(denial), denial.to_string()).into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(headers: HeaderMap, auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // Missing or invalid cookies are "no session", never an error.
    let Some(token) = extract_session_token(&headers) else {
        return StatusCode::NO_CONTENT.into_response();
    };
    let Some(claims) = auth_state.signer().verify(&token) else {
        return StatusCode::NO_CONTENT.into_response();
    };

    // Sliding re-issuance: stale claims get a fresh cookie while the holder
    // stays active.
    let mut response_headers = HeaderMap::new();
    let claims = match auth_state.signer().refresh(&claims) {
        Ok(Some(refreshed)) => {
            if let Ok(cookie) =
                session_cookie(auth_state.config().secure_cookies(), &refreshed)
            {
                response_headers.insert(SET_COOKIE, cookie);
            }
            auth_state.signer().verify(&refreshed).unwrap_or(claims)
        }
        Ok(None) => claims,
        Err(err) => {
            error!("Failed to refresh session claims: {err}");
            claims
        }
    };

    let response = SessionResponse {
        admin_id: claims.admin_id.to_string(),
        identifier: claims.identifier,
        role: claims.role,
        expires_at: claims.expires_at,
    };
    (StatusCode::OK, response_headers, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // Claims are client-held; logout just clears the cookie. Idempotent.
    let mut response_headers = HeaderMap::new();
    match clear_session_cookie(auth_state.config().secure_cookies()) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => error!("Failed to build clearing cookie: {err}"),
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denial_maps_to_status() {
        assert_eq!(
            denial_status(Denial::RateLimited { retry_minutes: 1 }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            denial_status(Denial::AccountLocked { retry_minutes: 1 }),
            StatusCode::LOCKED
        );
        assert_eq!(
            denial_status(Denial::InvalidCredentials),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            denial_status(Denial::Infrastructure),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
