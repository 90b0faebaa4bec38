//! Request/response shapes for the auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Login payload. No `Debug` derive: the secret must never end up in logs.
#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub secret: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResponse {
    pub admin_id: String,
    pub identifier: String,
    pub role: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub admin_id: String,
    pub identifier: String,
    pub role: String,
    pub expires_at: i64,
}
