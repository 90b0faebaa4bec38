//! Auth handlers and supporting modules.
//!
//! This module coordinates the two abuse-prevention layers and the login
//! flow around them.
//!
//! ## Rate limiting
//!
//! - **Ephemeral**: 5 attempts per identifier in a 15-minute window, then a
//!   30-minute in-memory lockout. Volatile by design; swept periodically.
//! - **Durable**: 5 failed verifications lock the account row for 30 minutes.
//!   Survives restarts and is shared across instances.
//!
//! Both layers must allow an attempt before the stored hash is consulted.
//!
//! ## Sessions
//!
//! Successful verification mints HMAC-signed claims with a 2-hour expiry,
//! re-signed silently once they age past 30 minutes.

pub mod lockout;
pub mod login;
pub mod rate_limit;
pub mod session;
mod state;
pub mod types;
pub mod utils;
pub mod verifier;

pub use rate_limit::{
    MemoryRateLimiter, NoopRateLimiter, RateLimitConfig, RateLimiter, SWEEP_INTERVAL,
};
pub use state::{AuthConfig, AuthState};
