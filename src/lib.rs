//! # Vigilo (Admin Credential Gateway)
//!
//! `vigilo` authenticates administrators with an identifier/secret pair and
//! defends the login surface against brute-force guessing with two cooperating
//! layers:
//!
//! - an **ephemeral rate limiter**: a process-local sliding attempt window
//!   with temporary lockout, cheap to consult and deliberately lost on
//!   restart;
//! - a **durable lockout ledger**: per-account failure counters and lock
//!   timestamps stored next to the credential record, surviving restarts and
//!   shared across instances.
//!
//! Both layers must independently permit an attempt before the stored secret
//! hash is even consulted. A successful verification clears both layers and
//! hands the identity to the session issuer, which mints signed, time-bounded
//! claims carried in an `HttpOnly` cookie and silently re-signed while
//! requests keep arriving.
//!
//! Failure policy is **fail closed**: an unreachable or slow credential store
//! denies the attempt rather than letting it through.

pub mod api;
pub mod cli;
