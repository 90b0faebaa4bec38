//! Ephemeral rate limiting for login attempts.
//!
//! Flow Overview:
//! 1) Track per-identifier attempt counts in a process-local map.
//! 2) Enforce a sliding window (5 attempts in 15 minutes by default).
//! 3) Trigger a 30-minute lockout when the window limit is exceeded.
//!
//! This layer is volatile on purpose: it absorbs high-frequency guessing
//! without a storage round-trip per attempt. The durable lockout ledger is
//! the authority that survives restarts.

use chrono::{DateTime, Duration, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_WINDOW_MINUTES: i64 = 15;
pub(crate) const DEFAULT_LOCKOUT_MINUTES: i64 = 30;

/// How often the background sweep prunes expired, unlocked entries.
pub const SWEEP_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5 * 60);

#[derive(Clone, Copy, Debug)]
pub struct RateLimitConfig {
    max_attempts: u32,
    window: Duration,
    lockout: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            window: Duration::minutes(DEFAULT_WINDOW_MINUTES),
            lockout: Duration::minutes(DEFAULT_LOCKOUT_MINUTES),
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    #[must_use]
    pub fn with_lockout(mut self, lockout: Duration) -> Self {
        self.lockout = lockout;
        self
    }

    #[must_use]
    pub fn lockout(&self) -> Duration {
        self.lockout
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { locked_until: Option<DateTime<Utc>> },
}

/// Advisory brute-force throttle consulted before any durable I/O.
///
/// This component never fails; it only advises.
pub trait RateLimiter: Send + Sync {
    fn check(&self, identifier: &str) -> RateLimitDecision;
    fn reset(&self, identifier: &str);
}

#[derive(Clone, Copy, Debug)]
struct AttemptEntry {
    count: u32,
    window_reset_at: DateTime<Utc>,
    locked_until: Option<DateTime<Utc>>,
}

/// In-memory sliding-window limiter keyed by normalized identifier.
///
/// Entries are created lazily on first attempt, pruned by the periodic sweep,
/// and lost entirely on restart.
#[derive(Debug)]
pub struct MemoryRateLimiter {
    config: RateLimitConfig,
    entries: Mutex<HashMap<String, AttemptEntry>>,
}

impl MemoryRateLimiter {
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    // The whole read-modify-write for an identifier runs under the lock, so
    // two concurrent attempts can never both observe the same count.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, AttemptEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn check_at(&self, identifier: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let mut entries = self.entries();

        let entry = match entries.entry(identifier.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(AttemptEntry {
                    count: 1,
                    window_reset_at: now + self.config.window,
                    locked_until: None,
                });
                return RateLimitDecision::Allowed {
                    remaining: self.config.max_attempts.saturating_sub(1),
                };
            }
            Entry::Occupied(slot) => slot.into_mut(),
        };

        // An active lockout rejects regardless of count or window state.
        if let Some(locked_until) = entry.locked_until {
            if locked_until > now {
                return RateLimitDecision::Limited {
                    locked_until: Some(locked_until),
                };
            }
        }

        // Window expired and no active lock: start a fresh window.
        if entry.window_reset_at <= now {
            entry.count = 1;
            entry.window_reset_at = now + self.config.window;
            entry.locked_until = None;
            return RateLimitDecision::Allowed {
                remaining: self.config.max_attempts.saturating_sub(1),
            };
        }

        entry.count += 1;
        if entry.count > self.config.max_attempts {
            let locked_until = now + self.config.lockout;
            entry.locked_until = Some(locked_until);
            warn!(identifier, %locked_until, "Attempt window exhausted, locking out");
            return RateLimitDecision::Limited {
                locked_until: Some(locked_until),
            };
        }

        RateLimitDecision::Allowed {
            remaining: self.config.max_attempts - entry.count,
        }
    }

    fn sweep_at(&self, now: DateTime<Utc>) {
        let mut entries = self.entries();
        let before = entries.len();
        // Checked at sweep time, not cached: keep anything still in its
        // window or carrying an active lockout.
        entries.retain(|_, entry| {
            entry.window_reset_at > now || entry.locked_until.is_some_and(|until| until > now)
        });
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Swept expired rate-limit entries");
        }
    }

    /// Prune entries whose window has expired and which carry no active
    /// lockout, bounding memory growth without disturbing active lockouts.
    pub fn sweep(&self) {
        self.sweep_at(Utc::now());
    }

    /// Spawn the periodic sweep task. The caller owns the handle and aborts
    /// it on shutdown.
    pub fn start_sweeper(
        self: &Arc<Self>,
        interval: std::time::Duration,
    ) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick fires immediately; skip it so a fresh map is not
            // swept at startup.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.sweep();
            }
        })
    }

    #[cfg(test)]
    fn entry_count(&self) -> usize {
        self.entries().len()
    }
}

impl RateLimiter for MemoryRateLimiter {
    fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, Utc::now())
    }

    fn reset(&self, identifier: &str) {
        self.entries().remove(identifier);
    }
}

/// Limiter that always allows; used in tests and as a wiring placeholder.
#[derive(Clone, Debug)]
pub struct NoopRateLimiter;

impl RateLimiter for NoopRateLimiter {
    fn check(&self, _identifier: &str) -> RateLimitDecision {
        RateLimitDecision::Allowed {
            remaining: u32::MAX,
        }
    }

    fn reset(&self, _identifier: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> MemoryRateLimiter {
        MemoryRateLimiter::new(RateLimitConfig::default())
    }

    #[test]
    fn first_attempt_creates_entry_with_decremented_remaining() {
        let limiter = limiter();
        let now = Utc::now();
        assert_eq!(
            limiter.check_at("a@x.com", now),
            RateLimitDecision::Allowed { remaining: 4 }
        );
        assert_eq!(limiter.entry_count(), 1);
    }

    #[test]
    fn exceeding_max_attempts_locks_out() {
        let limiter = limiter();
        let now = Utc::now();

        for remaining in (0u32..5).rev() {
            assert_eq!(
                limiter.check_at("a@x.com", now),
                RateLimitDecision::Allowed { remaining }
            );
        }

        // Sixth attempt within the window trips the lockout.
        let decision = limiter.check_at("a@x.com", now);
        let RateLimitDecision::Limited {
            locked_until: Some(locked_until),
        } = decision
        else {
            panic!("expected lockout, got {decision:?}");
        };
        assert_eq!(locked_until, now + Duration::minutes(30));

        // Lock holds regardless of further attempts.
        assert_eq!(
            limiter.check_at("a@x.com", now + Duration::minutes(29)),
            RateLimitDecision::Limited {
                locked_until: Some(locked_until)
            }
        );
    }

    #[test]
    fn lockout_expires_and_window_restarts() {
        let limiter = limiter();
        let now = Utc::now();
        for _ in 0..6 {
            limiter.check_at("a@x.com", now);
        }

        let later = now + Duration::minutes(31);
        assert_eq!(
            limiter.check_at("a@x.com", later),
            RateLimitDecision::Allowed { remaining: 4 }
        );
    }

    #[test]
    fn attempts_across_window_boundary_do_not_lock() {
        let limiter = limiter();
        let start = Utc::now();

        // 5 attempts spread over 20 minutes: the window resets before the
        // fifth, so no lockout triggers.
        for minute in [0, 5, 10, 16, 20] {
            let decision = limiter.check_at("a@x.com", start + Duration::minutes(minute));
            assert!(
                matches!(decision, RateLimitDecision::Allowed { .. }),
                "attempt at minute {minute} was limited"
            );
        }
    }

    #[test]
    fn identifiers_are_isolated() {
        let limiter = limiter();
        let now = Utc::now();
        for _ in 0..6 {
            limiter.check_at("a@x.com", now);
        }

        assert_eq!(
            limiter.check_at("b@x.com", now),
            RateLimitDecision::Allowed { remaining: 4 }
        );
    }

    #[test]
    fn reset_is_idempotent() {
        let limiter = limiter();
        limiter.check_at("a@x.com", Utc::now());
        limiter.reset("a@x.com");
        limiter.reset("a@x.com");
        assert_eq!(limiter.entry_count(), 0);
    }

    #[test]
    fn sweep_removes_expired_but_keeps_locked() {
        let limiter = limiter();
        let now = Utc::now();

        limiter.check_at("expired@x.com", now);
        for _ in 0..6 {
            limiter.check_at("locked@x.com", now);
        }

        // Past the window (15m) but inside the lockout (30m).
        limiter.sweep_at(now + Duration::minutes(20));
        assert_eq!(limiter.entry_count(), 1);

        let decision = limiter.check_at("locked@x.com", now + Duration::minutes(20));
        assert!(matches!(
            decision,
            RateLimitDecision::Limited { locked_until: Some(_) }
        ));

        // Past the lockout too: everything is sweepable.
        limiter.sweep_at(now + Duration::minutes(40));
        assert_eq!(limiter.entry_count(), 0);
    }

    #[test]
    fn noop_rate_limiter_allows() {
        let limiter = NoopRateLimiter;
        assert!(matches!(
            limiter.check("user@example.com"),
            RateLimitDecision::Allowed { .. }
        ));
        limiter.reset("user@example.com");
    }
}
