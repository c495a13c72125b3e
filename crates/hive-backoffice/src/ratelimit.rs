//! Rate limiting for authentication endpoints.
//!
//! Counters are kept behind the [`CounterStore`] trait so the in-memory map
//! used here (and in tests) can be swapped for a shared store when the back
//! office runs multi-instance. The trait's one operation is an atomic
//! increment-and-read with a TTL; callers compare the returned count against
//! their policy, so there is no check-then-increment window to race through.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::ApiError;

// =============================================================================
// Counter Store
// =============================================================================

/// A TTL'd counter keyed by identity (user id, client address).
pub trait CounterStore: Send + Sync {
    /// Atomically increments the counter for `key` and returns the new count.
    ///
    /// The first increment in a window starts the TTL; once it elapses the
    /// next increment starts a fresh window at 1.
    fn increment(&self, key: &str, ttl: Duration) -> u64;

    /// Drops the counter for `key` (e.g. after a successful login).
    fn reset(&self, key: &str);
}

/// In-memory counter store: a single locked map.
///
/// Suitable for a single-instance deployment and for tests; expired entries
/// are dropped lazily on their next touch.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    entries: Mutex<HashMap<String, (u64, Instant)>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for MemoryCounterStore {
    fn increment(&self, key: &str, ttl: Duration) -> u64 {
        let mut entries = self.entries.lock().expect("counter store mutex poisoned");
        let now = Instant::now();

        let entry = entries
            .entry(key.to_string())
            .and_modify(|(count, expires_at)| {
                if *expires_at <= now {
                    *count = 0;
                    *expires_at = now + ttl;
                }
                *count += 1;
            })
            .or_insert((1, now + ttl));

        entry.0
    }

    fn reset(&self, key: &str) {
        let mut entries = self.entries.lock().expect("counter store mutex poisoned");
        entries.remove(key);
    }
}

// =============================================================================
// Rate Limiter
// =============================================================================

/// Attempts allowed per identity within a rolling window.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitPolicy {
    pub max_attempts: u64,
    pub window: Duration,
}

/// Rate limiter for the login and SMS-send endpoints.
///
/// Checked before credentials are touched, so a flood of requests burns the
/// limit without ever probing passwords. The store is injected, never a
/// process global.
pub struct RateLimiter {
    store: std::sync::Arc<dyn CounterStore>,
    login: RateLimitPolicy,
    sms: RateLimitPolicy,
}

impl RateLimiter {
    pub fn new(
        store: std::sync::Arc<dyn CounterStore>,
        login: RateLimitPolicy,
        sms: RateLimitPolicy,
    ) -> Self {
        RateLimiter { store, login, sms }
    }

    /// Registers a login attempt for `key`; errors once over the limit.
    pub fn check_login(&self, key: &str) -> Result<(), ApiError> {
        let count = self.store.increment(&format!("login:{key}"), self.login.window);
        if count > self.login.max_attempts {
            return Err(ApiError::RateLimited(
                "Too many login attempts. Please wait before trying again".to_string(),
            ));
        }
        Ok(())
    }

    /// Registers an SMS-code send for `key`; errors once over the limit.
    pub fn check_sms(&self, key: &str) -> Result<(), ApiError> {
        let count = self.store.increment(&format!("sms:{key}"), self.sms.window);
        if count > self.sms.max_attempts {
            return Err(ApiError::RateLimited(
                "Too many SMS requests. Please wait before requesting another code".to_string(),
            ));
        }
        Ok(())
    }

    /// Clears the login counter after a successful authentication.
    pub fn clear_login(&self, key: &str) {
        self.store.reset(&format!("login:{key}"));
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
