//! Fixed-window rate limiting keyed by client identity.
//!
//! Each key gets a counter and the instant its window rolls over. A request
//! in an open window increments the counter until `max_requests` is reached;
//! the first request at or after the rollover starts a new window with a
//! count of one. Up to `2 * max_requests` requests can pass across a window
//! boundary; that is accepted behaviour of the fixed window.
//!
//! The table lives in this process only. Several instances behind a load
//! balancer each enforce the limit on their own.

use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config::RateLimitConfig;

/// Longest window the limiter will track.
const MAX_WINDOW: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Request admission keyed by client identity.
///
/// `FixedWindowLimiter` is the in-memory implementation; the gate only sees
/// this trait so a shared-store limiter can stand in for it.
pub trait RateLimiter: Send + Sync + std::fmt::Debug {
    /// Record one request for `key` and report whether it is within the limit.
    fn is_allowed(&self, key: &str) -> bool;

    /// Drop state for windows that have expired. Returns how many were removed.
    fn cleanup(&self) -> usize;

    /// Number of keys currently tracked.
    fn tracked_keys(&self) -> usize;
}

/// Snapshot of one key's window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateWindowEntry {
    pub key: String,
    pub count: u32,
    pub window_reset_at: Instant,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// In-memory fixed-window limiter.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    windows: DashMap<String, Window>,
    max_requests: u32,
    window: Duration,
}

impl FixedWindowLimiter {
    /// Create a limiter admitting `max_requests` per `window` per key.
    ///
    /// `max_requests == 0` rejects every request.
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window: window.min(MAX_WINDOW),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_millis(config.window_millis()))
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check `key` as of `now`.
    ///
    /// The whole read-modify-write happens while holding the map entry, so
    /// concurrent requests for one key are serialised.
    pub fn is_allowed_at(&self, key: &str, now: Instant) -> bool {
        if self.max_requests == 0 {
            return false;
        }

        let fresh = Window {
            count: 1,
            reset_at: now + self.window,
        };

        match self.windows.entry(key.to_owned()) {
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                true
            }
            Entry::Occupied(mut slot) => {
                let window = slot.get_mut();
                if now >= window.reset_at {
                    *window = fresh;
                    true
                } else if window.count < self.max_requests {
                    window.count += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Remove every window with `reset_at <= now`.
    pub fn cleanup_at(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, window| window.reset_at > now);
        before.saturating_sub(self.windows.len())
    }

    /// Current state for `key`, if tracked.
    pub fn entry(&self, key: &str) -> Option<RateWindowEntry> {
        self.windows.get(key).map(|window| RateWindowEntry {
            key: key.to_owned(),
            count: window.count,
            window_reset_at: window.reset_at,
        })
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn is_allowed(&self, key: &str) -> bool {
        self.is_allowed_at(key, Instant::now())
    }

    fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}
