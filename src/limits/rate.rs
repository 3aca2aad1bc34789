//! Per-identity sliding-window rate limiting.
//!
//! Each identity owns a queue of timestamps for accepted submissions.
//! Entries older than the window are evicted lazily on every call, so the
//! queue only ever holds timestamps inside the trailing window.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::consts::{DEFAULT_MAX_REQUESTS, DEFAULT_RATE_WINDOW};
use crate::identity::Identity;

/// Result of an [`RateLimiter::allowed`] check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// How long until the oldest entry ages out. `None` when allowed.
    pub retry_after: Option<Duration>,
}

pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    windows: Mutex<HashMap<Identity, VecDeque<Instant>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_RATE_WINDOW)
    }
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn allowed(&self, identity: Identity) -> RateDecision {
        self.allowed_at(identity, Instant::now())
    }

    pub fn allowed_at(&self, identity: Identity, now: Instant) -> RateDecision {
        let mut windows = self.lock();
        let Some(count) = self.evict(&mut windows, identity, now) else {
            return RateDecision {
                allowed: self.max_requests > 0,
                retry_after: (self.max_requests == 0).then_some(self.window),
            };
        };

        if count < self.max_requests {
            return RateDecision {
                allowed: true,
                retry_after: None,
            };
        }

        // evict() keeps the entry only while it is non-empty
        let oldest = windows
            .get(&identity)
            .and_then(|w| w.front().copied())
            .unwrap_or(now);
        let wait = self
            .window
            .saturating_sub(now.saturating_duration_since(oldest));
        RateDecision {
            allowed: false,
            retry_after: Some(wait),
        }
    }

    /// Consume one slot. Callers check [`allowed`](Self::allowed) first.
    pub fn record(&self, identity: Identity) {
        self.record_at(identity, Instant::now());
    }

    pub fn record_at(&self, identity: Identity, now: Instant) {
        let mut windows = self.lock();
        self.evict(&mut windows, identity, now);
        windows.entry(identity).or_default().push_back(now);
    }

    pub fn remaining(&self, identity: Identity) -> usize {
        self.remaining_at(identity, Instant::now())
    }

    pub fn remaining_at(&self, identity: Identity, now: Instant) -> usize {
        let mut windows = self.lock();
        let used = self.evict(&mut windows, identity, now).unwrap_or(0);
        self.max_requests.saturating_sub(used)
    }

    /// Drop stale timestamps for one identity. Returns the surviving count,
    /// or `None` if the identity has no window left.
    fn evict(
        &self,
        windows: &mut HashMap<Identity, VecDeque<Instant>>,
        identity: Identity,
        now: Instant,
    ) -> Option<usize> {
        let window = windows.get_mut(&identity)?;
        while let Some(&front) = window.front() {
            if now.saturating_duration_since(front) >= self.window {
                window.pop_front();
            } else {
                break;
            }
        }
        if window.is_empty() {
            windows.remove(&identity);
            return None;
        }
        Some(window.len())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Identity, VecDeque<Instant>>> {
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
