//! Sliding-window admission control keyed by client identifier.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Default number of requests admitted per window.
pub const DEFAULT_MAX_REQUESTS: u32 = 100;

/// Default window length.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Outcome of one admission check, reported on every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// Configured maximum per window.
    pub limit: u32,
    /// Requests still admissible in the current window.
    pub remaining: u32,
    /// Time until the oldest recorded request leaves the window.
    pub reset_after: Duration,
}

/// In-memory sliding-window limiter.
///
/// Each client's timestamps live behind the map shard lock, so the
/// prune → check → append sequence is atomic per client.
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    max_requests: u32,
    window: Duration,
    clients: DashMap<String, VecDeque<Instant>>,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: DashMap::new(),
        }
    }

    pub fn limit(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check and record a request from `client` at the current instant.
    pub fn check(&self, client: &str) -> RateDecision {
        self.check_at(client, Instant::now())
    }

    /// Check and record a request from `client` at `now`.
    ///
    /// Denied requests are not recorded.
    pub fn check_at(&self, client: &str, now: Instant) -> RateDecision {
        let mut entry = self.clients.entry(client.to_string()).or_default();
        let timestamps = entry.value_mut();
        prune(timestamps, now, self.window);

        let allowed = (timestamps.len() as u64) < u64::from(self.max_requests);
        if allowed {
            timestamps.push_back(now);
        }

        let used = u32::try_from(timestamps.len()).unwrap_or(u32::MAX);
        let reset_after = timestamps
            .front()
            .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
            .unwrap_or(self.window);

        RateDecision {
            allowed,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(used),
            reset_after,
        }
    }

    /// Drop clients with no requests left in the window. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let before = self.clients.len();
        self.clients.retain(|_, timestamps| {
            prune(timestamps, now, self.window);
            !timestamps.is_empty()
        });
        before.saturating_sub(self.clients.len())
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

impl Default for SlidingWindowLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW)
    }
}

fn prune(timestamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(oldest) = timestamps.front() {
        if now.saturating_duration_since(*oldest) >= window {
            timestamps.pop_front();
        } else {
            break;
        }
    }
}
