use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Fixed-window request counter keyed by client identity.
///
/// State is process-local and lost on restart. Each instance is independent,
/// so tests can construct their own limiter instead of sharing a global.
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started_at: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, client_id: &str) -> Decision {
        self.check_at(client_id, Instant::now())
    }

    /// Counts one request for `client_id` at time `now`. The whole
    /// read-modify-write happens under the map lock, so concurrent requests
    /// for the same key cannot undercount.
    pub fn check_at(&self, client_id: &str, now: Instant) -> Decision {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        let window = windows
            .entry(client_id.to_string())
            .or_insert(Window { started_at: now, count: 0 });

        if now.duration_since(window.started_at) >= self.window {
            window.started_at = now;
            window.count = 0;
        }

        window.count += 1;
        if window.count > self.max_requests {
            Decision::Denied
        } else {
            Decision::Allowed
        }
    }
}
