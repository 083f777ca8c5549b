//! Per-minute request quota
//!
//! The counter lives in an explicit object owned by the completion client
//! and shared by reference with every call site; there is no module-level
//! state. The 60-second reset is a window-start timestamp consulted at
//! acquisition time, which observes the same behavior as a reset timer
//! without leaving a task running between requests.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Window {
    count: u32,
    started_at: Option<Instant>,
}

/// Rolling-window request counter. The window is anchored at the first
/// acquisition after a reset, not at process start.
#[derive(Debug)]
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(Window {
                count: 0,
                started_at: None,
            }),
        }
    }

    /// Claim one request slot. Returns `false` without side effects when the
    /// current window is exhausted.
    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&self, now: Instant) -> bool {
        let mut window = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let expired = window
            .started_at
            .is_some_and(|started| now.duration_since(started) >= self.window);
        if expired || window.started_at.is_none() {
            window.count = 0;
            window.started_at = Some(now);
        }

        if window.count >= self.limit {
            return false;
        }
        window.count += 1;
        true
    }
}
