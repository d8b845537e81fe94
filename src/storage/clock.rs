// src/storage/clock.rs

use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Time source for TTL bookkeeping in the in-memory store.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;
}

/// The monotonic system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give another
/// to the store.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current_time: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            current_time: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Moves time forward. An advance past the representable range is ignored.
    pub fn advance(&self, duration: Duration) {
        let mut time = self
            .current_time
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(later) = time.checked_add(duration) {
            *time = later;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self
            .current_time
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
