// src/test_utils.rs

use super::config::InMemoryConfig;
use super::error::{Result, StorageError};
use super::storage::{CounterStore, ManualClock, MemoryStorage};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn test_config() -> InMemoryConfig {
    InMemoryConfig {
        max_entries: 1000,
        use_background_task: false,
        cleanup_interval: Duration::from_secs(60),
    }
}

/// In-memory store on the real clock, without a purge task
pub fn memory_store() -> MemoryStorage {
    MemoryStorage::new(test_config())
}

/// In-memory store whose TTLs only move when the returned clock is advanced
pub fn memory_store_with_clock() -> (MemoryStorage, ManualClock) {
    let clock = ManualClock::new();
    let store = MemoryStorage::with_clock(test_config(), Arc::new(clock.clone()));
    (store, clock)
}

/// Wraps a store and fails chosen `increment` calls (1-based, counted across
/// all keys) with a connection error, as if the backend had dropped out.
///
/// With a single decision in flight, call 1 is the reservation and call 2 the
/// rollback.
#[derive(Debug)]
pub struct FlakyStore<S> {
    inner: S,
    failing_calls: HashSet<usize>,
    increments: AtomicUsize,
    fail_all: bool,
}

impl<S> FlakyStore<S>
where
    S: CounterStore,
{
    pub fn failing_increments(inner: S, calls: &[usize]) -> Self {
        Self {
            inner,
            failing_calls: calls.iter().copied().collect(),
            increments: AtomicUsize::new(0),
            fail_all: false,
        }
    }

    /// Every operation fails
    pub fn unavailable(inner: S) -> Self {
        Self {
            inner,
            failing_calls: HashSet::new(),
            increments: AtomicUsize::new(0),
            fail_all: true,
        }
    }

    pub fn increment_calls(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }

    fn simulated_failure() -> crate::error::RateLimiterError {
        StorageError::RedisConnection("Simulated failure".to_string()).into()
    }
}

#[async_trait]
impl<S> CounterStore for FlakyStore<S>
where
    S: CounterStore,
{
    async fn increment(&self, key: &str, delta: i64, window: Duration) -> Result<i64> {
        let call = self.increments.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_all || self.failing_calls.contains(&call) {
            return Err(Self::simulated_failure());
        }
        self.inner.increment(key, delta, window).await
    }

    async fn get(&self, key: &str) -> Result<i64> {
        if self.fail_all {
            return Err(Self::simulated_failure());
        }
        self.inner.get(key).await
    }

    async fn reset(&self, key: &str) -> Result<()> {
        if self.fail_all {
            return Err(Self::simulated_failure());
        }
        self.inner.reset(key).await
    }
}
