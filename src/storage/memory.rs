// src/storage/memory.rs

// In-memory counter store (for testing and single-process usage)
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, warn};

use crate::config::InMemoryConfig;
use crate::error::{Result, StorageError};
use crate::storage::{Clock, CounterStore, SystemClock};

/// Entry in the in-memory storage
#[derive(Debug, Clone, Copy)]
struct MemoryEntry {
    value: i64,
    expiry: Instant,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expiry > now
    }
}

type Entries = Arc<RwLock<HashMap<String, MemoryEntry>>>;

/// Aborts the purge task once the last store clone goes away.
#[derive(Debug)]
struct CleanupTask(JoinHandle<()>);

impl Drop for CleanupTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// In-memory counter store.
///
/// Every operation runs under the map's lock, so increments from concurrent
/// tasks never interleave. Expired counters are invisible immediately and are
/// physically removed lazily or by the optional background task.
#[derive(Debug, Clone)]
pub struct MemoryStorage {
    data: Entries,
    clock: Arc<dyn Clock>,
    config: InMemoryConfig,
    _cleanup_task: Option<Arc<CleanupTask>>,
}

impl MemoryStorage {
    /// Creates a new in-memory storage with the given configuration
    pub fn new(config: InMemoryConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a store that reads time from `clock`, e.g. a
    /// [`ManualClock`](crate::storage::ManualClock) in tests.
    pub fn with_clock(config: InMemoryConfig, clock: Arc<dyn Clock>) -> Self {
        let data: Entries = Arc::new(RwLock::new(HashMap::with_capacity(
            config.max_entries.min(10_000),
        )));

        let cleanup_task = if config.use_background_task {
            Self::spawn_cleanup(&data, &clock, config.cleanup_interval)
        } else {
            None
        };

        Self {
            data,
            clock,
            config,
            _cleanup_task: cleanup_task,
        }
    }

    fn spawn_cleanup(
        data: &Entries,
        clock: &Arc<dyn Clock>,
        every: Duration,
    ) -> Option<Arc<CleanupTask>> {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No tokio runtime available, expired counters will be purged lazily");
                return None;
            }
        };

        let data = Arc::clone(data);
        let clock = Arc::clone(clock);
        let task = handle.spawn(async move {
            let mut interval = time::interval(every);
            loop {
                interval.tick().await;
                match Self::purge_expired(&data, clock.now()) {
                    Ok(0) => {}
                    Ok(removed) => debug!(removed, "Purged expired counters"),
                    Err(e) => warn!("Counter purge failed: {}", e),
                }
            }
        });

        Some(Arc::new(CleanupTask(task)))
    }

    /// Removes expired entries, returning how many were dropped
    fn purge_expired(data: &Entries, now: Instant) -> Result<usize> {
        let mut data = data.write().map_err(|_| StorageError::LockPoisoned)?;
        let before = data.len();
        data.retain(|_, entry| entry.is_live(now));
        Ok(before - data.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, MemoryEntry>>> {
        Ok(self.data.read().map_err(|_| StorageError::LockPoisoned)?)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, MemoryEntry>>> {
        Ok(self.data.write().map_err(|_| StorageError::LockPoisoned)?)
    }

    /// Number of entries physically held, expired or not.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl CounterStore for MemoryStorage {
    async fn increment(&self, key: &str, delta: i64, window: Duration) -> Result<i64> {
        let now = self.clock.now();
        let mut data = self.write()?;

        let current = match data.get(key).copied() {
            Some(entry) if entry.is_live(now) => entry.value,
            Some(_) => 0,
            None => {
                // Apply max entries limit, giving expired entries a chance to go first
                if data.len() >= self.config.max_entries {
                    data.retain(|_, entry| entry.is_live(now));
                }
                if data.len() >= self.config.max_entries {
                    return Err(StorageError::CapacityExceeded(self.config.max_entries).into());
                }
                0
            }
        };

        let value = current
            .checked_add(delta)
            .ok_or_else(|| StorageError::Overflow(key.to_string()))?;
        let expiry = now
            .checked_add(window)
            .ok_or_else(|| StorageError::ExpiryOutOfRange(key.to_string()))?;

        data.insert(key.to_string(), MemoryEntry { value, expiry });

        Ok(value)
    }

    async fn get(&self, key: &str) -> Result<i64> {
        let now = self.clock.now();
        let data = self.read()?;

        Ok(data
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map_or(0, |entry| entry.value))
    }

    async fn reset(&self, key: &str) -> Result<()> {
        self.write()?.remove(key);
        Ok(())
    }
}
