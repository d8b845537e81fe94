// src/storage/mod.rs

pub mod clock;
pub mod memory;
pub mod redis;

#[cfg(test)]
mod tests;

pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::MemoryStorage;
pub use redis::RedisStorage;

use super::error::Result;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

/// Shared, TTL-aware counters with an atomic increment.
///
/// Implementations know nothing about rate limiting. Every failure to reach
/// or execute against the backing medium is returned as an error; nothing is
/// retried here.
#[async_trait]
pub trait CounterStore: Send + Sync + Debug {
    /// Adds `delta` (which may be negative) to the counter at `key`, creating
    /// it at zero if absent, and (re)sets its expiry to `window`.
    ///
    /// The add and the expiry update are one indivisible step for every
    /// caller: no lost updates, and no observer sees one without the other.
    async fn increment(&self, key: &str, delta: i64, window: Duration) -> Result<i64>;

    /// Current value, or 0 when the key does not exist.
    async fn get(&self, key: &str) -> Result<i64>;

    /// Removes the counter entirely.
    async fn reset(&self, key: &str) -> Result<()>;
}

#[async_trait]
impl<S> CounterStore for Arc<S>
where
    S: CounterStore + ?Sized,
{
    async fn increment(&self, key: &str, delta: i64, window: Duration) -> Result<i64> {
        (**self).increment(key, delta, window).await
    }

    async fn get(&self, key: &str) -> Result<i64> {
        (**self).get(key).await
    }

    async fn reset(&self, key: &str) -> Result<()> {
        (**self).reset(key).await
    }
}
