// src/algorithms/token_bucket.rs

use crate::algorithms::{compensate, RateLimiter};
use crate::config::LimiterOptions;
use crate::error::Result;
use crate::rate_limit_event;
use crate::storage::CounterStore;
use async_trait::async_trait;

/// Token Bucket rate limiting algorithm
///
/// The counter at a key is the number of units consumed in the current
/// window; `burst` is the most that may be consumed before the window lapses.
/// There is no gradual refill: usage drops back to zero only when the
/// counter's TTL runs out or the key is reset.
#[derive(Debug)]
pub struct TokenBucket<S>
where
    S: CounterStore,
{
    /// Storage backend for persisting bucket state
    storage: S,

    options: LimiterOptions,
}

impl<S> TokenBucket<S>
where
    S: CounterStore,
{
    /// Creates a new token bucket with the given storage and options
    pub fn new(storage: S, options: LimiterOptions) -> Self {
        Self { storage, options }
    }

    /// The ceiling on units consumed per window.
    pub fn burst(&self) -> i64 {
        self.options.burst
    }
}

#[async_trait]
impl<S> RateLimiter for TokenBucket<S>
where
    S: CounterStore,
{
    async fn allow_n(&self, key: &str, n: u32) -> Result<bool> {
        let key = self.options.namespaced(key);
        let n = i64::from(n);
        let window = self.options.window_size;

        let tokens = self.storage.increment(&key, n, window).await?;

        if tokens > self.options.burst {
            compensate(&self.storage, &key, n, window).await?;
            rate_limit_event!("token_bucket", key.as_str(), false, self.options.burst, window);
            return Ok(false);
        }

        rate_limit_event!("token_bucket", key.as_str(), true, self.options.burst, window);
        Ok(true)
    }

    async fn reset(&self, key: &str) -> Result<()> {
        self.storage.reset(&self.options.namespaced(key)).await
    }
}
