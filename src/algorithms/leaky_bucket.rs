// src/algorithms/leaky_bucket.rs

use crate::algorithms::{compensate, RateLimiter};
use crate::config::LimiterOptions;
use crate::error::Result;
use crate::rate_limit_event;
use crate::storage::CounterStore;
use async_trait::async_trait;
use std::time::Duration;
use tracing::trace;

/// How the window length feeds the rate-derived ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowRounding {
    /// `rate * whole seconds`: any window under one second yields a ceiling
    /// of zero and denies everything.
    #[default]
    WholeSeconds,
    /// `floor(rate * seconds)` using the fractional window length.
    Fractional,
}

impl WindowRounding {
    fn max_requests(self, rate: i64, window: Duration) -> i64 {
        match self {
            WindowRounding::WholeSeconds => {
                let secs = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
                rate.saturating_mul(secs)
            }
            // float-to-int casts saturate
            WindowRounding::Fractional => (rate as f64 * window.as_secs_f64()).floor() as i64,
        }
    }
}

/// Leaky Bucket rate limiting algorithm
///
/// Admits units while the counter stays within both the bucket capacity
/// (`burst`) and `rate` applied over the window. Whichever is lower governs.
#[derive(Debug)]
pub struct LeakyBucket<S>
where
    S: CounterStore,
{
    storage: S,
    options: LimiterOptions,
    rounding: WindowRounding,
    max_requests: i64,
}

impl<S> LeakyBucket<S>
where
    S: CounterStore,
{
    pub fn new(storage: S, options: LimiterOptions) -> Self {
        let rounding = WindowRounding::default();
        let max_requests = rounding.max_requests(options.rate, options.window_size);
        Self {
            storage,
            options,
            rounding,
            max_requests,
        }
    }

    pub fn with_window_rounding(mut self, rounding: WindowRounding) -> Self {
        self.rounding = rounding;
        self.max_requests = rounding.max_requests(self.options.rate, self.options.window_size);
        self
    }

    pub fn capacity(&self) -> i64 {
        self.options.burst
    }

    /// The rate-derived ceiling.
    pub fn max_requests(&self) -> i64 {
        self.max_requests
    }

    /// The ceiling that actually binds.
    pub fn effective_limit(&self) -> i64 {
        self.capacity().min(self.max_requests)
    }

    pub fn window_rounding(&self) -> WindowRounding {
        self.rounding
    }
}

#[async_trait]
impl<S> RateLimiter for LeakyBucket<S>
where
    S: CounterStore,
{
    async fn allow_n(&self, key: &str, n: u32) -> Result<bool> {
        let key = self.options.namespaced(key);
        let n = i64::from(n);
        let window = self.options.window_size;

        let queue_size = self.storage.increment(&key, n, window).await?;

        if queue_size > self.capacity() {
            compensate(&self.storage, &key, n, window).await?;
            trace!(key = %key, queue_size, "Over bucket capacity");
            rate_limit_event!("leaky_bucket", key.as_str(), false, self.effective_limit(), window);
            return Ok(false);
        }

        if queue_size > self.max_requests {
            compensate(&self.storage, &key, n, window).await?;
            trace!(key = %key, queue_size, max_requests = self.max_requests, "Over rate ceiling");
            rate_limit_event!("leaky_bucket", key.as_str(), false, self.effective_limit(), window);
            return Ok(false);
        }

        rate_limit_event!("leaky_bucket", key.as_str(), true, self.effective_limit(), window);
        Ok(true)
    }

    async fn reset(&self, key: &str) -> Result<()> {
        self.storage.reset(&self.options.namespaced(key)).await
    }
}
