// src/algorithms/mod.rs

pub mod leaky_bucket;
pub mod token_bucket;

#[cfg(test)]
mod tests;

pub use leaky_bucket::{LeakyBucket, WindowRounding};
pub use token_bucket::TokenBucket;

use super::config::LimiterOptions;
use super::error::{RateLimiterError, Result};
use super::storage::CounterStore;
use async_trait::async_trait;
use std::fmt::{self, Debug};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Contract every rate limiting algorithm satisfies.
///
/// Implementations hold only immutable configuration and a store handle, so
/// one instance can serve any number of concurrent callers. `Ok(false)` is a
/// denial; `Err` means the store failed and no decision was made.
#[async_trait]
pub trait RateLimiter: Send + Sync + Debug {
    /// Shorthand for `allow_n(key, 1)`
    async fn allow(&self, key: &str) -> Result<bool> {
        self.allow_n(key, 1).await
    }

    /// Tries to admit `n` units for `key`
    async fn allow_n(&self, key: &str, n: u32) -> Result<bool>;

    /// Drops all recorded usage for `key`
    async fn reset(&self, key: &str) -> Result<()>;
}

/// Selects an algorithm by name, e.g. from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmKind {
    TokenBucket,
    LeakyBucket,
}

impl AlgorithmKind {
    pub fn build<S>(self, storage: S, options: LimiterOptions) -> Arc<dyn RateLimiter>
    where
        S: CounterStore + 'static,
    {
        match self {
            AlgorithmKind::TokenBucket => Arc::new(TokenBucket::new(storage, options)),
            AlgorithmKind::LeakyBucket => Arc::new(LeakyBucket::new(storage, options)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AlgorithmKind::TokenBucket => "token_bucket",
            AlgorithmKind::LeakyBucket => "leaky_bucket",
        }
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlgorithmKind {
    type Err = RateLimiterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "token" | "token_bucket" => Ok(AlgorithmKind::TokenBucket),
            "leaky" | "leaky_bucket" => Ok(AlgorithmKind::LeakyBucket),
            other => Err(RateLimiterError::Config(format!(
                "unknown algorithm: {}",
                other
            ))),
        }
    }
}

/// Undoes a reservation that pushed `key` over a ceiling.
///
/// The primary increment has already landed, so if this fails the counter
/// stays inflated until its window expires or the key is reset.
pub(crate) async fn compensate<S>(
    storage: &S,
    key: &str,
    n: i64,
    window: Duration,
) -> Result<()>
where
    S: CounterStore + ?Sized,
{
    match storage.increment(key, -n, window).await {
        Ok(_) => Ok(()),
        Err(e) => {
            warn!(key, units = n, "Rollback failed, counter left over its ceiling: {}", e);
            Err(e)
        }
    }
}
