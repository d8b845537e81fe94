// library entry
pub mod algorithms;
pub mod config;
pub mod error;
pub mod logging;
pub mod response;
pub mod storage;

#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod tests;

// Re-export key components for convenience
pub use algorithms::{AlgorithmKind, LeakyBucket, RateLimiter, TokenBucket, WindowRounding};
pub use config::{InMemoryConfig, LimiterOptions, RedisConfig};
pub use error::{RateLimiterError, Result, StorageError};
pub use logging::init as init_logging;
pub use response::{evaluate, LimitResponse};
pub use storage::{CounterStore, ManualClock, MemoryStorage, RedisStorage};
