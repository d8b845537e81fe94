// src/config/mod.rs

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{RateLimiterError, Result};

/// Options shared by every rate limiting algorithm.
///
/// The token bucket reads `burst` as its ceiling; the leaky bucket reads it as
/// its capacity and additionally derives a ceiling from `rate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimiterOptions {
    /// Sustained requests per second
    #[serde(default = "default_rate")]
    pub rate: i64,

    /// Maximum units admitted within one window
    #[serde(default = "default_burst")]
    pub burst: i64,

    /// Counter TTL, and the window the leaky bucket's rate applies to
    #[serde(default = "default_window_size", with = "duration_serde")]
    pub window_size: Duration,

    /// Key prefix to use for all keys in storage
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

/// Longest window `validate` accepts. Counters are meant to be short lived.
pub const MAX_WINDOW_SIZE: Duration = Duration::from_secs(365 * 24 * 60 * 60);

fn default_rate() -> i64 {
    10
}

fn default_burst() -> i64 {
    20
}

fn default_window_size() -> Duration {
    Duration::from_secs(1)
}

fn default_key_prefix() -> String {
    "ratelimit:".to_string()
}

impl Default for LimiterOptions {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            burst: default_burst(),
            window_size: default_window_size(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl LimiterOptions {
    /// The store key for a caller-supplied subject.
    pub fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rate < 0 {
            return Err(RateLimiterError::Config(format!(
                "rate must not be negative, got {}",
                self.rate
            )));
        }
        if self.burst < 0 {
            return Err(RateLimiterError::Config(format!(
                "burst must not be negative, got {}",
                self.burst
            )));
        }
        if self.window_size.is_zero() {
            return Err(RateLimiterError::Config(
                "window size must be greater than zero".to_string(),
            ));
        }
        if self.window_size > MAX_WINDOW_SIZE {
            return Err(RateLimiterError::Config(format!(
                "window size must not exceed {:?}, got {:?}",
                MAX_WINDOW_SIZE, self.window_size
            )));
        }
        Ok(())
    }

    /// Builds options from `RATE_LIMIT_*` environment variables, falling back
    /// to the defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let options = Self {
            rate: env_or("RATE_LIMIT_RATE", defaults.rate)?,
            burst: env_or("RATE_LIMIT_BURST", defaults.burst)?,
            window_size: env_or(
                "RATE_LIMIT_WINDOW_MS",
                defaults.window_size.as_millis() as u64,
            )
            .map(Duration::from_millis)?,
            key_prefix: env::var("RATE_LIMIT_KEY_PREFIX").unwrap_or(defaults.key_prefix),
        };
        options.validate()?;
        Ok(options)
    }
}

/// Configuration for Redis storage backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection timeout
    #[serde(default = "default_conn_timeout", with = "duration_serde")]
    pub connection_timeout: Duration,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_conn_timeout() -> Duration {
    Duration::from_secs(2)
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            connection_timeout: default_conn_timeout(),
        }
    }
}

impl RedisConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            url: env::var("REDIS_URL").unwrap_or(defaults.url),
            connection_timeout: env_or(
                "REDIS_CONNECTION_TIMEOUT_MS",
                defaults.connection_timeout.as_millis() as u64,
            )
            .map(Duration::from_millis)?,
        })
    }
}

/// Configuration for in-memory storage backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InMemoryConfig {
    /// Maximum number of counters to hold
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Whether to use a background task for expiration
    #[serde(default = "default_use_background_task")]
    pub use_background_task: bool,

    /// How often to run the background expiration task
    #[serde(default = "default_cleanup_interval", with = "duration_serde")]
    pub cleanup_interval: Duration,
}

fn default_max_entries() -> usize {
    10_000
}

fn default_use_background_task() -> bool {
    true
}

fn default_cleanup_interval() -> Duration {
    Duration::from_secs(60)
}

impl Default for InMemoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            use_background_task: default_use_background_task(),
            cleanup_interval: default_cleanup_interval(),
        }
    }
}

fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().map_err(|e| {
            RateLimiterError::Config(format!("invalid value {:?} for {}: {}", raw, name, e))
        }),
        Err(_) => Ok(default),
    }
}

// Helper module to serialize/deserialize Duration with serde
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
