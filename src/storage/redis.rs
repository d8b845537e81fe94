// src/storage/redis.rs

use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, Script};
use std::fmt;
use std::time::{Duration, Instant};

use crate::config::RedisConfig;
use crate::error::{RateLimiterError, Result, StorageError};
use crate::storage::CounterStore;
use crate::storage_op;

/// INCRBY and PEXPIRE run as one script, so no other client can observe the
/// new value without its refreshed expiry or slip an update in between.
const INCREMENT_SCRIPT: &str = r#"
local current = redis.call('INCRBY', KEYS[1], ARGV[1])
redis.call('PEXPIRE', KEYS[1], ARGV[2])
return current
"#;

/// Redis-backed counter store, safe to share across processes and hosts.
#[derive(Clone)]
pub struct RedisStorage {
    connection: ConnectionManager,
    increment_script: Script,
    config: RedisConfig,
}

// Manually implement Debug
impl fmt::Debug for RedisStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStorage")
            .field("url", &self.config.url)
            .field("connection_timeout", &self.config.connection_timeout)
            .finish()
    }
}

impl RedisStorage {
    /// Connects to Redis with the given configuration
    pub async fn new(config: RedisConfig) -> Result<Self> {
        // Open the client - this doesn't actually connect to Redis yet
        let client = Client::open(config.url.as_str())
            .map_err(|e| RateLimiterError::Storage(StorageError::RedisConnection(e.to_string())))?;

        let connection =
            match tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
                .await
            {
                Ok(result) => result.map_err(|e| {
                    RateLimiterError::Storage(StorageError::RedisConnection(e.to_string()))
                })?,
                Err(_) => {
                    return Err(RateLimiterError::Storage(StorageError::RedisConnection(
                        format!(
                            "Connection to Redis at {} timed out after {:?}",
                            config.url, config.connection_timeout
                        ),
                    )));
                }
            };

        Ok(Self {
            connection,
            increment_script: Script::new(INCREMENT_SCRIPT),
            config,
        })
    }

    /// Ping Redis to check health with timeout
    pub async fn ping(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        let ping = redis::cmd("PING");
        let ping_future = ping.query_async::<String>(&mut conn);

        let result = match tokio::time::timeout(self.config.connection_timeout, ping_future).await
        {
            Ok(inner_result) => inner_result?,
            Err(_) => {
                return Err(RateLimiterError::Storage(StorageError::RedisCommand(
                    format!(
                        "Redis PING operation timed out after {:?}",
                        self.config.connection_timeout
                    ),
                )));
            }
        };

        if result == "PONG" {
            Ok(())
        } else {
            Err(RateLimiterError::Storage(StorageError::RedisCommand(
                format!("Unexpected response from Redis PING: {}", result),
            )))
        }
    }
}

/// Expiry in whole milliseconds, never zero: PEXPIRE 0 would delete the key.
fn expiry_millis(window: Duration) -> u64 {
    u64::try_from(window.as_millis()).unwrap_or(u64::MAX).max(1)
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

#[async_trait]
impl CounterStore for RedisStorage {
    async fn increment(&self, key: &str, delta: i64, window: Duration) -> Result<i64> {
        let start = Instant::now();
        let mut conn = self.connection.clone();

        let result: Result<i64> = self
            .increment_script
            .key(key)
            .arg(delta)
            .arg(expiry_millis(window))
            .invoke_async(&mut conn)
            .await
            .map_err(RateLimiterError::from);

        storage_op!("increment", key, &result, elapsed_ms(start));
        result
    }

    async fn get(&self, key: &str) -> Result<i64> {
        let start = Instant::now();
        let mut conn = self.connection.clone();

        let result: Result<i64> = conn
            .get::<_, Option<i64>>(key)
            .await
            .map(|value| value.unwrap_or(0))
            .map_err(RateLimiterError::from);

        storage_op!("get", key, &result, elapsed_ms(start));
        result
    }

    async fn reset(&self, key: &str) -> Result<()> {
        let start = Instant::now();
        let mut conn = self.connection.clone();

        let result: Result<()> = conn
            .del::<_, i64>(key)
            .await
            .map(|_| ())
            .map_err(RateLimiterError::from);

        storage_op!("reset", key, &result, elapsed_ms(start));
        result
    }
}
