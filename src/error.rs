// for error definitions
use thiserror::Error;

/// Errors surfaced by rate limiters and counter stores.
///
/// A denied request is never an error: `allow`/`allow_n` report denials as
/// `Ok(false)`. Anything in here means no decision could be made.
#[derive(Error, Debug)]
pub enum RateLimiterError {
    /// Errors related to the storage backend
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Response encoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Redis connection errors
    #[error("Redis connection error: {0}")]
    RedisConnection(String),

    // Redis authentication errors
    #[error("Redis authentication error: {0}")]
    RedisAuth(String),

    /// Redis command or script errors
    #[error("Redis command error: {0}")]
    RedisCommand(String),

    /// The in-memory store refused to create another counter
    #[error("Maximum entries limit exceeded ({0})")]
    CapacityExceeded(usize),

    /// Counter arithmetic left the i64 range
    #[error("Counter overflow for key: {0}")]
    Overflow(String),

    /// The window pushed the counter's expiry past what the clock can represent
    #[error("Expiry out of range for key: {0}")]
    ExpiryOutOfRange(String),

    /// A panic while holding the in-memory lock poisoned it
    #[error("In-memory store lock poisoned")]
    LockPoisoned,
}

impl From<StorageError> for RateLimiterError {
    fn from(err: StorageError) -> Self {
        RateLimiterError::Storage(err)
    }
}

// Implement conversions from redis::RedisError to StorageError
impl From<redis::RedisError> for RateLimiterError {
    fn from(err: redis::RedisError) -> Self {
        match err.kind() {
            redis::ErrorKind::AuthenticationFailed => {
                RateLimiterError::Storage(StorageError::RedisAuth(err.to_string()))
            }
            redis::ErrorKind::IoError | redis::ErrorKind::ClientError => {
                // Connection-related errors
                RateLimiterError::Storage(StorageError::RedisConnection(err.to_string()))
            }
            _ => RateLimiterError::Storage(StorageError::RedisCommand(err.to_string())),
        }
    }
}

// implement conversions from serde_json::Error to RateLimiterError
impl From<serde_json::Error> for RateLimiterError {
    fn from(err: serde_json::Error) -> Self {
        RateLimiterError::Serialization(err.to_string())
    }
}

// define a Result type alias for convenience
pub type Result<T> = std::result::Result<T, RateLimiterError>;
