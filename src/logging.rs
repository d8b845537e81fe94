use std::sync::Once;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// Ensure initialization happens only once
static INIT: Once = Once::new();

fn env_filter() -> EnvFilter {
    // Default to 'info' level if RUST_LOG is not set
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize the logging system with sensible defaults.
///
/// Log level can be set using the RUST_LOG environment variable.
/// Example: RUST_LOG=info,distributed_rate_limiter=debug
pub fn init() {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true) // Useful for debugging concurrency issues
                    .with_line_number(true),
            )
            .init();

        tracing::info!("Logging initialized");
    });
}

/// Same as [`init`], but emits one JSON object per event.
pub fn init_json() {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(env_filter())
            .with(fmt::layer().json().with_current_span(false))
            .init();

        tracing::info!("Logging initialized");
    });
}

/// Macro for logging rate limiting decisions
#[macro_export]
macro_rules! rate_limit_event {
    ($algorithm:expr, $key:expr, $allowed:expr, $limit:expr, $window:expr) => {
        tracing::debug!(
            algorithm = $algorithm,
            key = $key,
            allowed = $allowed,
            limit = $limit,
            window_ms = $window.as_millis() as u64,
            "Rate limit check"
        )
    };
}

/// Macro for logging storage operations with timing
#[macro_export]
macro_rules! storage_op {
    ($operation:expr, $key:expr, $result:expr, $elapsed_ms:expr) => {
        tracing::debug!(
            operation = $operation,
            key = $key,
            success = $result.is_ok(),
            elapsed_ms = $elapsed_ms,
            "Storage operation"
        )
    };
}
