// src/bin/rate_limiter_cli.rs

use std::sync::Arc;
use std::time::{Duration, Instant};
use structopt::StructOpt;
use tokio::time;
use tracing::{error, info, warn};

use distributed_rate_limiter::config::{InMemoryConfig, LimiterOptions, RedisConfig};
use distributed_rate_limiter::storage::{CounterStore, MemoryStorage, RedisStorage};
use distributed_rate_limiter::{
    evaluate, logging, AlgorithmKind, LeakyBucket, LimitResponse, RateLimiter, WindowRounding,
};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "rate_limiter_cli",
    about = "Send simulated requests through a rate limiter and print each decision as JSON"
)]
struct Opt {
    /// Rate limiting algorithm to use
    #[structopt(short, long, possible_values = &["token", "leaky"], default_value = "token")]
    algorithm: String,

    /// Counter store to use
    #[structopt(short, long, possible_values = &["memory", "redis"], default_value = "memory")]
    storage: String,

    /// Redis URL, overrides REDIS_URL
    #[structopt(long)]
    redis_url: Option<String>,

    /// Subject to rate limit
    #[structopt(short, long, default_value = "127.0.0.1")]
    key: String,

    /// Requests per second, overrides RATE_LIMIT_RATE
    #[structopt(long)]
    rate: Option<i64>,

    /// Burst / capacity, overrides RATE_LIMIT_BURST
    #[structopt(long)]
    burst: Option<i64>,

    /// Window in milliseconds, overrides RATE_LIMIT_WINDOW_MS
    #[structopt(long)]
    window_ms: Option<u64>,

    /// Key prefix, overrides RATE_LIMIT_KEY_PREFIX
    #[structopt(long)]
    key_prefix: Option<String>,

    /// Use the fractional window length for the leaky bucket's rate ceiling
    #[structopt(long)]
    fractional_window: bool,

    /// Units requested per call
    #[structopt(long, default_value = "1")]
    units: u32,

    /// Simulation mode
    #[structopt(long, possible_values = &["burst", "steady"], default_value = "burst")]
    simulation: String,

    /// Number of requests to simulate
    #[structopt(short = "n", long, default_value = "25")]
    num_requests: usize,

    /// Time between requests in milliseconds (steady mode)
    #[structopt(short = "t", long, default_value = "100")]
    request_interval_ms: u64,

    /// Reset the subject's counter before the run
    #[structopt(long)]
    reset: bool,

    /// Emit logs as JSON
    #[structopt(long)]
    json_logs: bool,
}

impl Opt {
    fn limiter_options(&self) -> distributed_rate_limiter::Result<LimiterOptions> {
        let mut options = LimiterOptions::from_env()?;
        if let Some(rate) = self.rate {
            options.rate = rate;
        }
        if let Some(burst) = self.burst {
            options.burst = burst;
        }
        if let Some(window_ms) = self.window_ms {
            options.window_size = Duration::from_millis(window_ms);
        }
        if let Some(prefix) = &self.key_prefix {
            options.key_prefix = prefix.clone();
        }
        options.validate()?;
        Ok(options)
    }
}

async fn open_storage(opt: &Opt) -> distributed_rate_limiter::Result<Arc<dyn CounterStore>> {
    match opt.storage.as_str() {
        "redis" => {
            let mut config = RedisConfig::from_env()?;
            if let Some(url) = &opt.redis_url {
                config.url = url.clone();
            }
            let redis = RedisStorage::new(config).await?;
            redis.ping().await?;
            Ok(Arc::new(redis))
        }
        _ => Ok(Arc::new(MemoryStorage::new(InMemoryConfig::default()))),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let opt = Opt::from_args();
    if opt.json_logs {
        logging::init_json();
    } else {
        logging::init();
    }

    let options = opt.limiter_options()?;
    let kind: AlgorithmKind = opt.algorithm.parse()?;
    let storage = match open_storage(&opt).await {
        Ok(storage) => storage,
        Err(e) => {
            error!("Failed to open {} storage: {}", opt.storage, e);
            return Err(e.into());
        }
    };

    info!(
        algorithm = %kind,
        storage = %opt.storage,
        rate = options.rate,
        burst = options.burst,
        window_ms = options.window_size.as_millis() as u64,
        "Rate limiter ready"
    );

    let limiter: Arc<dyn RateLimiter> = match kind {
        AlgorithmKind::LeakyBucket if opt.fractional_window => Arc::new(
            LeakyBucket::new(storage, options).with_window_rounding(WindowRounding::Fractional),
        ),
        _ => kind.build(storage, options),
    };

    if opt.reset {
        limiter.reset(&opt.key).await?;
    }

    let interval = match opt.simulation.as_str() {
        "steady" => Some(Duration::from_millis(opt.request_interval_ms)),
        _ => None,
    };
    run_simulation(&opt, limiter.as_ref(), interval).await
}

async fn run_simulation(
    opt: &Opt,
    limiter: &dyn RateLimiter,
    interval: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut allowed_count = 0;
    let mut denied_count = 0;
    let mut error_count = 0;
    let start_time = Instant::now();

    for _ in 0..opt.num_requests {
        let request_time = Instant::now();

        let outcome = if opt.units == 1 {
            evaluate(limiter, &opt.key).await
        } else {
            limiter
                .allow_n(&opt.key, opt.units)
                .await
                .map(|allowed| {
                    if allowed {
                        LimitResponse::allowed(opt.key.as_str())
                    } else {
                        LimitResponse::denied(opt.key.as_str())
                    }
                })
        };

        match outcome {
            Ok(response) => {
                if response.allowed {
                    allowed_count += 1;
                } else {
                    denied_count += 1;
                }
                println!("{} {}", response.status_code(), response.to_json()?);
            }
            Err(e) => {
                // an outage is not a denial
                error_count += 1;
                warn!("Rate limiting error: {}", e);
                println!("500 Internal Server Error");
            }
        }

        if let Some(interval) = interval {
            let elapsed = request_time.elapsed();
            if elapsed < interval {
                time::sleep(interval - elapsed).await;
            }
        }
    }

    let elapsed = start_time.elapsed();

    eprintln!("\nSimulation Results:");
    eprintln!("-------------------");
    eprintln!("Total requests: {}", opt.num_requests);
    eprintln!("Allowed: {}", allowed_count);
    eprintln!("Denied: {}", denied_count);
    eprintln!("Errors: {}", error_count);
    eprintln!("Time elapsed: {:?}", elapsed);

    Ok(())
}
