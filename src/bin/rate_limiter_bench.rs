// src/bin/rate_limiter_bench.rs

use prettytable::{row, Table};
use std::sync::Arc;
use std::time::{Duration, Instant};
use structopt::StructOpt;
use tokio::sync::{Barrier, Semaphore};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use distributed_rate_limiter::config::{InMemoryConfig, LimiterOptions, RedisConfig};
use distributed_rate_limiter::storage::{CounterStore, MemoryStorage, RedisStorage};
use distributed_rate_limiter::{AlgorithmKind, LeakyBucket, RateLimiter, TokenBucket};

#[derive(Debug, Clone, StructOpt)]
#[structopt(
    name = "rate_limiter_bench",
    about = "Hammers one key from many tasks and checks the counter settles under the ceiling"
)]
struct Opt {
    /// Algorithm to benchmark
    #[structopt(short, long, possible_values = &["token", "leaky", "all"], default_value = "all")]
    algorithm: String,

    /// Counter store to use
    #[structopt(short, long, possible_values = &["memory", "redis"], default_value = "memory")]
    storage: String,

    /// Redis URL (when using Redis storage)
    #[structopt(long, default_value = "redis://127.0.0.1:6379")]
    redis_url: String,

    /// Requests per second
    #[structopt(long, default_value = "50")]
    rate: i64,

    /// Burst / capacity
    #[structopt(short, long, default_value = "100")]
    burst: i64,

    /// Window in milliseconds
    #[structopt(short, long, default_value = "60000")]
    window_ms: u64,

    /// Number of concurrent tasks
    #[structopt(short = "u", long, default_value = "200")]
    num_tasks: usize,

    /// Requests sent by each task
    #[structopt(short = "r", long, default_value = "5")]
    requests_per_task: usize,

    /// Number of iterations to run
    #[structopt(short, long, default_value = "3")]
    iterations: usize,

    /// Maximum number of requests in flight (at least 1)
    #[structopt(short = "c", long, default_value = "64", parse(try_from_str = parse_concurrency))]
    concurrency: usize,

    /// Verbosity level
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,

    /// Disable logs
    #[structopt(long)]
    disable_logs: bool,
}

fn parse_concurrency(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("concurrency must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

impl Opt {
    fn options(&self) -> LimiterOptions {
        LimiterOptions {
            rate: self.rate,
            burst: self.burst,
            window_size: Duration::from_millis(self.window_ms),
            key_prefix: "bench:".to_string(),
        }
    }
}

struct IterationResult {
    allowed: u64,
    denied: u64,
    errors: u64,
    settled: i64,
    elapsed: Duration,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opt = Opt::from_args();

    let level = if opt.disable_logs {
        "error"
    } else {
        match opt.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(format!(
            "rate_limiter_bench={},distributed_rate_limiter={}",
            level, level
        )))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let options = opt.options();
    options.validate()?;

    let storage: Arc<dyn CounterStore> = match opt.storage.as_str() {
        "redis" => {
            let config = RedisConfig {
                url: opt.redis_url.clone(),
                ..RedisConfig::default()
            };
            match RedisStorage::new(config).await {
                Ok(storage) => Arc::new(storage),
                Err(e) => {
                    error!("Failed to connect to Redis: {}", e);
                    return Err(e.into());
                }
            }
        }
        _ => Arc::new(MemoryStorage::new(InMemoryConfig {
            max_entries: 100_000,
            use_background_task: true,
            cleanup_interval: Duration::from_secs(60),
        })),
    };

    let kinds = match opt.algorithm.as_str() {
        "all" => vec![AlgorithmKind::TokenBucket, AlgorithmKind::LeakyBucket],
        other => vec![other.parse()?],
    };

    for kind in kinds {
        let limiter = kind.build(Arc::clone(&storage), options.clone());
        let ceiling = match kind {
            AlgorithmKind::TokenBucket => {
                TokenBucket::new(Arc::clone(&storage), options.clone()).burst()
            }
            AlgorithmKind::LeakyBucket => {
                LeakyBucket::new(Arc::clone(&storage), options.clone()).effective_limit()
            }
        };
        info!(algorithm = %kind, storage = %opt.storage, ceiling, "Starting benchmark");
        run_benchmark(limiter, &storage, &options, kind, ceiling, &opt).await?;
    }

    Ok(())
}

async fn run_benchmark(
    limiter: Arc<dyn RateLimiter>,
    storage: &Arc<dyn CounterStore>,
    options: &LimiterOptions,
    kind: AlgorithmKind,
    ceiling: i64,
    opt: &Opt,
) -> Result<(), Box<dyn std::error::Error>> {
    let key = "contended";
    let mut table = Table::new();
    table.add_row(row![
        "Iteration",
        "Allowed",
        "Denied",
        "Errors",
        "Final counter",
        "Ceiling",
        "Elapsed",
        "Converged"
    ]);

    let mut all_converged = true;
    for iteration in 1..=opt.iterations {
        limiter.reset(key).await?;

        let result = run_iteration(Arc::clone(&limiter), key, opt).await;
        let settled = storage.get(&options.namespaced(key)).await?;
        let result = IterationResult { settled, ..result };

        // errors may strand a reservation, so only judge clean runs strictly
        let converged = result.settled <= ceiling
            && (result.errors > 0 || result.settled == result.allowed as i64);
        all_converged &= converged;
        if !converged {
            warn!(
                iteration,
                settled = result.settled,
                allowed = result.allowed,
                ceiling,
                "Counter did not settle under the ceiling"
            );
        }

        let verdict = if converged { "yes" } else { "NO" };
        table.add_row(row![
            iteration,
            result.allowed,
            result.denied,
            result.errors,
            result.settled,
            ceiling,
            format!("{:?}", result.elapsed),
            verdict
        ]);
    }

    println!("\n{} ({} storage)", kind, opt.storage);
    table.printstd();
    if !all_converged {
        return Err(format!("{} exceeded its ceiling", kind).into());
    }
    Ok(())
}

async fn run_iteration(limiter: Arc<dyn RateLimiter>, key: &str, opt: &Opt) -> IterationResult {
    let barrier = Arc::new(Barrier::new(opt.num_tasks));
    let semaphore = Arc::new(Semaphore::new(opt.concurrency.max(1)));
    let start = Instant::now();

    let handles = (0..opt.num_tasks).map(|_| {
        let limiter = Arc::clone(&limiter);
        let barrier = Arc::clone(&barrier);
        let semaphore = Arc::clone(&semaphore);
        let key = key.to_string();
        let requests = opt.requests_per_task;

        tokio::spawn(async move {
            barrier.wait().await;

            let (mut allowed, mut denied, mut errors) = (0u64, 0u64, 0u64);
            for _ in 0..requests {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => break,
                };
                match limiter.allow(&key).await {
                    Ok(true) => allowed += 1,
                    Ok(false) => denied += 1,
                    Err(e) => {
                        errors += 1;
                        warn!("Error in rate limiting: {}", e);
                    }
                }
            }
            (allowed, denied, errors)
        })
    });

    let mut result = IterationResult {
        allowed: 0,
        denied: 0,
        errors: 0,
        settled: 0,
        elapsed: Duration::ZERO,
    };
    for joined in futures::future::join_all(handles).await {
        match joined {
            Ok((allowed, denied, errors)) => {
                result.allowed += allowed;
                result.denied += denied;
                result.errors += errors;
            }
            Err(e) => {
                error!("Benchmark task panicked: {}", e);
                result.errors += opt.requests_per_task as u64;
            }
        }
    }
    result.elapsed = start.elapsed();
    result
}
