//! Shardcache soak driver
//!
//! Builds a cache from the environment and hammers it with a mixed workload
//! from several tasks, logging a statistics snapshot every second.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shardcache::{Cache, Config, Expiration};

/// Main entry point for the soak driver.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache (and its janitor) with configured parameters
/// 4. Spawn workload tasks and the stats reporter
/// 5. Stop on SIGINT/SIGTERM or once `SOAK_SECONDS` have elapsed
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "shardcache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: default_expiration={}s, cleanup_interval={}ms, shards={}, workers={}, keys={}",
        config.default_expiration_secs,
        config.cleanup_interval_ms,
        config.shard_count,
        config.soak_workers,
        config.soak_keys
    );

    let cache: Arc<Cache<String>> =
        Arc::new(Cache::from_config(&config).context("failed to build cache")?);
    let (stop_tx, stop_rx) = watch::channel(false);

    let mut workers = JoinSet::new();
    for worker in 0..config.soak_workers {
        workers.spawn(run_worker(
            Arc::clone(&cache),
            worker,
            config.soak_keys.max(1),
            stop_rx.clone(),
        ));
    }
    let reporter = tokio::spawn(report_stats(Arc::clone(&cache), stop_rx));

    shutdown_signal(config.soak_seconds).await;
    stop_tx.send_replace(true);

    let mut total_ops = 0u64;
    while let Some(result) = workers.join_next().await {
        total_ops += result.context("worker panicked")?;
    }
    reporter.await.context("stats reporter panicked")??;

    let stats = cache.stats();
    let snapshot = serde_json::to_string(&stats)?;
    info!(
        total_ops,
        items = cache.item_count(),
        hit_rate = stats.hit_rate(),
        "Soak finished: {}",
        snapshot
    );

    match Arc::try_unwrap(cache) {
        Ok(mut cache) => cache.shutdown(),
        Err(_) => warn!("Cache still shared at exit, janitor stops on last drop"),
    }

    Ok(())
}

/// Runs a deterministic mix of cache operations until told to stop.
///
/// Returns the number of operations performed.
async fn run_worker(
    cache: Arc<Cache<String>>,
    worker: usize,
    keys: usize,
    stop: watch::Receiver<bool>,
) -> u64 {
    let mut ops = 0u64;
    let mut cursor = worker;

    while !*stop.borrow() {
        for _ in 0..256 {
            cursor = cursor.wrapping_mul(31).wrapping_add(17) % keys;
            let key = format!("key:{cursor}");
            let value = format!("w{worker}:{ops}");
            let ttl = Expiration::After(Duration::from_millis(50 + (ops % 2000)));

            match ops % 8 {
                0..=2 => cache.set(&key, value, ttl),
                3 => {
                    let _ = cache.add(&key, value, Expiration::Default);
                }
                4 => {
                    let _ = cache.replace(&key, value, ttl);
                }
                5 => {
                    cache.delete(&key);
                }
                _ => {
                    cache.get(&key);
                }
            }
            ops += 1;
        }
        tokio::task::yield_now().await;
    }

    ops
}

/// Logs a JSON statistics snapshot once per second.
async fn report_stats(
    cache: Arc<Cache<String>>,
    mut stop: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = serde_json::to_string(&cache.stats())?;
                info!("stats {}", snapshot);
            }
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    return Ok(());
                }
            }
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM) or the configured run time.
async fn shutdown_signal(soak_seconds: u64) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let deadline = async {
        if soak_seconds == 0 {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(Duration::from_secs(soak_seconds)).await;
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
        _ = deadline => {
            info!("Soak time elapsed, initiating shutdown...");
        }
    }
}
