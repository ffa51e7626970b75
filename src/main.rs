use anyhow::Result;
use flow_metrics::metrics_repo::MetricsRepository;
use flow_metrics::store::{SqliteStore, StoreClient};
use flow_metrics::*;
use std::sync::Arc;
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        store_path = %app_config.store.path,
        "starting {}",
        env!("CARGO_PKG_NAME")
    );

    let store = SqliteStore::connect(
        &app_config.store.path,
        app_config.store.max_pool_size,
        app_config.store.busy_timeout(),
    )
    .await?;
    store.init().await?;

    let repo = Arc::new(
        MetricsRepository::new(StoreClient::new(store))
            .with_hot_window_ms(app_config.metrics.hot_window_ms),
    );

    let mut stats_log_tick = interval(Duration::from_secs(
        app_config.monitoring.stats_log_interval_secs,
    ));
    stats_log_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Received shutdown signal");
                break;
            }
            _ = stats_log_tick.tick() => {
                let stats = repo.store_stats();
                tracing::info!(
                    points_written = stats.points_written,
                    write_failures = stats.write_failures,
                    query_failures = stats.query_failures,
                    row_failures = stats.row_failures,
                    "store stats"
                );
            }
        }
    }

    repo.close().await;
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
