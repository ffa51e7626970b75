use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub path: String,
    pub max_pool_size: u32,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Trailing window for hot-resource ranking.
    #[serde(default = "default_hot_window_ms")]
    pub hot_window_ms: i64,
}

fn default_hot_window_ms() -> i64 {
    crate::metrics_repo::HOT_WINDOW_MS
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            hot_window_ms: default_hot_window_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    /// How often to log store counters (points written, dropped writes, failed queries) at INFO level.
    pub stats_log_interval_secs: u64,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.store.path.is_empty(), "store.path must be non-empty");
        anyhow::ensure!(
            self.store.max_pool_size > 0,
            "store.max_pool_size must be > 0, got {}",
            self.store.max_pool_size
        );
        anyhow::ensure!(
            self.store.busy_timeout_ms > 0,
            "store.busy_timeout_ms must be > 0, got {}",
            self.store.busy_timeout_ms
        );
        anyhow::ensure!(
            self.metrics.hot_window_ms > 0,
            "metrics.hot_window_ms must be > 0, got {}",
            self.metrics.hot_window_ms
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        Ok(())
    }
}
