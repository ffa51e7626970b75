// Config loading and validation tests

use flow_metrics::config::AppConfig;
use std::time::Duration;

const VALID_CONFIG: &str = r#"
[store]
path = "data/metrics.db"
max_pool_size = 5
busy_timeout_ms = 2000

[metrics]
hot_window_ms = 30000

[monitoring]
stats_log_interval_secs = 60
"#;

#[test]
fn test_config_loads_from_str() {
    let config = AppConfig::load_from_str(VALID_CONFIG).expect("load_from_str");
    assert_eq!(config.store.path, "data/metrics.db");
    assert_eq!(config.store.max_pool_size, 5);
    assert_eq!(config.store.busy_timeout(), Duration::from_millis(2000));
    assert_eq!(config.metrics.hot_window_ms, 30_000);
    assert_eq!(config.monitoring.stats_log_interval_secs, 60);
}

#[test]
fn test_config_defaults_when_optional_sections_missing() {
    let minimal = r#"
[store]
path = "data/metrics.db"
max_pool_size = 1

[monitoring]
stats_log_interval_secs = 10
"#;
    let config = AppConfig::load_from_str(minimal).expect("load_from_str");
    assert_eq!(config.store.busy_timeout_ms, 5000);
    assert_eq!(config.metrics.hot_window_ms, 60_000);
}

#[test]
fn test_config_validation_rejects_empty_store_path() {
    let bad = VALID_CONFIG.replace("path = \"data/metrics.db\"", "path = \"\"");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("store.path"));
}

#[test]
fn test_config_validation_rejects_max_pool_size_zero() {
    let bad = VALID_CONFIG.replace("max_pool_size = 5", "max_pool_size = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("max_pool_size"));
}

#[test]
fn test_config_validation_rejects_busy_timeout_zero() {
    let bad = VALID_CONFIG.replace("busy_timeout_ms = 2000", "busy_timeout_ms = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("busy_timeout_ms"));
}

#[test]
fn test_config_validation_rejects_non_positive_window() {
    let bad = VALID_CONFIG.replace("hot_window_ms = 30000", "hot_window_ms = -1");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("metrics.hot_window_ms"));
}

#[test]
fn test_config_validation_rejects_stats_interval_zero() {
    let bad = VALID_CONFIG.replace("stats_log_interval_secs = 60", "stats_log_interval_secs = 0");
    let err = AppConfig::load_from_str(&bad).unwrap_err();
    assert!(err.to_string().contains("stats_log_interval_secs"));
}

#[test]
fn test_config_missing_section_fails() {
    let bad = VALID_CONFIG.replace("[monitoring]\nstats_log_interval_secs = 60\n", "");
    assert!(AppConfig::load_from_str(&bad).is_err());
}
