// Per-resource metric sample (one row of the sentinel_metric measurement)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current time truncated to millisecond precision (the wire precision).
pub fn now_instant() -> DateTime<Utc> {
    instant_from_millis(now_millis())
}

/// Drops sub-millisecond precision (the store keeps epoch millis).
pub fn truncate_to_millis(t: DateTime<Utc>) -> DateTime<Utc> {
    instant_from_millis(t.timestamp_millis())
}

/// Epoch millis to an instant; out-of-range values fall back to now.
pub fn instant_from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

/// Derived resource code: 31-multiplier polynomial over UTF-16 code units, wrapping i32.
/// Matches the codes other dashboard producers already store.
pub fn resource_code(resource: &str) -> i32 {
    resource
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32))
}

/// One observation for one resource at one timestamp.
///
/// `resource` and its derived `resource_code` are private: the only way to change the
/// resource is [`MetricSample::set_resource`], which recomputes the code. Instants are
/// private too; their setters truncate to milliseconds so a stored sample reads back equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "MetricSampleInput")]
pub struct MetricSample {
    pub id: Option<i64>,
    pub app: String,
    resource: String,
    resource_code: i32,
    timestamp: DateTime<Utc>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    pub pass_count: u64,
    pub success_count: u64,
    pub block_count: u64,
    pub exception_count: u64,
    pub avg_rt: f64,
    /// Number of raw samples folded into this one; 1 for a raw sample.
    pub interval_count: u32,
}

impl MetricSample {
    /// New raw sample with zeroed counters; `created_at`/`modified_at` are now.
    pub fn new(app: impl Into<String>, resource: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        let resource = resource.into();
        let now = now_instant();
        Self {
            id: None,
            app: app.into(),
            resource_code: resource_code(&resource),
            resource,
            timestamp: truncate_to_millis(timestamp),
            created_at: now,
            modified_at: now,
            pass_count: 0,
            success_count: 0,
            block_count: 0,
            exception_count: 0,
            avg_rt: 0.0,
            interval_count: 1,
        }
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn resource_code(&self) -> i32 {
        self.resource_code
    }

    pub fn set_resource(&mut self, resource: impl Into<String>) {
        self.resource = resource.into();
        self.resource_code = resource_code(&self.resource);
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = truncate_to_millis(timestamp);
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_created_at(&mut self, created_at: DateTime<Utc>) {
        self.created_at = truncate_to_millis(created_at);
    }

    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }

    pub fn set_modified_at(&mut self, modified_at: DateTime<Utc>) {
        self.modified_at = truncate_to_millis(modified_at);
    }
}

/// Deserialization shape: any incoming `resourceCode` is ignored and re-derived.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricSampleInput {
    #[serde(default)]
    id: Option<i64>,
    app: String,
    resource: String,
    timestamp: DateTime<Utc>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
    #[serde(default)]
    pass_count: u64,
    #[serde(default)]
    success_count: u64,
    #[serde(default)]
    block_count: u64,
    #[serde(default)]
    exception_count: u64,
    #[serde(default)]
    avg_rt: f64,
    #[serde(default = "default_interval_count")]
    interval_count: u32,
}

fn default_interval_count() -> u32 {
    1
}

impl From<MetricSampleInput> for MetricSample {
    fn from(input: MetricSampleInput) -> Self {
        MetricSample {
            id: input.id,
            app: input.app,
            resource_code: resource_code(&input.resource),
            resource: input.resource,
            timestamp: truncate_to_millis(input.timestamp),
            created_at: truncate_to_millis(input.created_at),
            modified_at: truncate_to_millis(input.modified_at),
            pass_count: input.pass_count,
            success_count: input.success_count,
            block_count: input.block_count,
            exception_count: input.exception_count,
            avg_rt: input.avg_rt,
            interval_count: input.interval_count.max(1),
        }
    }
}
