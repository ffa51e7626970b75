// Time-series store boundary: wire types, the store trait, and the StoreClient adapter.
// StoreClient is the only place store errors are seen; it logs them, counts them, and
// hands callers empty results instead.

pub mod sqlite;

use chrono::{DateTime, Utc};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use thiserror::Error;

pub use sqlite::SqliteStore;

/// Measurement (table) holding metric samples.
pub const METRIC_MEASUREMENT: &str = "sentinel_metric";

/// One value on the wire, in either direction.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Time(DateTime<Utc>),
}

/// One record handed to the store: measurement, indexed tags, plain fields, time index.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: Vec<(String, String)>,
    pub fields: Vec<(String, Value)>,
    pub time: DateTime<Utc>,
}

impl Point {
    pub fn measurement(name: impl Into<String>) -> Self {
        Self {
            measurement: name.into(),
            tags: Vec::new(),
            fields: Vec::new(),
            time: Utc::now(),
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.push((key.into(), value));
        self
    }

    pub fn timestamp(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn field_value(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// One result row. Column names are empty when the store does not report them.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn unnamed(values: Vec<Value>) -> Self {
        Self {
            columns: Vec::new(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value at `index`; out of range reads as `Null`.
    pub fn get(&self, index: usize) -> &Value {
        self.values.get(index).unwrap_or(&Value::Null)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store closed")]
    Closed,
    #[error("write failed: {0}")]
    Write(String),
    #[error("query failed: {0}")]
    Query(String),
}

/// Write/query primitives of a time-series store.
pub trait TimeSeriesStore: Send + Sync {
    /// Writes a batch of points. Either the whole batch lands or none of it.
    fn write_points(&self, points: &[Point]) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn write_point(&self, point: &Point) -> impl Future<Output = Result<(), StoreError>> + Send {
        self.write_points(std::slice::from_ref(point))
    }

    /// Lazily streams result rows. Dropping the stream releases the underlying connection.
    fn query<'a>(&'a self, sql: &'a str) -> BoxStream<'a, Result<Row, StoreError>>;

    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Double-quoted SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quoted SQL string literal with `'` doubled. `None` for values with a NUL byte.
pub fn quote_literal(value: &str) -> Option<String> {
    if value.contains('\0') {
        return None;
    }
    Some(format!("'{}'", value.replace('\'', "''")))
}

/// What went wrong at the store boundary (reported to the failure hook).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFailure {
    /// A write of `points` records was dropped.
    Write { points: usize },
    /// A query failed; its result was replaced by an empty one.
    Query,
    /// One row could not be decoded and was skipped.
    Row,
}

pub type FailureHook = Arc<dyn Fn(&StoreFailure) + Send + Sync>;

#[derive(Debug, Default)]
struct StoreStats {
    points_written: AtomicU64,
    write_failures: AtomicU64,
    query_failures: AtomicU64,
    row_failures: AtomicU64,
}

/// Counter values at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStatsSnapshot {
    pub points_written: u64,
    pub write_failures: u64,
    pub query_failures: u64,
    pub row_failures: u64,
}

/// Owns the single store handle. Never returns store errors to callers.
pub struct StoreClient<S> {
    store: S,
    stats: StoreStats,
    on_failure: Option<FailureHook>,
    closed: AtomicBool,
}

impl<S: TimeSeriesStore> StoreClient<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            stats: StoreStats::default(),
            on_failure: None,
            closed: AtomicBool::new(false),
        }
    }

    /// Called on every dropped write, failed query, and skipped row.
    pub fn with_failure_hook(
        mut self,
        hook: impl Fn(&StoreFailure) + Send + Sync + 'static,
    ) -> Self {
        self.on_failure = Some(Arc::new(hook));
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn stats(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            points_written: self.stats.points_written.load(Ordering::Relaxed),
            write_failures: self.stats.write_failures.load(Ordering::Relaxed),
            query_failures: self.stats.query_failures.load(Ordering::Relaxed),
            row_failures: self.stats.row_failures.load(Ordering::Relaxed),
        }
    }

    pub async fn write_one(&self, point: Point) {
        if let Err(e) = self.store.write_point(&point).await {
            tracing::error!(
                error = %e,
                operation = "write_one",
                measurement = %point.measurement,
                "store insert failed, point dropped"
            );
            self.write_failed(1);
            return;
        }
        self.stats.points_written.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn write_many(&self, points: &[Point]) {
        if points.is_empty() {
            return;
        }
        if let Err(e) = self.store.write_points(points).await {
            tracing::error!(
                error = %e,
                operation = "write_many",
                points_count = points.len(),
                "store batch insert failed, batch dropped"
            );
            self.write_failed(points.len());
            return;
        }
        self.stats
            .points_written
            .fetch_add(points.len() as u64, Ordering::Relaxed);
    }

    /// Runs `sql` and maps each row with `decode`. Undecodable rows are skipped; a store
    /// error anywhere in the stream yields an empty result.
    pub async fn query<T, E, F>(&self, sql: &str, mut decode: F) -> Vec<T>
    where
        F: FnMut(&Row) -> Result<T, E>,
        E: Display,
    {
        let mut rows = self.store.query(sql);
        let mut out = Vec::new();
        while let Some(item) = rows.next().await {
            match item {
                Ok(row) => match decode(&row) {
                    Ok(v) => out.push(v),
                    Err(e) => {
                        tracing::warn!(error = %e, operation = "decode_row", "skipping row");
                        self.stats.row_failures.fetch_add(1, Ordering::Relaxed);
                        self.report(StoreFailure::Row);
                    }
                },
                Err(e) => {
                    tracing::error!(error = %e, operation = "query", sql, "store query failed");
                    self.stats.query_failures.fetch_add(1, Ordering::Relaxed);
                    self.report(StoreFailure::Query);
                    return Vec::new();
                }
            }
        }
        out
    }

    /// Closes the store handle. Later calls are no-ops.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.store.close().await;
        tracing::info!("store client closed");
    }

    fn write_failed(&self, points: usize) {
        self.stats.write_failures.fetch_add(1, Ordering::Relaxed);
        self.report(StoreFailure::Write { points });
    }

    fn report(&self, failure: StoreFailure) {
        if let Some(hook) = &self.on_failure {
            hook(&failure);
        }
    }
}
