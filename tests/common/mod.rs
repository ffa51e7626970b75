// Shared test helpers: sample builders and a recording in-memory store

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use flow_metrics::metrics_repo::codec::COLUMNS;
use flow_metrics::models::{MetricSample, instant_from_millis};
use flow_metrics::store::{Point, Row, StoreError, TimeSeriesStore, Value};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

pub fn sample(app: &str, resource: &str, timestamp: DateTime<Utc>) -> MetricSample {
    let mut s = MetricSample::new(app, resource, timestamp);
    s.set_created_at(instant_from_millis(1_700_000_000_000));
    s.set_modified_at(instant_from_millis(1_700_000_000_500));
    s
}

pub fn counted(resource: &str, pass: u64, block: u64) -> MetricSample {
    let mut s = sample("app", resource, instant_from_millis(1_700_000_000_000));
    s.pass_count = pass;
    s.block_count = block;
    s
}

/// Builds the row a store would return for `point` under the fixed projection.
pub fn row_from_point(point: &Point) -> Row {
    let values = COLUMNS
        .iter()
        .map(|c| match *c {
            "time" => Value::Time(point.time),
            "app" | "resource" => point
                .tag_value(c)
                .map(|v| Value::Text(v.to_string()))
                .unwrap_or(Value::Null),
            _ => point.field_value(c).cloned().unwrap_or(Value::Null),
        })
        .collect();
    Row::new(COLUMNS.iter().map(|c| c.to_string()).collect(), values)
}

/// Records every write batch and query; answers queries with canned rows.
#[derive(Default)]
pub struct RecordingStore {
    pub batches: Mutex<Vec<Vec<Point>>>,
    pub queries: Mutex<Vec<String>>,
    pub rows: Mutex<Vec<Row>>,
    pub fail_writes: AtomicBool,
    pub fail_queries: AtomicBool,
    pub closed: Mutex<u32>,
}

impl RecordingStore {
    pub fn with_rows(rows: Vec<Row>) -> Self {
        let store = Self::default();
        *store.rows.lock().unwrap() = rows;
        store
    }

    pub fn batches(&self) -> Vec<Vec<Point>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

impl TimeSeriesStore for RecordingStore {
    async fn write_points(&self, points: &[Point]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(StoreError::Write("connection refused".into()));
        }
        self.batches.lock().unwrap().push(points.to_vec());
        Ok(())
    }

    fn query<'a>(&'a self, sql: &'a str) -> BoxStream<'a, Result<Row, StoreError>> {
        self.queries.lock().unwrap().push(sql.to_string());
        let rows = self.rows.lock().unwrap().clone();
        if self.fail_queries.load(Ordering::Relaxed) {
            // One good row, then a transport error mid-stream.
            let first = rows.into_iter().take(1).map(Ok);
            let err = std::iter::once(Err(StoreError::Query("syntax error".into())));
            return futures_util::stream::iter(first.chain(err).collect::<Vec<_>>()).boxed();
        }
        futures_util::stream::iter(rows.into_iter().map(Ok)).boxed()
    }

    async fn close(&self) {
        *self.closed.lock().unwrap() += 1;
    }
}
