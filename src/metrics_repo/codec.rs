// Record codec: MetricSample <-> store Point / positional Row.
//
// Read-side column order is fixed. Reordering COLUMNS breaks every reader; change the
// query projection and the store schema version together.

use crate::models::{MetricSample, instant_from_millis, now_instant, now_millis};
use crate::store::{METRIC_MEASUREMENT, Point, Row, Value};
use chrono::{DateTime, Utc};
use thiserror::Error;

pub const MEASUREMENT: &str = METRIC_MEASUREMENT;

/// Fixed read projection, in row order.
pub const COLUMNS: [&str; 13] = [
    "time",
    "app",
    "resource",
    "id",
    "createdAt",
    "modifiedAt",
    "passCount",
    "successCount",
    "blockCount",
    "exceptionCount",
    "rt",
    "count",
    "resourceCode",
];

const TIME: usize = 0;
const APP: usize = 1;
const RESOURCE: usize = 2;
const ID: usize = 3;
const CREATED_AT: usize = 4;
const MODIFIED_AT: usize = 5;
const PASS_COUNT: usize = 6;
const SUCCESS_COUNT: usize = 7;
const BLOCK_COUNT: usize = 8;
const EXCEPTION_COUNT: usize = 9;
const RT: usize = 10;
const COUNT: usize = 11;
const RESOURCE_CODE: usize = 12;

#[derive(Debug, Error, PartialEq)]
pub enum CodecError {
    #[error("{0} must not be blank")]
    Blank(&'static str),
    #[error("schema mismatch: row has {actual} columns, expected {expected}")]
    ColumnCount { expected: usize, actual: usize },
    #[error("schema mismatch: column {index} is {actual:?}, expected {expected:?}")]
    ColumnName {
        index: usize,
        expected: &'static str,
        actual: String,
    },
    #[error("column {0} is not text")]
    NotText(&'static str),
}

/// Sample -> Point. `app` and `resource` are the only tags; the time index is `timestamp`.
/// A missing id is filled with the current epoch millis on the wire.
pub fn encode(sample: &MetricSample) -> Result<Point, CodecError> {
    if sample.app.trim().is_empty() {
        return Err(CodecError::Blank("app"));
    }
    if sample.resource().trim().is_empty() {
        return Err(CodecError::Blank("resource"));
    }
    let id = sample.id.unwrap_or_else(now_millis);
    Ok(Point::measurement(MEASUREMENT)
        .tag("app", sample.app.as_str())
        .tag("resource", sample.resource())
        .field("id", Value::Int(id))
        .field("createdAt", Value::Int(sample.created_at().timestamp_millis()))
        .field("modifiedAt", Value::Int(sample.modified_at().timestamp_millis()))
        .field("passCount", count_value(sample.pass_count))
        .field("successCount", count_value(sample.success_count))
        .field("blockCount", count_value(sample.block_count))
        .field("exceptionCount", count_value(sample.exception_count))
        .field("rt", Value::Float(sample.avg_rt))
        .field("count", Value::Int(sample.interval_count as i64))
        .field("resourceCode", Value::Int(sample.resource_code() as i64))
        .timestamp(sample.timestamp()))
}

/// Row (in [`COLUMNS`] order) -> sample.
pub fn decode(row: &Row) -> Result<MetricSample, CodecError> {
    check_schema(row)?;

    let timestamp = to_instant(row.get(TIME)).unwrap_or_else(now_instant);
    let app = to_text(row.get(APP), "app")?;
    let resource = to_text(row.get(RESOURCE), "resource")?;

    let mut sample = MetricSample::new(app, resource, timestamp);
    sample.id = to_i64(row.get(ID));
    sample.set_created_at(to_instant(row.get(CREATED_AT)).unwrap_or_else(now_instant));
    sample.set_modified_at(to_instant(row.get(MODIFIED_AT)).unwrap_or_else(now_instant));
    sample.pass_count = to_count(row.get(PASS_COUNT));
    sample.success_count = to_count(row.get(SUCCESS_COUNT));
    sample.block_count = to_count(row.get(BLOCK_COUNT));
    sample.exception_count = to_count(row.get(EXCEPTION_COUNT));
    sample.avg_rt = to_rt(row.get(RT));
    sample.interval_count = to_count(row.get(COUNT)).clamp(1, u32::MAX as u64) as u32;

    // resourceCode is derived from resource; the stored value is only compared.
    if let Some(stored) = to_i64(row.get(RESOURCE_CODE))
        && stored != sample.resource_code() as i64
    {
        tracing::debug!(
            resource = sample.resource(),
            stored,
            derived = sample.resource_code(),
            "stored resourceCode differs from derived"
        );
    }

    Ok(sample)
}

fn check_schema(row: &Row) -> Result<(), CodecError> {
    if row.len() != COLUMNS.len() {
        return Err(CodecError::ColumnCount {
            expected: COLUMNS.len(),
            actual: row.len(),
        });
    }
    if row.columns().is_empty() {
        return Ok(());
    }
    for (index, (actual, expected)) in row.columns().iter().zip(COLUMNS).enumerate() {
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(CodecError::ColumnName {
                index,
                expected,
                actual: actual.clone(),
            });
        }
    }
    Ok(())
}

fn count_value(n: u64) -> Value {
    Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

fn to_text(v: &Value, column: &'static str) -> Result<String, CodecError> {
    match v {
        Value::Text(s) => Ok(s.clone()),
        _ => Err(CodecError::NotText(column)),
    }
}

fn to_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Int(i) => Some(*i),
        Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        _ => None,
    }
}

/// Null, non-numeric, and negative values read as 0.
fn to_count(v: &Value) -> u64 {
    to_i64(v).map(|i| i.max(0) as u64).unwrap_or(0)
}

fn to_rt(v: &Value) -> f64 {
    let rt = match v {
        Value::Int(i) => *i as f64,
        Value::Float(f) if f.is_finite() => *f,
        _ => 0.0,
    };
    rt.max(0.0)
}

/// Native timestamps, epoch millis, or RFC 3339 text. Anything else is `None`.
fn to_instant(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::Time(t) => Some(*t),
        Value::Int(ms) => DateTime::from_timestamp_millis(*ms),
        Value::Float(ms) if ms.is_finite() => Some(instant_from_millis(ms.trunc() as i64)),
        Value::Text(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    }
}
