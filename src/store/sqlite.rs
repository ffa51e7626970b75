// SQLite-backed time-series store: one table per measurement, integer-millis time index.
// Uses sqlx for async + connection pooling; dropping a row stream returns its connection.

use super::{METRIC_MEASUREMENT, Point, Row, StoreError, TimeSeriesStore, Value, quote_ident};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Layout version of the metric table. `init` refuses a database stamped with another one.
pub const SCHEMA_VERSION: i64 = 1;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connect to SQLite at `path`, creating the parent dir and DB file if missing.
    pub async fn connect(
        path: &str,
        max_pool_size: u32,
        busy_timeout: Duration,
    ) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(busy_timeout)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        tracing::info!(path, max_pool_size, "time-series store connected");
        Ok(Self { pool })
    }

    /// Create the metric measurement table and its indexes if they don't exist.
    /// Stamps a fresh database with [`SCHEMA_VERSION`] and rejects a mismatched stamp.
    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (key TEXT PRIMARY KEY, value INTEGER NOT NULL)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("INSERT OR IGNORE INTO schema_version (key, value) VALUES ($1, $2)")
            .bind(METRIC_MEASUREMENT)
            .bind(SCHEMA_VERSION)
            .execute(&self.pool)
            .await?;

        let stored: i64 = sqlx::query_scalar("SELECT value FROM schema_version WHERE key = $1")
            .bind(METRIC_MEASUREMENT)
            .fetch_one(&self.pool)
            .await?;
        anyhow::ensure!(
            stored == SCHEMA_VERSION,
            "metric table schema version is {}, expected {}",
            stored,
            SCHEMA_VERSION
        );

        let table = quote_ident(METRIC_MEASUREMENT);
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                "time" INTEGER NOT NULL,
                "app" TEXT NOT NULL,
                "resource" TEXT NOT NULL,
                "id" INTEGER,
                "createdAt" INTEGER,
                "modifiedAt" INTEGER,
                "passCount" INTEGER,
                "successCount" INTEGER,
                "blockCount" INTEGER,
                "exceptionCount" INTEGER,
                "rt" REAL,
                "count" INTEGER,
                "resourceCode" INTEGER
            )
            "#
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_metric_app_resource_time ON {table}(\"app\", \"resource\", \"time\")"
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS idx_metric_app_time ON {table}(\"app\", \"time\")"
        ))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl TimeSeriesStore for SqliteStore {
    async fn write_points(&self, points: &[Point]) -> Result<(), StoreError> {
        if points.is_empty() {
            return Ok(());
        }
        if self.pool.is_closed() {
            return Err(StoreError::Closed);
        }
        let mut tx = self.pool.begin().await.map_err(write_error)?;
        for p in points {
            let sql = insert_statement(p);
            let mut q = sqlx::query(&sql).bind(p.time.timestamp_millis());
            for (_, v) in &p.tags {
                q = q.bind(v.clone());
            }
            for (_, v) in &p.fields {
                q = match v {
                    Value::Null => q.bind(None::<i64>),
                    Value::Int(i) => q.bind(*i),
                    Value::Float(f) => q.bind(*f),
                    Value::Text(s) => q.bind(s.clone()),
                    Value::Time(t) => q.bind(t.timestamp_millis()),
                };
            }
            q.execute(&mut *tx).await.map_err(write_error)?;
        }
        tx.commit().await.map_err(write_error)?;
        Ok(())
    }

    fn query<'a>(&'a self, sql: &'a str) -> BoxStream<'a, Result<Row, StoreError>> {
        if self.pool.is_closed() {
            return futures_util::stream::once(async { Err(StoreError::Closed) }).boxed();
        }
        sqlx::query(sql)
            .fetch(&self.pool)
            .map(|r| {
                r.map(|row| to_row(&row))
                    .map_err(|e| StoreError::Query(e.to_string()))
            })
            .boxed()
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

fn write_error(e: sqlx::Error) -> StoreError {
    StoreError::Write(e.to_string())
}

/// `INSERT INTO "m" ("time", <tags>, <fields>) VALUES ($1, ...)`.
fn insert_statement(p: &Point) -> String {
    let columns: Vec<String> = std::iter::once("time")
        .chain(p.tags.iter().map(|(k, _)| k.as_str()))
        .chain(p.fields.iter().map(|(k, _)| k.as_str()))
        .map(quote_ident)
        .collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(&p.measurement),
        columns.join(", "),
        placeholders.join(", ")
    )
}

fn to_row(row: &SqliteRow) -> Row {
    let columns = row
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let values = (0..row.len()).map(|i| read_value(row, i)).collect();
    Row::new(columns, values)
}

/// Reads by the stored value's own type (SQLite is dynamically typed per value).
fn read_value(row: &SqliteRow, index: usize) -> Value {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(e) => {
            tracing::debug!(error = %e, index, "unreadable column, treating as null");
            return Value::Null;
        }
    };
    match type_name.as_str() {
        "INTEGER" | "BOOLEAN" => row
            .try_get_unchecked::<i64, _>(index)
            .map(Value::Int)
            .unwrap_or(Value::Null),
        "REAL" | "NUMERIC" => row
            .try_get_unchecked::<f64, _>(index)
            .map(Value::Float)
            .unwrap_or(Value::Null),
        "TEXT" => row
            .try_get_unchecked::<String, _>(index)
            .map(Value::Text)
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}
