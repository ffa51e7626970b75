// Metrics repository over a time-series store.
// Best-effort telemetry path: blank identifiers and store failures degrade to
// "no write" / "no rows", never to an error the caller has to handle.

pub mod codec;
pub mod query;
pub mod ranking;

use crate::models::{MetricSample, now_millis};
use crate::store::{StoreClient, StoreStatsSnapshot, TimeSeriesStore};
use query::MetricQuery;
use tracing::instrument;

/// Trailing window scanned by [`MetricsRepository::list_hot_resources`].
pub const HOT_WINDOW_MS: i64 = 60_000;

pub struct MetricsRepository<S> {
    client: StoreClient<S>,
    hot_window_ms: i64,
}

impl<S: TimeSeriesStore> MetricsRepository<S> {
    pub fn new(client: StoreClient<S>) -> Self {
        Self {
            client,
            hot_window_ms: HOT_WINDOW_MS,
        }
    }

    /// Overrides the trailing window. Non-positive widths are ignored.
    pub fn with_hot_window_ms(mut self, hot_window_ms: i64) -> Self {
        if hot_window_ms <= 0 {
            tracing::warn!(
                hot_window_ms,
                default_ms = HOT_WINDOW_MS,
                "non-positive hot window ignored"
            );
            return self;
        }
        self.hot_window_ms = hot_window_ms;
        self
    }

    pub fn client(&self) -> &StoreClient<S> {
        &self.client
    }

    pub fn store_stats(&self) -> StoreStatsSnapshot {
        self.client.stats()
    }

    /// Writes one sample. Blank `app` is a no-op. Assigns `id` (epoch millis) if unset.
    #[instrument(skip(self, sample), fields(repo = "metrics", operation = "save"))]
    pub async fn save(&self, sample: &mut MetricSample) {
        if sample.app.trim().is_empty() {
            return;
        }
        if sample.id.is_none() {
            sample.id = Some(now_millis());
        }
        match codec::encode(sample) {
            Ok(point) => self.client.write_one(point).await,
            Err(e) => tracing::warn!(error = %e, app = %sample.app, "sample not written"),
        }
    }

    /// Writes all samples with a non-blank `app` as a single batch, in input order.
    #[instrument(skip(self, samples), fields(repo = "metrics", operation = "save_all", samples_count = samples.len()))]
    pub async fn save_all(&self, samples: &mut [MetricSample]) {
        let mut points = Vec::with_capacity(samples.len());
        for sample in samples.iter_mut() {
            if sample.app.trim().is_empty() {
                continue;
            }
            if sample.id.is_none() {
                sample.id = Some(now_millis());
            }
            match codec::encode(sample) {
                Ok(point) => points.push(point),
                Err(e) => tracing::warn!(error = %e, app = %sample.app, "sample skipped from batch"),
            }
        }
        if points.is_empty() {
            return;
        }
        self.client.write_many(&points).await;
    }

    /// Samples of `app`/`resource` in `[start_ms, end_ms]`, most recent first.
    #[instrument(skip(self), fields(repo = "metrics", operation = "query_range"))]
    pub async fn query_range(
        &self,
        app: &str,
        resource: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Vec<MetricSample> {
        let Some(sql) = MetricQuery::range(app, resource, start_ms, end_ms).build() else {
            return Vec::new();
        };
        self.client.query(&sql, codec::decode).await
    }

    /// Resources of `app` seen in the trailing window, hottest first
    /// (block count descending, then pass count descending).
    #[instrument(skip(self), fields(repo = "metrics", operation = "list_hot_resources"))]
    pub async fn list_hot_resources(&self, app: &str) -> Vec<String> {
        let end_ms = now_millis();
        let start_ms = end_ms.saturating_sub(self.hot_window_ms);
        let Some(sql) = MetricQuery::window(app, start_ms, end_ms).build() else {
            return Vec::new();
        };
        let samples = self.client.query(&sql, codec::decode).await;
        if samples.is_empty() {
            return Vec::new();
        }
        let ranked = ranking::rank_hot_resources(&samples);
        tracing::debug!(
            samples_count = samples.len(),
            resources_count = ranked.len(),
            "hot resources ranked"
        );
        ranked
    }

    /// Releases the store handle. Safe to call more than once.
    pub async fn close(&self) {
        self.client.close().await;
    }
}
