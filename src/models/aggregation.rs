// Aggregated resource: one entry per resource in a ranking window.
// Built as a copy of the first raw sample, then only ever accumulated into.

use super::MetricSample;

/// Sum of all raw samples seen for one resource within a window.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResource {
    sample: MetricSample,
}

impl AggregatedResource {
    /// Starts an aggregate as a field-by-field copy of the first sample.
    pub fn start(first: &MetricSample) -> Self {
        Self {
            sample: first.clone(),
        }
    }

    /// Folds one more raw sample of the same resource into this aggregate.
    pub fn accumulate(&mut self, s: &MetricSample) {
        self.add_pass_count(s.pass_count);
        self.add_rt_and_success_count(s.avg_rt, s.success_count);
        self.add_block_count(s.block_count);
        self.add_exception_count(s.exception_count);
        self.add_interval_count(1);
    }

    pub fn add_pass_count(&mut self, n: u64) {
        self.sample.pass_count = self.sample.pass_count.saturating_add(n);
    }

    pub fn add_block_count(&mut self, n: u64) {
        self.sample.block_count = self.sample.block_count.saturating_add(n);
    }

    pub fn add_exception_count(&mut self, n: u64) {
        self.sample.exception_count = self.sample.exception_count.saturating_add(n);
    }

    /// Weighted running average of `avg_rt` by success count; success count is summed.
    /// With no successes on either side the average is left as is.
    pub fn add_rt_and_success_count(&mut self, avg_rt: f64, success_count: u64) {
        let prior = self.sample.success_count;
        let total = prior.saturating_add(success_count);
        if total > 0 {
            self.sample.avg_rt = (self.sample.avg_rt * prior as f64
                + avg_rt * success_count as f64)
                / total as f64;
        }
        self.sample.success_count = total;
    }

    pub fn add_interval_count(&mut self, n: u32) {
        self.sample.interval_count = self.sample.interval_count.saturating_add(n);
    }

    pub fn resource(&self) -> &str {
        self.sample.resource()
    }

    pub fn pass_count(&self) -> u64 {
        self.sample.pass_count
    }

    pub fn block_count(&self) -> u64 {
        self.sample.block_count
    }

    pub fn sample(&self) -> &MetricSample {
        &self.sample
    }
}
