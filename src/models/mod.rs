// Domain models: raw metric samples and per-window aggregates

mod aggregation;
mod metric;

pub use aggregation::AggregatedResource;
pub use metric::{
    MetricSample, instant_from_millis, now_instant, now_millis, resource_code,
    truncate_to_millis,
};
