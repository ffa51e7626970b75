// Hot-resource ranking: pure merge + sort over raw samples of one window.
// DB access (the window scan) stays in metrics_repo::mod.

use std::collections::HashMap;

use crate::models::{AggregatedResource, MetricSample};

/// Groups samples by resource. The first sample of a resource is copied, later ones
/// are accumulated into the copy. Output keeps first-seen order.
pub fn merge_by_resource(samples: &[MetricSample]) -> Vec<AggregatedResource> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(32);
    let mut merged: Vec<AggregatedResource> = Vec::new();
    for s in samples {
        match index.get(s.resource()) {
            Some(&i) => merged[i].accumulate(s),
            None => {
                index.insert(s.resource(), merged.len());
                merged.push(AggregatedResource::start(s));
            }
        }
    }
    merged
}

/// Sorts by block count, then pass count, both descending. Stable: ties keep input order.
pub fn rank(mut aggregates: Vec<AggregatedResource>) -> Vec<AggregatedResource> {
    aggregates.sort_by(|a, b| {
        b.block_count()
            .cmp(&a.block_count())
            .then_with(|| b.pass_count().cmp(&a.pass_count()))
    });
    aggregates
}

/// Resource names of `samples`, hottest first.
pub fn rank_hot_resources(samples: &[MetricSample]) -> Vec<String> {
    rank(merge_by_resource(samples))
        .into_iter()
        .map(|a| a.resource().to_string())
        .collect()
}
