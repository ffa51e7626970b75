// Hot-resource ranking tests: merge law, weighted rt, sort order, tie stability

mod common;

use common::counted;
use flow_metrics::metrics_repo::ranking::{merge_by_resource, rank, rank_hot_resources};
use flow_metrics::models::AggregatedResource;

#[test]
fn merge_sums_counters_and_counts_intervals() {
    let samples = vec![counted("/a", 5, 2), counted("/a", 7, 3)];
    let merged = merge_by_resource(&samples);
    assert_eq!(merged.len(), 1);
    let agg = merged[0].sample();
    assert_eq!(agg.pass_count, 12);
    assert_eq!(agg.block_count, 5);
    assert_eq!(agg.interval_count, 2);
}

#[test]
fn merge_sums_exceptions_and_weights_rt_by_success() {
    let mut a = counted("/a", 0, 0);
    a.success_count = 10;
    a.avg_rt = 10.0;
    a.exception_count = 1;
    let mut b = counted("/a", 0, 0);
    b.success_count = 30;
    b.avg_rt = 50.0;
    b.exception_count = 2;

    let merged = merge_by_resource(&[a, b]);
    let agg = merged[0].sample();
    assert_eq!(agg.success_count, 40);
    assert_eq!(agg.avg_rt, 40.0);
    assert_eq!(agg.exception_count, 3);
}

#[test]
fn weighted_rt_unchanged_without_successes() {
    let mut a = counted("/a", 1, 0);
    a.avg_rt = 8.0;
    let mut agg = AggregatedResource::start(&a);
    agg.add_rt_and_success_count(100.0, 0);
    assert_eq!(agg.sample().avg_rt, 8.0);
    assert_eq!(agg.sample().success_count, 0);
}

#[test]
fn aggregate_is_a_copy_of_the_raw_sample() {
    let samples = vec![counted("/a", 5, 2), counted("/a", 7, 3)];
    let merged = merge_by_resource(&samples);
    assert_eq!(samples[0].pass_count, 5);
    assert_eq!(samples[0].interval_count, 1);
    assert_eq!(merged[0].pass_count(), 12);
}

#[test]
fn ranks_by_block_then_pass_descending() {
    let samples = vec![
        counted("A", 100, 10),
        counted("B", 50, 10),
        counted("C", 1, 20),
    ];
    assert_eq!(rank_hot_resources(&samples), vec!["C", "A", "B"]);
}

#[test]
fn ranking_uses_merged_totals() {
    // B alone blocks less than A, but its two intervals together block more.
    let samples = vec![
        counted("A", 10, 6),
        counted("B", 10, 4),
        counted("B", 10, 4),
    ];
    assert_eq!(rank_hot_resources(&samples), vec!["B", "A"]);
}

#[test]
fn ties_keep_first_seen_order() {
    let samples = vec![
        counted("X", 5, 1),
        counted("Y", 5, 1),
        counted("Z", 5, 1),
    ];
    let ranked = rank(merge_by_resource(&samples));
    let names: Vec<&str> = ranked.iter().map(|a| a.resource()).collect();
    assert_eq!(names, vec!["X", "Y", "Z"]);
}

#[test]
fn empty_input_ranks_nothing() {
    assert!(rank_hot_resources(&[]).is_empty());
}
