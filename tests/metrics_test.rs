//! Unit tests for metrics.rs module

use std::time::Duration;

use admissions_explorer::error::ExplorerError;
use admissions_explorer::metrics::MetricsCollector;

#[test]
fn test_metric_names() {
    let collector = MetricsCollector::default();

    assert_eq!(collector.store_queries_total, "admissions_store_queries_total");
    assert_eq!(collector.store_query_duration, "admissions_store_query_duration_seconds");
    assert_eq!(collector.requests_total, "admissions_requests_total");
    assert_eq!(collector.rows_aggregated_total, "admissions_rows_aggregated_total");
    assert_eq!(collector.generation_calls_total, "admissions_generation_calls_total");
    assert_eq!(collector.generation_duration, "admissions_generation_duration_seconds");
    assert_eq!(collector.chat_outcomes_total, "admissions_chat_outcomes_total");
    assert_eq!(collector.errors_total, "admissions_errors_total");
}

#[test]
fn test_metric_names_share_prefix() {
    let collector = MetricsCollector::default();
    for name in [
        collector.store_queries_total,
        collector.store_query_duration,
        collector.requests_total,
        collector.rows_aggregated_total,
        collector.generation_calls_total,
        collector.generation_duration,
        collector.chat_outcomes_total,
        collector.errors_total,
    ] {
        assert!(name.starts_with("admissions_"), "{name}");
    }
}

#[test]
fn test_recording_without_recorder() {
    let collector = MetricsCollector::default();

    collector.record_store_query("count", Duration::from_millis(12), true);
    collector.record_store_query("query", Duration::from_millis(40), false);
    collector.record_request("summary");
    collector.record_rows_aggregated(25);
    collector.record_generation("answer", Duration::from_secs(2), true);
    collector.record_chat_outcome("done");
    collector.record_error(ExplorerError::NoMatchingData.kind(), "summary");
}

#[test]
fn test_error_kinds_are_distinct_labels() {
    let errors = [
        ExplorerError::BackendUnavailable(String::new()),
        ExplorerError::ServiceUnconfigured,
        ExplorerError::SchemaUnavailable(String::new()),
        ExplorerError::NoMatchingData,
        ExplorerError::Validation(String::new()),
        ExplorerError::RejectedStatement(String::new()),
        ExplorerError::Generation(String::new()),
        ExplorerError::Config(String::new()),
    ];
    let mut kinds: Vec<&str> = errors.iter().map(ExplorerError::kind).collect();
    kinds.sort_unstable();
    kinds.dedup();
    assert_eq!(kinds.len(), errors.len());
}
