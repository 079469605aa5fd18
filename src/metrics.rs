//! Metrics collection through the `metrics` facade.
//!
//! Nothing is exported unless the binary installs a recorder; without one
//! every call here is a no-op.

use std::time::Duration;

use anyhow::Result;
use metrics::{counter, histogram};

/// Metric names used across the crate
#[derive(Debug, Clone, Copy)]
pub struct MetricsCollector {
    // Store metrics
    pub store_queries_total: &'static str,
    pub store_query_duration: &'static str,

    // Request metrics
    pub requests_total: &'static str,
    pub rows_aggregated_total: &'static str,

    // Generative model metrics
    pub generation_calls_total: &'static str,
    pub generation_duration: &'static str,
    pub chat_outcomes_total: &'static str,

    // Error metrics
    pub errors_total: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            store_queries_total: "admissions_store_queries_total",
            store_query_duration: "admissions_store_query_duration_seconds",

            requests_total: "admissions_requests_total",
            rows_aggregated_total: "admissions_rows_aggregated_total",

            generation_calls_total: "admissions_generation_calls_total",
            generation_duration: "admissions_generation_duration_seconds",
            chat_outcomes_total: "admissions_chat_outcomes_total",

            errors_total: "admissions_errors_total",
        }
    }
}

fn status(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "error"
    }
}

impl MetricsCollector {
    /// Install the no-op recorder so the facade has a recorder in place
    pub fn init() -> Result<()> {
        metrics::set_global_recorder(metrics::NoopRecorder)
            .map_err(|e| anyhow::anyhow!("Failed to initialize metrics recorder: {}", e))?;

        Ok(())
    }

    /// Record one store round trip
    pub fn record_store_query(&self, kind: &str, duration: Duration, success: bool) {
        let labels = [("kind", kind.to_string()), ("status", status(success).to_string())];

        counter!(self.store_queries_total, &labels).increment(1);
        histogram!(self.store_query_duration, &labels).record(duration.as_secs_f64());

        if !success {
            counter!(self.errors_total, "type" => "store").increment(1);
        }
    }

    /// Record a served request of the given kind (summary, table, chat, ...)
    pub fn record_request(&self, kind: &str) {
        counter!(self.requests_total, "kind" => kind.to_string()).increment(1);
    }

    /// Record how many rows went through the aggregation engine
    pub fn record_rows_aggregated(&self, rows: usize) {
        counter!(self.rows_aggregated_total).increment(rows as u64);
    }

    /// Record one generative model call
    pub fn record_generation(&self, stage: &str, duration: Duration, success: bool) {
        let labels = [("stage", stage.to_string()), ("status", status(success).to_string())];

        counter!(self.generation_calls_total, &labels).increment(1);
        histogram!(self.generation_duration, &labels).record(duration.as_secs_f64());
    }

    /// Record how a chat pipeline run ended
    pub fn record_chat_outcome(&self, outcome: &str) {
        counter!(self.chat_outcomes_total, "outcome" => outcome.to_string()).increment(1);
    }

    /// Record error metrics
    pub fn record_error(&self, error_type: &str, operation: &str) {
        let labels = [
            ("type", error_type.to_string()),
            ("operation", operation.to_string()),
        ];

        counter!(self.errors_total, &labels).increment(1);
    }
}
