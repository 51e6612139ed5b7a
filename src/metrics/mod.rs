// Prometheus query construction and execution
pub mod client;
pub mod query;

// Re-export commonly used items
pub use client::{MetricsBackend, PrometheusClient, DEFAULT_QUERY_TIMEOUT};
pub use query::{namespace_cpu_usage_query, percentile_query, MetricKind, TimeWindow, AVERAGE_PERCENTILE};
