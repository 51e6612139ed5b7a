use tracing::{debug, warn};

use crate::metrics::client::MetricsBackend;
use crate::metrics::query::{percentile_query, MetricKind, AVERAGE_PERCENTILE};
use crate::quantity::MIB_PER_GIB;
use crate::types::{NamespacePolicyDefaults, ResourceSample, Sample};

/// Samples one container's usage from the metrics backend.
pub struct UsageCollector<'a, B> {
    backend: &'a B,
    policy: &'a NamespacePolicyDefaults,
}

impl<'a, B: MetricsBackend> UsageCollector<'a, B> {
    pub fn new(backend: &'a B, policy: &'a NamespacePolicyDefaults) -> Self {
        Self { backend, policy }
    }

    /// CPU usage in cores.
    pub async fn collect_cpu(&self, namespace: &str, container: &str) -> ResourceSample {
        self.collect(namespace, container, MetricKind::CpuRate, self.policy.cpu_percentile)
            .await
    }

    /// Memory usage in mebibytes. The backend answers in GiB.
    pub async fn collect_memory(&self, namespace: &str, container: &str) -> ResourceSample {
        let sample = self
            .collect(namespace, container, MetricKind::MemoryBytes, self.policy.memory_percentile)
            .await;
        ResourceSample {
            average: sample.average.map(|gib| gib * MIB_PER_GIB),
            percentile: sample.percentile.map(|gib| gib * MIB_PER_GIB),
        }
    }

    async fn collect(&self, namespace: &str, container: &str, kind: MetricKind, percentile: f64) -> ResourceSample {
        let window = &self.policy.window;
        let average = percentile_query(namespace, container, kind, AVERAGE_PERCENTILE, window);
        let tail = percentile_query(namespace, container, kind, percentile, window);

        ResourceSample {
            average: self.sample(&average).await,
            percentile: self.sample(&tail).await,
        }
    }

    async fn sample(&self, query: &str) -> Sample {
        match self.backend.execute(query).await {
            Ok(value) => {
                debug!(query, value, "sampled");
                Sample::Measured { value }
            }
            Err(e) => {
                warn!(query, "metrics query failed, sample degraded: {}", e);
                Sample::Degraded { reason: e.to_string() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetricsError;
    use std::sync::Mutex;

    /// Answers by looking for a marker in the query text and records every query.
    struct ScriptedBackend {
        answers: Vec<(&'static str, f64)>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(answers: Vec<(&'static str, f64)>) -> Self {
            Self {
                answers,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl MetricsBackend for ScriptedBackend {
        async fn execute(&self, query: &str) -> Result<f64, MetricsError> {
            self.seen.lock().unwrap().push(query.to_string());
            self.answers
                .iter()
                .find(|(marker, _)| query.contains(marker))
                .map(|(_, value)| *value)
                .ok_or(MetricsError::NoData)
        }
    }

    fn policy() -> NamespacePolicyDefaults {
        NamespacePolicyDefaults {
            cpu_percentile: 0.95,
            memory_percentile: 0.9,
            ..NamespacePolicyDefaults::default()
        }
    }

    #[test]
    fn test_collect_cpu_issues_median_then_tail() {
        let backend = ScriptedBackend::new(vec![
            ("quantile_over_time(0.5, node", 0.05),
            ("quantile_over_time(0.95, node", 0.12),
        ]);
        let policy = policy();
        let collector = UsageCollector::new(&backend, &policy);

        let sample = tokio_test::block_on(collector.collect_cpu("shop", "api"));
        assert_eq!(sample, ResourceSample::measured(0.05, 0.12));

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen[0].starts_with("quantile_over_time(0.5,"));
        assert!(seen[1].starts_with("quantile_over_time(0.95,"));
        assert!(seen.iter().all(|q| q.contains(r#"container="api""#) && q.ends_with("[1d])")));
    }

    #[test]
    fn test_collect_memory_converts_gib_to_mib() {
        let backend = ScriptedBackend::new(vec![
            ("quantile_over_time(0.5, container_memory", 0.25),
            ("quantile_over_time(0.9, container_memory", 2.0),
        ]);
        let policy = policy();
        let collector = UsageCollector::new(&backend, &policy);

        let sample = tokio_test::block_on(collector.collect_memory("shop", "api"));
        assert_eq!(sample, ResourceSample::measured(256.0, 2048.0));
    }

    #[test]
    fn test_failed_queries_degrade_instead_of_zero() {
        let backend = ScriptedBackend::new(vec![("quantile_over_time(0.5, container_memory", 0.5)]);
        let policy = policy();
        let collector = UsageCollector::new(&backend, &policy);

        let sample = tokio_test::block_on(collector.collect_memory("shop", "api"));
        assert_eq!(sample.average, Sample::Measured { value: 512.0 });
        assert_eq!(
            sample.percentile,
            Sample::Degraded {
                reason: "query returned no series".to_string()
            }
        );
        assert!(sample.is_degraded());
    }
}
