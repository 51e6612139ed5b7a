pub mod render;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::collector::UsageCollector;
use crate::error::ObjectSourceError;
use crate::kubernetes::WorkloadSource;
use crate::metrics::client::MetricsBackend;
use crate::metrics::query::TimeWindow;
use crate::policy::{recommend, recommend_limit_range, recommend_namespace_quota};
use crate::types::*;

/// Recommendations for every workload container of one namespace.
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceReport {
    pub namespace: String,
    pub generated_at: DateTime<Utc>,
    pub window: TimeWindow,
    pub cpu_percentile: f64,
    pub memory_percentile: f64,
    pub workloads: Vec<WorkloadReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaRecommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_range: Option<LimitRangeRecommendation>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkloadReport {
    pub kind: WorkloadKind,
    pub name: String,
    pub containers: Vec<ContainerReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContainerReport {
    pub usage: ContainerUsage,
    pub recommendation: Recommendation,
}

impl ContainerReport {
    /// True when any sample failed or any recommended value is missing.
    pub fn is_degraded(&self) -> bool {
        self.usage.cpu.is_degraded() || self.usage.memory.is_degraded() || !self.recommendation.is_complete()
    }
}

impl NamespaceReport {
    pub fn containers(&self) -> impl Iterator<Item = &ContainerReport> {
        self.workloads.iter().flat_map(|w| w.containers.iter())
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            workload_count: self.workloads.len(),
            container_count: self.containers().count(),
            degraded_count: self.containers().filter(|c| c.is_degraded()).count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSummary {
    pub workload_count: usize,
    pub container_count: usize,
    pub degraded_count: usize,
}

impl ReportSummary {
    pub fn has_degraded(&self) -> bool {
        self.degraded_count > 0
    }
}

/// Drives query -> sample -> recommend for each container of a namespace.
pub struct ReportBuilder<'a, B> {
    collector: UsageCollector<'a, B>,
    policy: &'a NamespacePolicyDefaults,
    include_quota: bool,
    include_limit_range: bool,
}

impl<'a, B: MetricsBackend> ReportBuilder<'a, B> {
    pub fn new(backend: &'a B, policy: &'a NamespacePolicyDefaults) -> Self {
        Self {
            collector: UsageCollector::new(backend, policy),
            policy,
            include_quota: false,
            include_limit_range: false,
        }
    }

    pub fn with_quota(mut self, include: bool) -> Self {
        self.include_quota = include;
        self
    }

    pub fn with_limit_range(mut self, include: bool) -> Self {
        self.include_limit_range = include;
        self
    }

    /// Fails only when the workload listing fails; metrics failures degrade
    /// the affected container and processing continues.
    pub async fn build<S: WorkloadSource>(&self, source: &S, namespace: &str) -> Result<NamespaceReport, ObjectSourceError> {
        let workloads = source.list_workloads(namespace).await?;
        info!(namespace, workloads = workloads.len(), "building recommendations");

        let mut reports = Vec::with_capacity(workloads.len());
        for workload in &workloads {
            reports.push(self.report_workload(namespace, workload).await);
        }

        Ok(NamespaceReport {
            namespace: namespace.to_string(),
            generated_at: Utc::now(),
            window: self.policy.window,
            cpu_percentile: self.policy.cpu_percentile,
            memory_percentile: self.policy.memory_percentile,
            workloads: reports,
            quota: self
                .include_quota
                .then(|| recommend_namespace_quota(namespace, &self.policy.quota)),
            limit_range: self
                .include_limit_range
                .then(|| recommend_limit_range(&self.policy.limit_range)),
        })
    }

    pub async fn report_workload(&self, namespace: &str, workload: &Workload) -> WorkloadReport {
        let init = workload
            .init_containers
            .iter()
            .map(|c| (ContainerType::InitContainer, c));
        let main = workload.containers.iter().map(|c| (ContainerType::Container, c));

        let mut containers = Vec::new();
        for (container_type, spec) in init.chain(main) {
            containers.push(self.report_container(namespace, container_type, spec).await);
        }

        WorkloadReport {
            kind: workload.kind,
            name: workload.name.clone(),
            containers,
        }
    }

    pub async fn report_container(
        &self,
        namespace: &str,
        container_type: ContainerType,
        spec: &ContainerSpec,
    ) -> ContainerReport {
        let cpu = self.collector.collect_cpu(namespace, &spec.name).await;
        let memory = self.collector.collect_memory(namespace, &spec.name).await;

        let usage = ContainerUsage {
            namespace: namespace.to_string(),
            container_name: spec.name.clone(),
            container_type,
            cpu,
            memory,
            current_requests: spec.requests.clone(),
            current_limits: spec.limits.clone(),
        };
        let recommendation = recommend(&usage);

        let report = ContainerReport { usage, recommendation };
        if report.is_degraded() {
            warn!(namespace, container = %spec.name, "recommendation degraded, metrics incomplete");
        }
        report
    }
}
