use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::metrics::query::TimeWindow;
use crate::quantity::Quantity;

#[derive(Debug, Clone)]
pub struct Config {
    pub prometheus_url: String,
    pub query_timeout: Duration,
    pub policy: NamespacePolicyDefaults,
}

/// Percentiles, window and static bounds driving one recommendation run.
#[derive(Debug, Clone, PartialEq)]
pub struct NamespacePolicyDefaults {
    pub cpu_percentile: f64,
    pub memory_percentile: f64,
    pub window: TimeWindow,
    pub quota: QuotaBounds,
    pub limit_range: LimitRangeBounds,
}

impl Default for NamespacePolicyDefaults {
    fn default() -> Self {
        Self {
            cpu_percentile: 0.99,
            memory_percentile: 0.99,
            window: TimeWindow::default(),
            quota: QuotaBounds::default(),
            limit_range: LimitRangeBounds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaBounds {
    pub cpu: Quantity,
    pub memory: Quantity,
    pub pods: u32,
    pub configmaps: u32,
    pub secrets: u32,
}

impl Default for QuotaBounds {
    fn default() -> Self {
        Self {
            cpu: Quantity::Cores(4),
            memory: Quantity::Gibibytes(8),
            pods: 10,
            configmaps: 10,
            secrets: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourcePair {
    pub cpu: Quantity,
    pub memory: Quantity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitRangeBounds {
    pub min: ResourcePair,
    pub max: ResourcePair,
    pub default: ResourcePair,
    pub default_request: ResourcePair,
}

impl Default for LimitRangeBounds {
    fn default() -> Self {
        Self {
            min: ResourcePair { cpu: Quantity::Millicores(50), memory: Quantity::Mebibytes(50) },
            max: ResourcePair { cpu: Quantity::Cores(2), memory: Quantity::Gibibytes(2) },
            default: ResourcePair { cpu: Quantity::Millicores(500), memory: Quantity::Mebibytes(500) },
            default_request: ResourcePair { cpu: Quantity::Millicores(100), memory: Quantity::Mebibytes(100) },
        }
    }
}

/// One metrics reading. `Degraded` stands in for a value the backend could
/// not deliver and must never be shown as zero usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Sample {
    Measured { value: f64 },
    Degraded { reason: String },
}

impl Sample {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Measured { value } => Some(*value),
            Self::Degraded { .. } => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            Self::Measured { value } => Self::Measured { value: f(value) },
            degraded => degraded,
        }
    }
}

/// Median and tail readings for one resource of one container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceSample {
    pub average: Sample,
    pub percentile: Sample,
}

impl ResourceSample {
    pub fn measured(average: f64, percentile: f64) -> Self {
        Self {
            average: Sample::Measured { value: average },
            percentile: Sample::Measured { value: percentile },
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.average.is_degraded() || self.percentile.is_degraded()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContainerType {
    Container,
    InitContainer,
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Container => write!(f, "Container"),
            Self::InitContainer => write!(f, "InitContainer"),
        }
    }
}

/// Requests or limits as declared on the pod template, verbatim.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DeclaredResources {
    pub cpu: Option<String>,
    pub memory: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSpec {
    pub name: String,
    pub requests: DeclaredResources,
    pub limits: DeclaredResources,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deployment => write!(f, "Deployment"),
            Self::StatefulSet => write!(f, "StatefulSet"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Workload {
    pub kind: WorkloadKind,
    pub name: String,
    pub init_containers: Vec<ContainerSpec>,
    pub containers: Vec<ContainerSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerUsage {
    pub namespace: String,
    pub container_name: String,
    pub container_type: ContainerType,
    pub cpu: ResourceSample,
    pub memory: ResourceSample,
    pub current_requests: DeclaredResources,
    pub current_limits: DeclaredResources,
}

/// `None` marks a value that could not be computed from degraded samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Recommendation {
    pub requested_cpu: Option<Quantity>,
    pub requested_memory: Option<Quantity>,
    pub limit_cpu: Option<Quantity>,
    pub limit_memory: Option<Quantity>,
}

impl Recommendation {
    pub fn is_complete(&self) -> bool {
        self.requested_cpu.is_some()
            && self.requested_memory.is_some()
            && self.limit_cpu.is_some()
            && self.limit_memory.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaRecommendation {
    pub namespace: String,
    pub hard: QuotaBounds,
}

pub type LimitRangeRecommendation = LimitRangeBounds;
