use tracing::warn;

use crate::quantity::Quantity;
use crate::types::{
    ContainerUsage, LimitRangeBounds, LimitRangeRecommendation, QuotaBounds, QuotaRecommendation,
    Recommendation, ResourcePair, Sample,
};

/// Median usage anchors the request, the configured tail percentile the limit.
pub fn recommend(usage: &ContainerUsage) -> Recommendation {
    let cpu = |sample: &Sample| to_quantity(usage, sample, Quantity::cpu);
    let memory = |sample: &Sample| to_quantity(usage, sample, Quantity::memory);

    Recommendation {
        requested_cpu: cpu(&usage.cpu.average),
        limit_cpu: cpu(&usage.cpu.percentile),
        requested_memory: memory(&usage.memory.average),
        limit_memory: memory(&usage.memory.percentile),
    }
}

fn to_quantity<F, E>(usage: &ContainerUsage, sample: &Sample, convert: F) -> Option<Quantity>
where
    F: Fn(f64) -> Result<Quantity, E>,
    E: std::fmt::Display,
{
    let value = sample.value()?;
    match convert(value) {
        Ok(q) => Some(q),
        Err(e) => {
            warn!(
                namespace = %usage.namespace,
                container = %usage.container_name,
                "dropping unusable sample: {}", e
            );
            None
        }
    }
}

/// Static namespace ceilings. A coarse starting point, not derived from usage.
pub fn recommend_namespace_quota(namespace: &str, bounds: &QuotaBounds) -> QuotaRecommendation {
    QuotaRecommendation {
        namespace: namespace.to_string(),
        hard: bounds.clone(),
    }
}

/// Limit range from static bounds. `max.memory` is raised to the largest of
/// the four memory bounds so no other field can exceed it.
pub fn recommend_limit_range(bounds: &LimitRangeBounds) -> LimitRangeRecommendation {
    let max_mib = [bounds.min, bounds.max, bounds.default, bounds.default_request]
        .iter()
        .filter_map(|pair| pair.memory.as_mebibytes())
        .fold(0.0_f64, f64::max);

    let max_memory = match Quantity::memory(max_mib) {
        Ok(q) if q.as_mebibytes().is_some_and(|mib| mib >= max_mib) => q,
        _ => Quantity::Mebibytes(max_mib.ceil() as u64),
    };

    LimitRangeBounds {
        max: ResourcePair {
            cpu: bounds.max.cpu,
            memory: max_memory,
        },
        ..bounds.clone()
    }
}
