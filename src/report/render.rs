use crate::quantity::Quantity;
use crate::report::{ContainerReport, NamespaceReport};
use crate::types::{DeclaredResources, LimitRangeRecommendation, QuotaRecommendation, Sample};

const UNKNOWN: &str = "unknown";

/// Human-readable report in Kubernetes manifest layout.
pub fn render_text(report: &NamespaceReport) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push(format!(
        "Namespace: {} (window {}, cpu p{}, memory p{})",
        report.namespace,
        report.window,
        percent(report.cpu_percentile),
        percent(report.memory_percentile),
    ));

    if report.workloads.is_empty() {
        lines.push("No Deployments or StatefulSets found.".to_string());
    }
    for workload in &report.workloads {
        lines.push(format!("{}: {}", workload.kind, workload.name));
        for container in &workload.containers {
            render_container(&mut lines, container);
        }
    }

    if let Some(quota) = &report.quota {
        render_quota(&mut lines, quota);
    }
    if let Some(range) = &report.limit_range {
        render_limit_range(&mut lines, range);
    }

    let summary = report.summary();
    if summary.has_degraded() {
        lines.push(format!(
            "Warning: {} of {} containers have incomplete metrics; values marked {} were not computed.",
            summary.degraded_count, summary.container_count, UNKNOWN
        ));
    }

    lines.push(String::new());
    lines.join("\n")
}

fn render_container(lines: &mut Vec<String>, container: &ContainerReport) {
    let usage = &container.usage;
    let rec = &container.recommendation;

    lines.push(format!("  {}: {}", usage.container_type, usage.container_name));
    lines.push(format!("    Requests: {}", declared(&usage.current_requests)));
    lines.push(format!("    Limits:   {}", declared(&usage.current_limits)));
    lines.push(format!(
        "    Usage (median/percentile): CPU={}/{} cores, Memory={}/{} MiB",
        sample(&usage.cpu.average, 3),
        sample(&usage.cpu.percentile, 3),
        sample(&usage.memory.average, 0),
        sample(&usage.memory.percentile, 0),
    ));
    lines.push("    Recommended resources:".to_string());
    lines.push("        limits:".to_string());
    lines.push(format!("          cpu: {}", quantity(rec.limit_cpu)));
    lines.push(format!("          memory: {}", quantity(rec.limit_memory)));
    lines.push("        requests:".to_string());
    lines.push(format!("          cpu: {}", quantity(rec.requested_cpu)));
    lines.push(format!("          memory: {}", quantity(rec.requested_memory)));

    for reason in [&usage.cpu.average, &usage.cpu.percentile, &usage.memory.average, &usage.memory.percentile]
        .into_iter()
        .filter_map(|s| match s {
            Sample::Degraded { reason } => Some(reason),
            Sample::Measured { .. } => None,
        })
    {
        lines.push(format!("    ! metrics unavailable: {}", reason));
    }
}

fn render_quota(lines: &mut Vec<String>, quota: &QuotaRecommendation) {
    lines.push("Recommended Resource Quotas:".to_string());
    lines.push("  hard:".to_string());
    lines.push(format!("    cpu: {}", quota.hard.cpu));
    lines.push(format!("    memory: {}", quota.hard.memory));
    lines.push(format!("    pods: {}", quota.hard.pods));
    lines.push(format!("    configmaps: {}", quota.hard.configmaps));
    lines.push(format!("    secrets: {}", quota.hard.secrets));
}

fn render_limit_range(lines: &mut Vec<String>, range: &LimitRangeRecommendation) {
    lines.push("Recommended Limit Ranges:".to_string());
    lines.push("  limits:".to_string());
    for (label, pair) in [
        ("min", range.min),
        ("max", range.max),
        ("default", range.default),
        ("defaultRequest", range.default_request),
    ] {
        lines.push(format!("    {}:", label));
        lines.push(format!("      cpu: {}", pair.cpu));
        lines.push(format!("      memory: {}", pair.memory));
    }
}

fn declared(resources: &DeclaredResources) -> String {
    format!(
        "CPU={}, Memory={}",
        resources.cpu.as_deref().unwrap_or("-"),
        resources.memory.as_deref().unwrap_or("-"),
    )
}

fn quantity(q: Option<Quantity>) -> String {
    q.map(|q| q.to_string()).unwrap_or_else(|| UNKNOWN.to_string())
}

fn sample(s: &Sample, precision: usize) -> String {
    match s.value() {
        Some(v) => format!("{:.*}", precision, v),
        None => UNKNOWN.to_string(),
    }
}

fn percent(p: f64) -> String {
    format!("{}", (p * 1000.0).round() / 10.0)
}
