use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::InvalidWindow;

/// Percentile issued for the steady-state ("average") sample, independent of
/// the configured tail percentile.
pub const AVERAGE_PERCENTILE: f64 = 0.5;

const CPU_SERIES: &str = "node_namespace_pod_container:container_cpu_usage_seconds_total:sum_irate";
const MEMORY_SERIES: &str = "container_memory_usage_bytes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    CpuRate,
    MemoryBytes,
}

/// Lookback window of a range selector, rendered in Prometheus duration syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow(Duration);

const WINDOW_UNITS: &[(char, u64)] = &[
    ('w', 7 * 24 * 60 * 60),
    ('d', 24 * 60 * 60),
    ('h', 60 * 60),
    ('m', 60),
    ('s', 1),
];

impl TimeWindow {
    pub fn from_secs(secs: u64) -> Result<Self, InvalidWindow> {
        if secs == 0 {
            return Err(InvalidWindow("0s".to_string()));
        }
        Ok(Self(Duration::from_secs(secs)))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self(Duration::from_secs(24 * 60 * 60))
    }
}

impl FromStr for TimeWindow {
    type Err = InvalidWindow;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidWindow(s.to_string());
        let mut rest = s.trim();
        if rest.is_empty() {
            return Err(invalid());
        }

        let mut total: u64 = 0;
        while !rest.is_empty() {
            let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
            if digits == 0 {
                return Err(invalid());
            }
            let amount: u64 = rest[..digits].parse().map_err(|_| invalid())?;
            let unit = rest[digits..].chars().next().ok_or_else(invalid)?;
            let (_, secs) = WINDOW_UNITS
                .iter()
                .find(|(u, _)| *u == unit)
                .ok_or_else(invalid)?;
            total = amount
                .checked_mul(*secs)
                .and_then(|v| total.checked_add(v))
                .ok_or_else(invalid)?;
            rest = &rest[digits + unit.len_utf8()..];
        }

        Self::from_secs(total).map_err(|_| invalid())
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut remaining = self.0.as_secs();
        if remaining == 0 {
            return write!(f, "0s");
        }
        // weeks are left out so that 14d stays 14d
        for (unit, secs) in WINDOW_UNITS.iter().skip(1) {
            if remaining >= *secs {
                write!(f, "{}{}", remaining / secs, unit)?;
                remaining %= secs;
            }
        }
        Ok(())
    }
}

impl Serialize for TimeWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Builds the quantile-over-time expression for one container's series.
/// Memory is scaled from bytes to GiB inside the expression.
pub fn percentile_query(
    namespace: &str,
    container: &str,
    kind: MetricKind,
    percentile: f64,
    window: &TimeWindow,
) -> String {
    let namespace = escape_label_value(namespace);
    let container = escape_label_value(container);
    match kind {
        MetricKind::CpuRate => format!(
            r#"quantile_over_time({}, {}{{namespace="{}", container="{}"}}[{}])"#,
            percentile, CPU_SERIES, namespace, container, window
        ),
        MetricKind::MemoryBytes => format!(
            r#"quantile_over_time({}, {}{{namespace="{}", container="{}"}}[{}]) / (1024 * 1024 * 1024)"#,
            percentile, MEMORY_SERIES, namespace, container, window
        ),
    }
}

/// Current CPU usage of a whole namespace, in cores.
pub fn namespace_cpu_usage_query(namespace: &str) -> String {
    format!(
        r#"sum(rate(container_cpu_usage_seconds_total{{namespace="{}"}}[5m]))"#,
        escape_label_value(namespace)
    )
}

fn escape_label_value(value: &str) -> Cow<'_, str> {
    if value.contains(['\\', '"', '\n']) {
        Cow::Owned(
            value
                .replace('\\', r"\\")
                .replace('"', r#"\""#)
                .replace('\n', r"\n"),
        )
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_percentile_query() {
        let window: TimeWindow = "30m".parse().unwrap();
        let query = percentile_query("shop", "api", MetricKind::CpuRate, 0.99, &window);
        assert_eq!(
            query,
            r#"quantile_over_time(0.99, node_namespace_pod_container:container_cpu_usage_seconds_total:sum_irate{namespace="shop", container="api"}[30m])"#
        );
    }

    #[test]
    fn test_memory_percentile_query_scales_to_gib() {
        let window: TimeWindow = "1d".parse().unwrap();
        let query = percentile_query("shop", "api", MetricKind::MemoryBytes, AVERAGE_PERCENTILE, &window);
        assert_eq!(
            query,
            r#"quantile_over_time(0.5, container_memory_usage_bytes{namespace="shop", container="api"}[1d]) / (1024 * 1024 * 1024)"#
        );
    }

    #[test]
    fn test_average_and_tail_queries_differ() {
        let window = TimeWindow::default();
        let avg = percentile_query("ns", "c", MetricKind::CpuRate, AVERAGE_PERCENTILE, &window);
        let tail = percentile_query("ns", "c", MetricKind::CpuRate, 0.95, &window);
        assert!(avg.starts_with("quantile_over_time(0.5,"));
        assert!(tail.starts_with("quantile_over_time(0.95,"));
    }

    #[test]
    fn test_label_values_are_escaped() {
        let window = TimeWindow::default();
        let query = percentile_query(r#"a"b"#, r"c\d", MetricKind::CpuRate, 0.9, &window);
        assert!(query.contains(r#"namespace="a\"b""#));
        assert!(query.contains(r#"container="c\\d""#));
    }

    #[test]
    fn test_namespace_cpu_usage_query() {
        assert_eq!(
            namespace_cpu_usage_query("prod"),
            r#"sum(rate(container_cpu_usage_seconds_total{namespace="prod"}[5m]))"#
        );
    }

    #[test]
    fn test_time_window_parsing() {
        assert_eq!("30m".parse::<TimeWindow>().unwrap().as_duration(), Duration::from_secs(1800));
        assert_eq!("1d".parse::<TimeWindow>().unwrap().as_duration(), Duration::from_secs(86_400));
        assert_eq!("1h30m".parse::<TimeWindow>().unwrap().as_duration(), Duration::from_secs(5400));
        assert_eq!("2w".parse::<TimeWindow>().unwrap().as_duration(), Duration::from_secs(1_209_600));
        assert_eq!(" 45s ".parse::<TimeWindow>().unwrap().as_duration(), Duration::from_secs(45));

        for bad in ["", "0m", "m", "10", "10x", "1.5h", "-1h", "1h-"] {
            assert!(bad.parse::<TimeWindow>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_time_window_display() {
        for (input, expected) in [("30m", "30m"), ("90m", "1h30m"), ("1d", "1d"), ("2w", "14d"), ("3600s", "1h")] {
            assert_eq!(input.parse::<TimeWindow>().unwrap().to_string(), expected);
        }
    }
}
