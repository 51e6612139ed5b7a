use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::time::Duration;

use crate::metrics::client::DEFAULT_QUERY_TIMEOUT;
use crate::quantity::{parse_cpu, parse_memory, Quantity};
use crate::types::{Config, LimitRangeBounds, NamespacePolicyDefaults, QuotaBounds, ResourcePair};

pub const DEFAULT_PROMETHEUS_URL: &str = "http://localhost:9090";

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let prometheus_url = env
        .get_var("PROMETHEUS_URL")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_PROMETHEUS_URL.to_string());

    let query_timeout = match env.get_var("PROMETHEUS_TIMEOUT_SECONDS") {
        Some(v) => {
            let secs: u64 = v.trim().parse().context("Invalid PROMETHEUS_TIMEOUT_SECONDS")?;
            if secs == 0 {
                return Err(anyhow!("PROMETHEUS_TIMEOUT_SECONDS must be greater than zero"));
            }
            Duration::from_secs(secs)
        }
        None => DEFAULT_QUERY_TIMEOUT,
    };

    let quota_defaults = QuotaBounds::default();
    let quota = QuotaBounds {
        cpu: cpu_var(env, "QUOTA_CPU", quota_defaults.cpu)?,
        memory: memory_var(env, "QUOTA_MEMORY", quota_defaults.memory)?,
        pods: count_var(env, "QUOTA_PODS", quota_defaults.pods)?,
        configmaps: count_var(env, "QUOTA_CONFIGMAPS", quota_defaults.configmaps)?,
        secrets: count_var(env, "QUOTA_SECRETS", quota_defaults.secrets)?,
    };

    let range_defaults = LimitRangeBounds::default();
    let limit_range = LimitRangeBounds {
        min: pair_var(env, "LIMIT_RANGE_MIN", range_defaults.min)?,
        max: pair_var(env, "LIMIT_RANGE_MAX", range_defaults.max)?,
        default: pair_var(env, "LIMIT_RANGE_DEFAULT", range_defaults.default)?,
        default_request: pair_var(env, "LIMIT_RANGE_DEFAULT_REQUEST", range_defaults.default_request)?,
    };

    Ok(Config {
        prometheus_url,
        query_timeout,
        policy: NamespacePolicyDefaults {
            quota,
            limit_range,
            ..NamespacePolicyDefaults::default()
        },
    })
}

/// Validates the CPU percentile and resolves the memory percentile, which
/// falls back to the CPU one when unset.
pub fn resolve_percentiles(cpu: f64, memory: Option<f64>) -> Result<(f64, f64)> {
    let cpu = check_percentile("cpu-percentile", cpu)?;
    let memory = match memory {
        Some(p) => check_percentile("memory-percentile", p)?,
        None => cpu,
    };
    Ok((cpu, memory))
}

fn check_percentile(name: &str, value: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&value) {
        return Err(anyhow!("{} must be between 0 and 1, got {}", name, value));
    }
    Ok(value)
}

fn cpu_var<E: EnvironmentProvider>(env: &E, key: &str, default: Quantity) -> Result<Quantity> {
    match env.get_var(key) {
        Some(v) => parse_cpu(&v)
            .and_then(Quantity::exact_cpu)
            .with_context(|| format!("Invalid {}", key)),
        None => Ok(default),
    }
}

fn memory_var<E: EnvironmentProvider>(env: &E, key: &str, default: Quantity) -> Result<Quantity> {
    match env.get_var(key) {
        Some(v) => parse_memory(&v)
            .and_then(Quantity::exact_memory)
            .with_context(|| format!("Invalid {}", key)),
        None => Ok(default),
    }
}

fn count_var<E: EnvironmentProvider>(env: &E, key: &str, default: u32) -> Result<u32> {
    match env.get_var(key) {
        Some(v) => v.trim().parse().with_context(|| format!("Invalid {}", key)),
        None => Ok(default),
    }
}

fn pair_var<E: EnvironmentProvider>(env: &E, prefix: &str, default: ResourcePair) -> Result<ResourcePair> {
    Ok(ResourcePair {
        cpu: cpu_var(env, &format!("{}_CPU", prefix), default.cpu)?,
        memory: memory_var(env, &format!("{}_MEMORY", prefix), default.memory)?,
    })
}
