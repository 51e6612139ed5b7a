// Public modules
pub mod types;
pub mod error;
pub mod config;
pub mod quantity;
pub mod kubernetes;
pub mod metrics;
pub mod policy;
pub mod collector;
pub mod report;

// Re-export commonly used items
pub use types::*;
pub use error::{InvalidWindow, MetricsError, ObjectSourceError, QuantityError};
pub use config::{load_config, load_config_with_env, resolve_percentiles, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use quantity::{format_cpu, format_memory, parse_cpu, parse_memory, Quantity};
pub use kubernetes::{KubeWorkloadSource, WorkloadSource};
pub use metrics::*;
pub use policy::{recommend, recommend_limit_range, recommend_namespace_quota};
pub use collector::UsageCollector;
pub use report::{ContainerReport, NamespaceReport, ReportBuilder, ReportSummary, WorkloadReport};
pub use report::render::render_text;
