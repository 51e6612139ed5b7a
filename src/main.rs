use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use kube::Client;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use k8s_capacity::{
    format_cpu, load_config, namespace_cpu_usage_query, render_text, resolve_percentiles, KubeWorkloadSource,
    MetricsBackend, PrometheusClient, ReportBuilder, TimeWindow,
};

/// Kubernetes CLI for resource recommendations and analysis
#[derive(Parser)]
#[command(name = "k8s-capacity", version, about, long_about = None)]
struct Cli {
    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend resource limits and requests for each container and initContainer
    /// in Deployments and StatefulSets in a namespace
    Recommend(RecommendArgs),

    /// Show the current CPU usage of a namespace
    Analyze {
        /// Namespace to analyze
        #[arg(short, long, default_value = "default")]
        namespace: String,
    },
}

#[derive(Args)]
struct RecommendArgs {
    /// The namespace to get Deployments and StatefulSets from
    #[arg(short, long, default_value = "default")]
    namespace: String,

    /// Time window for Prometheus queries (e.g. 30m, 12h, 1d)
    #[arg(short = 't', long = "timewindow", default_value = "1d")]
    time_window: TimeWindow,

    /// Percentile to use for CPU resource limits
    #[arg(long, default_value_t = 0.99)]
    cpu_percentile: f64,

    /// Percentile to use for memory resource limits (defaults to the CPU percentile)
    #[arg(long)]
    memory_percentile: Option<f64>,

    /// Recommend resource quotas for the namespace
    #[arg(long)]
    recommend_quotas: bool,

    /// Recommend limit ranges for the namespace
    #[arg(long)]
    recommend_limit_ranges: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Commands::Recommend(args) => recommend(args).await,
        Commands::Analyze { namespace } => analyze(&namespace).await,
    }
}

async fn recommend(args: RecommendArgs) -> Result<()> {
    let mut cfg = load_config()?;
    let (cpu_percentile, memory_percentile) = resolve_percentiles(args.cpu_percentile, args.memory_percentile)?;
    cfg.policy.cpu_percentile = cpu_percentile;
    cfg.policy.memory_percentile = memory_percentile;
    cfg.policy.window = args.time_window;
    info!(
        prometheus = %cfg.prometheus_url,
        namespace = %args.namespace,
        window = %cfg.policy.window,
        "configuration loaded"
    );

    let backend = PrometheusClient::new(&cfg.prometheus_url, cfg.query_timeout)?;
    let client = Client::try_default().await.context("Failed to create Kubernetes client")?;
    let source = KubeWorkloadSource::new(client);

    let report = ReportBuilder::new(&backend, &cfg.policy)
        .with_quota(args.recommend_quotas)
        .with_limit_range(args.recommend_limit_ranges)
        .build(&source, &args.namespace)
        .await?;

    let summary = report.summary();
    info!(
        "Recommendations built for {} containers in {} workloads",
        summary.container_count, summary.workload_count
    );
    if summary.has_degraded() {
        warn!("{} containers have incomplete metrics", summary.degraded_count);
    }

    match args.output {
        OutputFormat::Text => print!("{}", render_text(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

async fn analyze(namespace: &str) -> Result<()> {
    let cfg = load_config()?;
    let backend = PrometheusClient::new(&cfg.prometheus_url, cfg.query_timeout)?;

    let cores = backend
        .execute(&namespace_cpu_usage_query(namespace))
        .await
        .with_context(|| format!("Error fetching CPU usage for namespace {}", namespace))?;

    println!(
        "Analysis for namespace '{}': CPU usage {:.3} cores ({})",
        namespace,
        cores,
        format_cpu(cores)?
    );
    Ok(())
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
