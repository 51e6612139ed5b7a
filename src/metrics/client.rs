use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::error::MetricsError;

pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can evaluate an instant query to a single scalar.
pub trait MetricsBackend {
    fn execute(&self, query: &str) -> impl Future<Output = Result<f64, MetricsError>> + Send;
}

/// Prometheus HTTP API client for instant queries.
pub struct PrometheusClient {
    http: Client,
    query_url: Url,
}

impl PrometheusClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url).with_context(|| format!("Invalid Prometheus URL {}", base_url))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(anyhow!("Prometheus URL must start with http:// or https://"));
        }
        let query_url = Url::parse(&format!("{}/api/v1/query", base.as_str().trim_end_matches('/')))
            .context("Invalid Prometheus query URL")?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { http, query_url })
    }

    pub fn query_url(&self) -> &Url {
        &self.query_url
    }
}

impl MetricsBackend for PrometheusClient {
    async fn execute(&self, query: &str) -> Result<f64, MetricsError> {
        debug!(url = %self.query_url, query, "querying prometheus");
        let response = self
            .http
            .get(self.query_url.clone())
            .query(&[("query", query)])
            .send()
            .await
            .map_err(MetricsError::BackendUnavailable)?;

        let status = response.status();
        debug!(%status, "prometheus response status");
        let body = response
            .text()
            .await
            .map_err(MetricsError::BackendUnavailable)?;
        debug!(body = %body, "raw prometheus response");

        decode_response(status.as_u16(), &body)
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    data: Option<QueryData>,
    #[serde(rename = "errorType")]
    error_type: Option<String>,
    error: Option<String>,
    #[serde(default)]
    warnings: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
enum QueryData {
    Vector(Vec<InstantSeries>),
    Matrix(Vec<RangeSeries>),
    Scalar(SamplePair),
    #[serde(rename = "string")]
    Text(SamplePair),
}

#[derive(Debug, Deserialize)]
struct InstantSeries {
    value: SamplePair,
}

#[derive(Debug, Deserialize)]
struct RangeSeries {
    values: Vec<SamplePair>,
}

#[derive(Debug, Deserialize)]
struct SamplePair(f64, SampleValue);

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SampleValue {
    Text(String),
    Number(f64),
}

impl SamplePair {
    fn to_f64(&self) -> Result<f64, MetricsError> {
        let value = match &self.1 {
            SampleValue::Text(s) => s
                .parse::<f64>()
                .map_err(|_| MetricsError::MalformedResponse(format!("non-numeric sample value {:?}", s)))?,
            SampleValue::Number(n) => *n,
        };
        if !value.is_finite() {
            return Err(MetricsError::MalformedResponse(format!("non-finite sample value {}", value)));
        }
        Ok(value)
    }
}

impl QueryData {
    fn first_value(&self) -> Result<f64, MetricsError> {
        let pair = match self {
            Self::Vector(series) => series.first().map(|s| &s.value),
            Self::Matrix(series) => series.first().and_then(|s| s.values.last()),
            Self::Scalar(pair) | Self::Text(pair) => Some(pair),
        };
        pair.ok_or(MetricsError::NoData)?.to_f64()
    }
}

/// Turns an HTTP status and body from `/api/v1/query` into one scalar.
pub(crate) fn decode_response(status: u16, body: &str) -> Result<f64, MetricsError> {
    let parsed = serde_json::from_str::<ApiResponse>(body);

    if !(200..300).contains(&status) {
        let message = parsed
            .ok()
            .and_then(|r| r.error)
            .unwrap_or_else(|| body.trim().to_string());
        return Err(MetricsError::BackendError { status, message });
    }

    let response = parsed.map_err(|e| MetricsError::MalformedResponse(e.to_string()))?;
    if !response.warnings.is_empty() {
        warn!(warnings = ?response.warnings, "prometheus returned warnings");
    }

    if response.status != "success" {
        let message = match (response.error_type, response.error) {
            (Some(kind), Some(msg)) => format!("{}: {}", kind, msg),
            (None, Some(msg)) => msg,
            (Some(kind), None) => kind,
            (None, None) => format!("status {}", response.status),
        };
        return Err(MetricsError::BackendError { status, message });
    }

    response
        .data
        .ok_or_else(|| MetricsError::MalformedResponse("missing data".to_string()))?
        .first_value()
}
