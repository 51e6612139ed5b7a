use thiserror::Error;

/// Errors raised while converting between raw magnitudes and quantity strings.
#[derive(Debug, Error)]
pub enum QuantityError {
    #[error("invalid quantity magnitude: {0}")]
    InvalidInput(f64),

    #[error("malformed quantity: {0:?}")]
    MalformedQuantity(String),
}

/// Errors raised by a metrics backend for a single query.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("metrics backend unavailable: {0}")]
    BackendUnavailable(#[source] reqwest::Error),

    #[error("metrics backend returned {status}: {message}")]
    BackendError { status: u16, message: String },

    #[error("malformed metrics response: {0}")]
    MalformedResponse(String),

    #[error("query returned no series")]
    NoData,
}

/// Failure listing workloads from the cluster. Fatal for the whole run.
#[derive(Debug, Error)]
#[error("failed to list {kind} in namespace {namespace}")]
pub struct ObjectSourceError {
    pub kind: &'static str,
    pub namespace: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl ObjectSourceError {
    pub fn new<E>(kind: &'static str, namespace: &str, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            namespace: namespace.to_string(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid time window {0:?}: expected e.g. 30m, 1h30m, 1d")]
pub struct InvalidWindow(pub String);
