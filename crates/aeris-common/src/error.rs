//! Error taxonomy shared by every AERIS crate.

use thiserror::Error;

/// Result type alias using [`AerisError`].
pub type AerisResult<T> = Result<T, AerisError>;

/// Primary error type for AERIS operations.
///
/// Variants are grouped by the failure taxonomy each task-runner uses to
/// decide whether to retry, skip, or abort (see the error handling design
/// in the specification).
#[derive(Debug, Error)]
pub enum AerisError {
    // === Transient upstream failures (retryable) ===
    #[error("upstream request failed: {0}")]
    UpstreamTransient(String),

    #[error("upstream rate limited, retry after backoff: {0}")]
    RateLimited(String),

    // === Authoritative rejection (not retryable) ===
    #[error("upstream rejected request: {0}")]
    UpstreamRejected(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    // === No data (benign, non-error outcome upstream) ===
    #[error("no data available: {0}")]
    NoData(String),

    // === Schema / data anomalies ===
    #[error("malformed raster data: {0}")]
    SchemaAnomaly(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    // === Missing prerequisite (a task depends on state that isn't ready) ===
    #[error("missing prerequisite: {0}")]
    MissingPrerequisite(String),

    // === Persistence ===
    #[error("persistence conflict: {0}")]
    PersistenceConflict(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("cache error: {0}")]
    Cache(String),

    // === Configuration / fatal ===
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("fatal: {0}")]
    Fatal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AerisError {
    /// Whether a caller should retry the operation that produced this error.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            AerisError::UpstreamTransient(_) | AerisError::RateLimited(_)
        )
    }

    /// Coarse HTTP-style status code, useful for the worker's status surface
    /// and for webhook error reporting.
    pub fn status_code(&self) -> u16 {
        match self {
            AerisError::UpstreamTransient(_) | AerisError::RateLimited(_) => 503,
            AerisError::UpstreamRejected(_) | AerisError::AuthFailed(_) => 401,
            AerisError::NoData(_) => 404,
            AerisError::SchemaAnomaly(_) | AerisError::InvalidGeometry(_) => 422,
            AerisError::MissingPrerequisite(_) => 409,
            AerisError::PersistenceConflict(_) => 409,
            AerisError::Database(_) | AerisError::Cache(_) => 500,
            AerisError::InvalidConfig(_) | AerisError::Fatal(_) => 500,
            AerisError::Other(_) => 500,
        }
    }
}

impl From<std::io::Error> for AerisError {
    fn from(err: std::io::Error) -> Self {
        AerisError::Fatal(err.to_string())
    }
}

impl From<serde_json::Error> for AerisError {
    fn from(err: serde_json::Error) -> Self {
        AerisError::SchemaAnomaly(format!("JSON error: {}", err))
    }
}

/// The outcome of a scheduled task, returned instead of propagating errors
/// past the task boundary (ingestion, UPES compute, route scoring, alerts
/// all report through this type so one model/gas/route failing does not
/// abort the rest of the cycle).
#[derive(Debug, Clone)]
pub enum TaskOutcome {
    Ok(String),
    Skipped(String),
    Failed(String),
}

impl TaskOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, TaskOutcome::Ok(_))
    }
}
