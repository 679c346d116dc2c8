use axum::http::StatusCode;
use axum::response::IntoResponse;
use thiserror::Error;

/// Classified failure of one ticker's update step.
///
/// Everything except `ConfigurationMissing` is recoverable: the ticker is
/// skipped for the current cycle and the next scheduled cycle retries it.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UpdateError {
    #[error("rate limited by news provider")]
    RateLimited,
    #[error("news provider unavailable: {0}")]
    Unavailable(String),
    #[error("sentiment inference failed: {0}")]
    InferenceFailure(String),
    #[error("persistence failed: {0}")]
    PersistenceFailure(String),
    #[error("configuration missing: {0}")]
    ConfigurationMissing(String),
}

impl UpdateError {
    /// Short, stable label used in logs and cycle reports.
    pub fn classification(&self) -> &'static str {
        match self {
            UpdateError::RateLimited => "rate_limited",
            UpdateError::Unavailable(_) => "unavailable",
            UpdateError::InferenceFailure(_) => "inference_failure",
            UpdateError::PersistenceFailure(_) => "persistence_failure",
            UpdateError::ConfigurationMissing(_) => "configuration_missing",
        }
    }
}

/// Errors raised by a news provider.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NewsError {
    #[error("rate limited")]
    RateLimited,
    /// The provider's daily quota is spent; nothing more goes out until UTC midnight.
    #[error("daily request quota exhausted")]
    QuotaExhausted,
    #[error("network error: {0}")]
    Network(String),
    #[error("bad response: {0}")]
    BadResponse(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("request timed out")]
    Timeout,
}

impl From<NewsError> for UpdateError {
    fn from(value: NewsError) -> Self {
        match value {
            NewsError::RateLimited | NewsError::QuotaExhausted => UpdateError::RateLimited,
            other => UpdateError::Unavailable(other.to_string()),
        }
    }
}

/// Errors raised by a sentiment model backend.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("network error: {0}")]
    Network(String),
    #[error("model host returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("invalid model output: {0}")]
    InvalidOutput(String),
    #[error("failed to load model: {0}")]
    Load(String),
    #[error("inference timed out")]
    Timeout,
}

impl From<ModelError> for UpdateError {
    fn from(value: ModelError) -> Self {
        UpdateError::InferenceFailure(value.to_string())
    }
}

/// Errors raised by the persistent store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("store operation timed out")]
    Timeout,
}

impl From<StoreError> for UpdateError {
    fn from(value: StoreError) -> Self {
        UpdateError::PersistenceFailure(value.to_string())
    }
}

/// Errors returned by the read-only dashboard API.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(StoreError),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Not found")]
    NotFound,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AppError::Store(e) => {
                tracing::error!("Store error while serving dashboard request: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(value: StoreError) -> Self {
        AppError::Store(value)
    }
}
