// Source-level and HTTP-boundary errors

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::path::PathBuf;

/// A kernel-exposed file or external command could not be used for this poll.
#[derive(Debug, thiserror::Error)]
pub enum SourceUnavailable {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
    #[error("command {program} unavailable: {reason}")]
    Command { program: String, reason: String },
}

impl SourceUnavailable {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SourceUnavailable::Io {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SourceUnavailable::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Fallback selection for best-effort sources: a failed read becomes `T::default()`.
pub fn degrade<T: Default>(result: Result<T, SourceUnavailable>, what: &'static str) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(source = what, error = %e, "source unavailable, using default");
            T::default()
        }
    }
}

/// Errors that cross into the HTTP layer. Rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(anyhow::anyhow!("telemetry task join: {}", e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(e) => {
                tracing::warn!(error = %e, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
