//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are converted to a JSON body
//! `{"detail": "..."}` with an appropriate status code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// All errors that can occur in the ytmp3-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The caller referenced a file that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The download pipeline failed.
    #[error("download failed: {0}")]
    Download(ytmp3_core::Error),

    /// The worker pool cannot accept more jobs.
    #[error("busy: {0}")]
    Busy(String),

    /// A filesystem operation on the store failed.
    #[error("storage error: {context}: {source}")]
    Storage {
        context: &'static str,
        source: ytmp3_core::Error,
    },
}

impl ServerError {
    /// Map a pipeline error; saturation is reported separately from failure.
    pub fn from_pipeline(e: ytmp3_core::Error) -> Self {
        match e {
            ytmp3_core::Error::Busy { .. } => ServerError::Busy(e.to_string()),
            other => ServerError::Download(other),
        }
    }

    /// Map a store error; missing files become 404.
    pub fn from_storage(context: &'static str, e: ytmp3_core::Error) -> Self {
        match e {
            ytmp3_core::Error::NotFound(_) => ServerError::NotFound("File not found".into()),
            source => ServerError::Storage { context, source },
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ServerError::Busy(m) => {
                warn!(message = %m, "rejecting download, worker pool saturated");
                (StatusCode::SERVICE_UNAVAILABLE, m.clone())
            }
            ServerError::Download(e) => {
                error!(error = %e, kind = %e.kind(), "download pipeline failed");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Download failed: {e}"))
            }
            ServerError::Storage { context, source } => {
                error!(error = %source, kind = %source.kind(), "{context}");
                (StatusCode::INTERNAL_SERVER_ERROR, format!("{context}: {source}"))
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
