//! Service banner and health / heartbeat endpoints.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use utoipa::OpenApi;

use crate::schemas::download::{BannerResponse, HealthResponse};
use crate::state::AppState;

pub const SERVICE_NAME: &str = "YouTube Download API";

#[derive(OpenApi)]
#[openapi(
    paths(get_root, get_health),
    components(schemas(BannerResponse, HealthResponse))
)]
pub struct HealthApi;

/// Register banner and health-check routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(get_root))
        .route("/health", get(get_health))
}

/// Service banner listing the available endpoints.
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Service banner", body = BannerResponse)
    )
)]
pub async fn get_root() -> Json<BannerResponse> {
    Json(BannerResponse {
        message: SERVICE_NAME.to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        endpoints: [
            "/download-mp3 - POST: Download YouTube video as MP3",
            "/download/{filename} - GET: Retrieve a downloaded MP3",
            "/download/{filename} - DELETE: Delete a downloaded MP3",
            "/downloads - GET: List downloaded MP3 files",
            "/health - GET: Health check",
        ]
        .map(str::to_owned)
        .to_vec(),
    })
}

/// Heartbeat endpoint.
///
/// Load-balancers and monitoring systems should poll this endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse)
    )
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_owned(),
        service: SERVICE_NAME.to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        workers: state.pool.config().workers,
        queued: state.pool.queued(),
    })
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn banner_lists_download_endpoint() {
        let Json(body) = get_root().await;
        assert_eq!(body.message, SERVICE_NAME);
        assert!(body.endpoints.iter().any(|e| e.starts_with("/download-mp3")));
    }

    #[tokio::test]
    async fn health_response_is_healthy() {
        let dir = tempfile::tempdir().unwrap();
        let state = crate::routes::test_support::test_state(dir.path());
        let Json(body) = get_health(State(Arc::new(state))).await;
        assert_eq!(body.status, "healthy");
        assert!(!body.version.is_empty());
        assert_eq!(body.queued, 0);
    }
}
