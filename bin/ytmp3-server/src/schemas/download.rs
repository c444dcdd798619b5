use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DownloadRequest {
    /// YouTube video URL (`youtube.com` or `youtu.be`).
    pub url: String,
    /// Optional title used in the stored filename instead of the video title.
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DownloadResponse {
    pub message: String,
    /// Name to use with `GET /download/{filename}`.
    pub filename: String,
    /// 8-character request identifier, also the filename prefix.
    pub download_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredFileResponse {
    pub filename: String,
    /// Size in MiB, rounded to two decimals.
    pub size_mb: f64,
    /// Creation time as fractional Unix seconds.
    pub created: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListDownloadsResponse {
    pub files: Vec<StoredFileResponse>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BannerResponse {
    pub message: String,
    pub version: String,
    pub endpoints: Vec<String>,
}

/// Liveness payload; `status` is always `"healthy"`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    /// Pipeline jobs allowed to run at once.
    pub workers: usize,
    /// Pipeline jobs currently waiting for a worker.
    pub queued: usize,
}
