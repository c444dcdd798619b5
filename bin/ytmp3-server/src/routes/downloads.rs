//! MP3 download endpoints: create, retrieve, delete, and list stored files.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderValue;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio_util::io::ReaderStream;
use tracing::info;
use url::Url;
use utoipa::OpenApi;
use ytmp3_core::DownloadJob;

use crate::error::ServerError;
use crate::schemas::download::{
    DownloadRequest, DownloadResponse, ErrorResponse, ListDownloadsResponse, MessageResponse,
    StoredFileResponse,
};
use crate::state::AppState;

/// Hosts (and their subdomains) accepted by `POST /download-mp3`.
const ALLOWED_HOSTS: &[&str] = &["youtube.com", "youtu.be"];

#[derive(OpenApi)]
#[openapi(
    paths(download_mp3, get_file, delete_file, list_downloads),
    components(schemas(
        DownloadRequest,
        DownloadResponse,
        StoredFileResponse,
        ListDownloadsResponse,
        MessageResponse,
        ErrorResponse,
    ))
)]
pub struct DownloadsApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/download-mp3", post(download_mp3))
        .route("/download/{filename}", get(get_file).delete(delete_file))
        .route("/downloads", get(list_downloads))
}

/// Accept only well-formed http(s) URLs on a YouTube host.
fn validate_youtube_url(raw: &str) -> Result<Url, ServerError> {
    let invalid = || ServerError::BadRequest("Invalid YouTube URL".into());

    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid());
    }
    let host = url.host_str().ok_or_else(invalid)?.to_ascii_lowercase();
    let allowed = ALLOWED_HOSTS
        .iter()
        .any(|d| host == *d || host.ends_with(&format!(".{d}")));
    if allowed { Ok(url) } else { Err(invalid()) }
}

/// Download a YouTube video as an MP3 file (`POST /download-mp3`).
///
/// The blocking resolve → fetch → transcode pipeline runs on the worker
/// pool; the response is sent once the MP3 is on disk.
#[utoipa::path(
    post,
    path = "/download-mp3",
    tag = "downloads",
    request_body = DownloadRequest,
    responses(
        (status = 200, description = "MP3 ready", body = DownloadResponse),
        (status = 400, description = "Invalid YouTube URL", body = ErrorResponse),
        (status = 500, description = "Download failed", body = ErrorResponse),
        (status = 503, description = "Worker pool saturated", body = ErrorResponse),
    )
)]
pub async fn download_mp3(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DownloadRequest>, JsonRejection>,
) -> Result<Json<DownloadResponse>, ServerError> {
    let Json(req) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let url = validate_youtube_url(&req.url)?;

    let job = DownloadJob::new(url.as_str(), req.title);
    info!(download_id = %job.id, url = %job.url, "download requested");

    let pipeline = state.pipeline.clone();
    let outcome = state
        .pool
        .submit(move || pipeline.run(&job))
        .await
        .map_err(ServerError::from_pipeline)?;

    Ok(Json(DownloadResponse {
        message: "Download completed successfully".into(),
        filename: outcome.filename,
        download_id: outcome.download_id,
    }))
}

/// Stream a stored MP3 as an attachment (`GET /download/{filename}`).
#[utoipa::path(
    get,
    path = "/download/{filename}",
    tag = "downloads",
    params(("filename" = String, Path, description = "Stored MP3 file name")),
    responses(
        (status = 200, description = "MP3 bytes", content_type = "audio/mpeg"),
        (status = 404, description = "File not found", body = ErrorResponse),
    )
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Response, ServerError> {
    let (file, len) = state
        .store
        .open(&filename)
        .await
        .map_err(|e| ServerError::from_storage("Failed to read file", e))?;

    let disposition = HeaderValue::from_bytes(format!("attachment; filename=\"{filename}\"").as_bytes())
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    Ok((
        [
            (CONTENT_TYPE, HeaderValue::from_static("audio/mpeg")),
            (CONTENT_LENGTH, HeaderValue::from(len)),
            (CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response())
}

/// Delete a stored MP3 (`DELETE /download/{filename}`).
#[utoipa::path(
    delete,
    path = "/download/{filename}",
    tag = "downloads",
    params(("filename" = String, Path, description = "Stored MP3 file name")),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Delete failed", body = ErrorResponse),
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
) -> Result<Json<MessageResponse>, ServerError> {
    state
        .store
        .delete(&filename)
        .await
        .map_err(|e| ServerError::from_storage("Failed to delete file", e))?;

    Ok(Json(MessageResponse {
        message: format!("File {filename} deleted successfully"),
    }))
}

/// List stored MP3 files (`GET /downloads`).
#[utoipa::path(
    get,
    path = "/downloads",
    tag = "downloads",
    responses(
        (status = 200, description = "Stored files", body = ListDownloadsResponse),
        (status = 500, description = "Enumeration failed", body = ErrorResponse),
    )
)]
pub async fn list_downloads(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListDownloadsResponse>, ServerError> {
    let files: Vec<StoredFileResponse> = state
        .store
        .list()
        .await
        .map_err(|e| ServerError::from_storage("Failed to list files", e))?
        .into_iter()
        .map(|f| StoredFileResponse {
            size_mb: f.size_mb(),
            created: f.created.timestamp_micros() as f64 / 1_000_000.0,
            filename: f.name,
        })
        .collect();

    Ok(Json(ListDownloadsResponse {
        total: files.len(),
        files,
    }))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::routes::test_support::{
        CannedResolver, FailingResolver, send, test_app, test_app_with,
    };
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn mp3_files(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn is_stored_name(name: &str, title: &str) -> bool {
        let Some((id, rest)) = name.split_once('_') else {
            return false;
        };
        id.len() == 8
            && id.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
            && rest == format!("{title}.mp3")
    }

    #[test]
    fn accepts_youtube_hosts() {
        for url in [
            "https://www.youtube.com/watch?v=abc123",
            "https://youtube.com/watch?v=abc123",
            "https://m.youtube.com/watch?v=abc123",
            "https://music.youtube.com/watch?v=abc123",
            "http://youtu.be/abc123",
            "  https://YOUTU.BE/abc123  ",
        ] {
            assert!(validate_youtube_url(url).is_ok(), "{url} should be accepted");
        }
    }

    #[test]
    fn rejects_other_urls() {
        for url in [
            "",
            "not a url",
            "youtube.com/watch?v=abc123",
            "ftp://youtube.com/abc123",
            "https://vimeo.com/123",
            "https://notyoutube.com/watch?v=abc123",
            "https://youtube.com.evil.example/watch?v=abc123",
            "file:///etc/passwd",
        ] {
            assert!(validate_youtube_url(url).is_err(), "{url} should be rejected");
        }
    }

    #[tokio::test]
    async fn download_returns_stored_filename() {
        let (dir, app) = test_app();
        let (status, body) = send(
            app,
            Method::POST,
            "/download-mp3",
            Some(json!({ "url": "https://www.youtube.com/watch?v=abc123" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let filename = body["filename"].as_str().unwrap();
        assert!(is_stored_name(filename, "Test Song"), "unexpected filename {filename}");
        assert_eq!(body["download_id"].as_str().unwrap(), &filename[..8]);
        assert_eq!(body["message"], "Download completed successfully");

        assert_eq!(mp3_files(dir.path()), vec![filename.to_owned()]);
        assert!(std::fs::metadata(dir.path().join(filename)).unwrap().len() > 0);
    }

    #[tokio::test]
    async fn title_override_is_sanitized_into_filename() {
        let (_dir, app) = test_app();
        let (status, body) = send(
            app,
            Method::POST,
            "/download-mp3",
            Some(json!({ "url": "https://youtu.be/abc123", "title": "Mix: Vol/1" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(is_stored_name(body["filename"].as_str().unwrap(), "Mix Vol1"));
    }

    #[tokio::test]
    async fn non_youtube_url_is_400_and_writes_nothing() {
        let (dir, app) = test_app();
        for url in ["https://vimeo.com/123", "https://example.com/youtube.com", "garbage"] {
            let (status, body) = send(
                app.clone(),
                Method::POST,
                "/download-mp3",
                Some(json!({ "url": url })),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{url}");
            assert_eq!(body["detail"], "Invalid YouTube URL");
        }
        assert!(mp3_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_400() {
        let (_dir, app) = test_app();
        let (status, body) =
            send(app, Method::POST, "/download-mp3", Some(json!({ "link": "x" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn pipeline_failure_is_500_with_detail() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app_with(dir.path(), Arc::new(FailingResolver));
        let (status, body) = send(
            app,
            Method::POST,
            "/download-mp3",
            Some(json!({ "url": "https://www.youtube.com/watch?v=gone" })),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["detail"],
            "Download failed: This video is not available for download (private, deleted, or geo-restricted)."
        );
        assert!(mp3_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn retrieve_streams_attachment() {
        let (dir, app) = test_app();
        std::fs::write(dir.path().join("deadbeef_Song.mp3"), b"ID3-fake").unwrap();

        let response = app
            .oneshot(
                axum::http::Request::get("/download/deadbeef_Song.mp3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "audio/mpeg");
        assert_eq!(
            response.headers()[CONTENT_DISPOSITION],
            "attachment; filename=\"deadbeef_Song.mp3\""
        );
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"ID3-fake");
    }

    #[tokio::test]
    async fn retrieve_handles_spaces_in_names() {
        let (dir, app) = test_app();
        std::fs::write(dir.path().join("deadbeef_Test Song.mp3"), b"x").unwrap();
        let (status, _) = send(app, Method::GET, "/download/deadbeef_Test%20Song.mp3", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn retrieve_missing_or_traversal_is_404() {
        let (_dir, app) = test_app();
        for uri in ["/download/nope.mp3", "/download/..%2FCargo.toml", "/download/.."] {
            let (status, body) = send(app.clone(), Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
            assert_eq!(body["detail"], "File not found");
        }
    }

    #[tokio::test]
    async fn delete_removes_file_then_404s() {
        let (dir, app) = test_app();
        std::fs::write(dir.path().join("deadbeef_Song.mp3"), b"x").unwrap();

        let (status, body) =
            send(app.clone(), Method::DELETE, "/download/deadbeef_Song.mp3", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "File deadbeef_Song.mp3 deleted successfully");
        assert!(mp3_files(dir.path()).is_empty());

        let (status, _) = send(app.clone(), Method::GET, "/download/deadbeef_Song.mp3", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_missing_is_404_not_500() {
        let (_dir, app) = test_app();
        let (status, body) = send(app, Method::DELETE, "/download/ghost.mp3", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "File not found");
    }

    #[tokio::test]
    async fn list_reflects_mp3_files() {
        let (dir, app) = test_app();
        std::fs::write(dir.path().join("aaaaaaaa_One.mp3"), vec![0u8; 3 * 1024 * 1024 / 2]).unwrap();
        std::fs::write(dir.path().join("bbbbbbbb_Two.mp3"), vec![0u8; 10]).unwrap();
        std::fs::write(dir.path().join("cccccccc_temp"), vec![0u8; 10]).unwrap();

        let (status, body) = send(app, Method::GET, "/downloads", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);

        let files = body["files"].as_array().unwrap();
        let names: Vec<&str> = files.iter().map(|f| f["filename"].as_str().unwrap()).collect();
        assert_eq!(names, ["aaaaaaaa_One.mp3", "bbbbbbbb_Two.mp3"]);
        assert_eq!(files[0]["size_mb"], 1.5);
        assert_eq!(files[1]["size_mb"], 0.0);
        assert!(files[0]["created"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn list_missing_directory_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app_with(
            &dir.path().join("missing"),
            Arc::new(CannedResolver),
        );
        let (status, body) = send(app, Method::GET, "/downloads", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["detail"].as_str().unwrap().starts_with("Failed to list files"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_downloads_produce_distinct_files() {
        let (dir, app) = test_app();
        let request = || {
            send(
                app.clone(),
                Method::POST,
                "/download-mp3",
                Some(json!({ "url": "https://www.youtube.com/watch?v=abc123" })),
            )
        };

        let ((s1, b1), (s2, b2)) = tokio::join!(request(), request());
        assert_eq!((s1, s2), (StatusCode::OK, StatusCode::OK));

        let f1 = b1["filename"].as_str().unwrap().to_owned();
        let f2 = b2["filename"].as_str().unwrap().to_owned();
        assert_ne!(f1, f2);

        let mut expected = vec![f1, f2];
        expected.sort();
        assert_eq!(mp3_files(dir.path()), expected);
    }

    #[tokio::test]
    async fn download_then_list_then_delete_round_trip() {
        let (_dir, app) = test_app();
        let (_, created) = send(
            app.clone(),
            Method::POST,
            "/download-mp3",
            Some(json!({ "url": "https://youtu.be/abc123" })),
        )
        .await;
        let filename = created["filename"].as_str().unwrap().to_owned();

        let (_, listed) = send(app.clone(), Method::GET, "/downloads", None).await;
        assert_eq!(listed["files"][0]["filename"], Value::from(filename.as_str()));

        let uri = format!("/download/{}", filename.replace(' ', "%20"));
        let (status, _) = send(app.clone(), Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);

        let (_, listed) = send(app, Method::GET, "/downloads", None).await;
        assert_eq!(listed["total"], 0);
    }
}
