//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection)
//! - Optional OpenAPI document (disable with `YTMP3_ENABLE_DOCS=false`)
//! - Banner and health routes
//! - MP3 download, retrieval, deletion and listing routes

pub mod doc;
mod downloads;
mod health;

use axum::routing::get;
use axum::{Json, Router, middleware};
use std::sync::Arc;
use tower::ServiceBuilder;

use crate::middleware::{cors, trace};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .merge(downloads::router());

    if state.config.enable_docs {
        let api_doc = doc::get_docs();
        app = app.route(
            "/api-docs/openapi.json",
            get(move || async move { Json(api_doc) }),
        );
    }

    app
        // Outermost layers execute first on the way in.
        .layer(ServiceBuilder::new().layer(cors::cors_layer(state.clone())))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            trace::trace_middleware,
        ))
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! In-process router with network-free resolver and transcoder doubles.

    use std::path::Path;
    use std::sync::Arc;

    use axum::Router;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tower::ServiceExt;
    use ytmp3_core::{
        Error, ResolvedVideo, Result, StreamCandidate, StreamResolver, Transcoder,
    };

    use crate::config::Config;
    use crate::state::AppState;

    /// Resolves every URL to a single m4a stream titled "Test Song".
    pub(crate) struct CannedResolver;

    impl StreamResolver for CannedResolver {
        fn resolve(&self, _url: &str) -> Result<ResolvedVideo> {
            Ok(ResolvedVideo {
                title: "Test Song".into(),
                streams: vec![StreamCandidate {
                    id: "140".into(),
                    url: "https://media.invalid/140".into(),
                    container: "m4a".into(),
                    has_audio: true,
                    audio_bitrate_kbps: Some(128.0),
                    ..Default::default()
                }],
            })
        }

        fn download(&self, _candidate: &StreamCandidate, dest: &Path) -> Result<u64> {
            std::fs::write(dest, b"fake-audio-bytes")?;
            Ok(16)
        }
    }

    /// Reports every video as private or deleted.
    pub(crate) struct FailingResolver;

    impl StreamResolver for FailingResolver {
        fn resolve(&self, _url: &str) -> Result<ResolvedVideo> {
            Err(Error::UpstreamUnavailable)
        }

        fn download(&self, _candidate: &StreamCandidate, _dest: &Path) -> Result<u64> {
            Err(Error::UpstreamUnavailable)
        }
    }

    /// Copies the fetched stream verbatim in place of an encoder.
    pub(crate) struct CopyTranscoder;

    impl Transcoder for CopyTranscoder {
        fn transcode(&self, input: &Path, output: &Path, _bitrate_kbps: u32) -> Result<()> {
            std::fs::copy(input, output)?;
            Ok(())
        }
    }

    pub(crate) fn test_state(dir: &Path) -> AppState {
        AppState::new(
            Config::for_tests(dir),
            Arc::new(CannedResolver),
            Arc::new(CopyTranscoder),
        )
    }

    pub(crate) fn test_app_with(dir: &Path, resolver: Arc<dyn StreamResolver>) -> Router {
        let state = AppState::new(Config::for_tests(dir), resolver, Arc::new(CopyTranscoder));
        super::build(Arc::new(state))
    }

    /// Router over a fresh temporary storage directory.
    pub(crate) fn test_app() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let app = super::build(Arc::new(test_state(dir.path())));
        (dir, app)
    }

    /// Send one request and decode the JSON response body (`Null` if empty or not JSON).
    pub(crate) async fn send(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => request
                .header("content-type", "application/json")
                .body(Body::from(json.to_string())),
            None => request.body(Body::empty()),
        }
        .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}
