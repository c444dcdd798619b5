use std::path::PathBuf;

/// All errors that can occur while producing or managing an MP3 download.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The platform refused the page (HTTP 400/403, sign-in walls, age gates).
    #[error("YouTube video unavailable or restricted. Try a different video.")]
    UpstreamRestricted,

    /// The video is private, deleted, or blocked in this region.
    #[error("This video is not available for download (private, deleted, or geo-restricted).")]
    UpstreamUnavailable,

    /// The extractor could not parse the platform's page.
    #[error("YouTube has changed their format. The stream extractor may need an update. ({0})")]
    ExtractionBroken(String),

    /// No candidate survived the stream fallback chain.
    #[error("No suitable audio or video stream found")]
    NoStreamFound,

    /// The selected stream could not be fetched.
    #[error("stream download failed: {0}")]
    Fetch(String),

    /// A required external tool is not installed.
    #[error("{tool} not found; install it or set its path in the environment")]
    ToolNotFound { tool: &'static str },

    /// Decoding or encoding the audio failed.
    #[error("transcode failed: {0}")]
    Transcode(String),

    /// The worker pool's wait queue is full.
    #[error("server busy: {queued} downloads already waiting")]
    Busy { queued: usize },

    /// A worker thread panicked or was cancelled.
    #[error("worker failed: {0}")]
    Worker(String),

    /// A stored file does not exist (or the name is not a plain file name).
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Stable, loggable category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    UpstreamRestricted,
    UpstreamUnavailable,
    ExtractionBroken,
    NoStreamFound,
    Fetch,
    ToolNotFound,
    Transcode,
    Busy,
    Worker,
    NotFound,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UpstreamRestricted => ErrorKind::UpstreamRestricted,
            Error::UpstreamUnavailable => ErrorKind::UpstreamUnavailable,
            Error::ExtractionBroken(_) | Error::Json(_) => ErrorKind::ExtractionBroken,
            Error::NoStreamFound => ErrorKind::NoStreamFound,
            Error::Fetch(_) | Error::Http(_) => ErrorKind::Fetch,
            Error::ToolNotFound { .. } => ErrorKind::ToolNotFound,
            Error::Transcode(_) => ErrorKind::Transcode,
            Error::Busy { .. } => ErrorKind::Busy,
            Error::Worker(_) => ErrorKind::Worker,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
