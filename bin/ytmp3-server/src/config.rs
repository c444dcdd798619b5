//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;
use std::time::Duration;

use ytmp3_core::{DEFAULT_BITRATE_KBPS, DEFAULT_RESOLVE_TIMEOUT};

/// Runtime configuration for ytmp3-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8000"`).
    pub bind_address: String,

    /// Directory holding finished MP3 files and in-flight temp files.
    pub downloads_dir: PathBuf,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Pipeline jobs running at the same time.
    pub workers: usize,

    /// Pipeline jobs allowed to wait for a worker.
    pub queue_capacity: usize,

    /// MP3 bitrate in kbit/s.
    pub bitrate_kbps: u32,

    /// yt-dlp executable used to resolve video pages.
    pub ytdlp_bin: PathBuf,

    /// ffmpeg executable; `None` lets ffmpeg-sidecar locate it.
    pub ffmpeg_bin: Option<PathBuf>,

    /// Download a static ffmpeg build at startup when none is installed.
    pub ffmpeg_auto_download: bool,

    /// Upper bound for fetching one media stream.
    pub fetch_timeout: Duration,

    /// Upper bound for one yt-dlp metadata run.
    pub resolve_timeout: Duration,

    /// Comma-separated CORS origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Serve the OpenAPI document at `/api-docs/openapi.json`.
    pub enable_docs: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("YTMP3_BIND", "0.0.0.0:8000"),
            downloads_dir: PathBuf::from(env_or("YTMP3_DOWNLOADS_DIR", "downloads")),
            log_level: env_or("YTMP3_LOG", "info"),
            log_json: env_flag("YTMP3_LOG_JSON", false),
            workers: parse_env("YTMP3_WORKERS", 4),
            queue_capacity: parse_env("YTMP3_QUEUE_CAPACITY", 64),
            bitrate_kbps: parse_env("YTMP3_BITRATE_KBPS", DEFAULT_BITRATE_KBPS),
            ytdlp_bin: PathBuf::from(env_or("YTMP3_YTDLP_BIN", "yt-dlp")),
            ffmpeg_bin: std::env::var("YTMP3_FFMPEG_BIN").ok().map(PathBuf::from),
            ffmpeg_auto_download: env_flag("YTMP3_FFMPEG_AUTO_DOWNLOAD", false),
            fetch_timeout: Duration::from_secs(parse_env("YTMP3_FETCH_TIMEOUT_SECS", 600)),
            resolve_timeout: Duration::from_secs(parse_env(
                "YTMP3_RESOLVE_TIMEOUT_SECS",
                DEFAULT_RESOLVE_TIMEOUT.as_secs(),
            )),
            cors_allowed_origins: std::env::var("YTMP3_CORS_ORIGINS").ok(),
            enable_docs: env_flag("YTMP3_ENABLE_DOCS", true),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

#[cfg(test)]
impl Config {
    /// Defaults with storage pointed at `dir`, for handler tests.
    pub fn for_tests(dir: &std::path::Path) -> Self {
        Self {
            bind_address: "127.0.0.1:0".into(),
            downloads_dir: dir.to_path_buf(),
            log_level: "debug".into(),
            log_json: false,
            workers: 2,
            queue_capacity: 8,
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            ytdlp_bin: PathBuf::from("yt-dlp"),
            ffmpeg_bin: None,
            ffmpeg_auto_download: false,
            fetch_timeout: Duration::from_secs(5),
            resolve_timeout: Duration::from_secs(5),
            cors_allowed_origins: None,
            enable_docs: true,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_env_falls_back_on_garbage() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("YTMP3_TEST_WORKERS_GARBAGE", "many") };
        assert_eq!(parse_env("YTMP3_TEST_WORKERS_GARBAGE", 4usize), 4);
        unsafe { std::env::set_var("YTMP3_TEST_WORKERS_GARBAGE", "7") };
        assert_eq!(parse_env("YTMP3_TEST_WORKERS_GARBAGE", 4usize), 7);
    }

    #[test]
    fn flags_accept_one_and_true() {
        unsafe { std::env::set_var("YTMP3_TEST_FLAG_A", "TRUE") };
        unsafe { std::env::set_var("YTMP3_TEST_FLAG_B", "0") };
        assert!(env_flag("YTMP3_TEST_FLAG_A", false));
        assert!(!env_flag("YTMP3_TEST_FLAG_B", true));
        assert!(env_flag("YTMP3_TEST_FLAG_UNSET", true));
    }
}
