//! [`StreamResolver`] backed by the `yt-dlp` extractor.
//!
//! Resolution shells out to `yt-dlp --dump-single-json` and parses the format
//! table; the selected format is then fetched directly over HTTP with
//! `reqwest`, so yt-dlp never writes to the storage directory itself.

use std::collections::BTreeMap;
use std::io::{ErrorKind as IoErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::resolver::{ResolvedVideo, StreamResolver};
use crate::stream::StreamCandidate;

/// Protocols a plain GET can fetch; manifests (HLS, DASH fragments) are skipped.
const DIRECT_PROTOCOLS: &[&str] = &["https", "http"];

/// Default bound on one `yt-dlp` metadata run.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(120);

const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    title: Option<String>,
    #[serde(default)]
    formats: Vec<YtDlpFormat>,
}

#[derive(Debug, Deserialize)]
struct YtDlpFormat {
    #[serde(default)]
    format_id: String,
    url: Option<String>,
    ext: Option<String>,
    acodec: Option<String>,
    vcodec: Option<String>,
    abr: Option<f64>,
    protocol: Option<String>,
    #[serde(default)]
    http_headers: BTreeMap<String, String>,
}

pub struct YtDlpResolver {
    binary: PathBuf,
    fetch_timeout: Duration,
    resolve_timeout: Duration,
}

impl YtDlpResolver {
    pub fn new(binary: impl Into<PathBuf>, fetch_timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            fetch_timeout,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }

    /// Kill `yt-dlp` when it runs longer than `timeout`.
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }
}

impl Default for YtDlpResolver {
    fn default() -> Self {
        Self::new("yt-dlp", Duration::from_secs(600))
    }
}

impl StreamResolver for YtDlpResolver {
    fn resolve(&self, url: &str) -> Result<ResolvedVideo> {
        info!(%url, "resolving streams");

        // Arguments go through `.arg()` (no shell), `--no-exec` keeps yt-dlp
        // from running post-processing commands.
        let child = Command::new(&self.binary)
            .args([
                "--dump-single-json",
                "--no-download",
                "--no-playlist",
                "--no-exec",
                "--no-warnings",
            ])
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                IoErrorKind::NotFound => Error::ToolNotFound { tool: "yt-dlp" },
                _ => Error::Io(e),
            })?;
        let output = wait_with_timeout(child, self.resolve_timeout)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(%url, status = ?output.status.code(), "yt-dlp failed");
            return Err(classify_failure(&stderr));
        }

        let video = parse_info(&output.stdout)?;
        debug!(title = %video.title, streams = video.streams.len(), "streams resolved");
        Ok(video)
    }

    fn download(&self, candidate: &StreamCandidate, dest: &Path) -> Result<u64> {
        info!(format_id = %candidate.id, dest = %dest.display(), "fetching stream");

        // Built per call: the blocking client owns a runtime and must be
        // created and dropped on the worker thread.
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("ytmp3/", env!("CARGO_PKG_VERSION")))
            .timeout(self.fetch_timeout)
            .build()?;

        let mut request = client.get(&candidate.url);
        for (name, value) in &candidate.http_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let mut response = request.send()?;
        let status = response.status();
        match status.as_u16() {
            400 | 403 => return Err(Error::UpstreamRestricted),
            404 | 410 => return Err(Error::UpstreamUnavailable),
            _ if !status.is_success() => {
                return Err(Error::Fetch(format!("remote returned HTTP {status}")));
            }
            _ => {}
        }

        let mut file = std::fs::File::create(dest)?;
        let written = response.copy_to(&mut file)?;
        if written == 0 {
            return Err(Error::Fetch("remote returned an empty stream".into()));
        }

        debug!(bytes = written, "stream fetched");
        Ok(written)
    }
}

/// Collect a child's output, killing it once `timeout` has elapsed.
///
/// Both pipes are drained on their own threads so a large JSON document
/// cannot stall the child on a full pipe.
fn wait_with_timeout(mut child: Child, timeout: Duration) -> Result<Output> {
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let deadline = Instant::now() + timeout;

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            warn!(timeout_secs = timeout.as_secs_f64(), "yt-dlp timed out, killing");
            // Already exited between try_wait and kill is fine.
            let _ = child.kill();
            child.wait()?;
            return Err(Error::Fetch(format!(
                "yt-dlp timed out after {}s",
                timeout.as_secs_f64()
            )));
        }
        thread::sleep(CHILD_POLL_INTERVAL);
    };

    Ok(Output {
        status,
        stdout: join_drain(stdout)?,
        stderr: join_drain(stderr)?,
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join_drain(handle: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<Vec<u8>> {
    handle
        .join()
        .map_err(|_| Error::Worker("pipe reader panicked".into()))?
        .map_err(Error::Io)
}

/// Parse `yt-dlp --dump-single-json` output into a [`ResolvedVideo`].
fn parse_info(stdout: &[u8]) -> Result<ResolvedVideo> {
    let info: YtDlpInfo = serde_json::from_slice(stdout)?;
    let title = info
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| Error::ExtractionBroken("extractor returned no title".into()))?;

    let streams = info
        .formats
        .into_iter()
        .filter(|f| {
            f.protocol
                .as_deref()
                .is_none_or(|p| DIRECT_PROTOCOLS.contains(&p))
        })
        .filter_map(|f| {
            let url = f.url?;
            let has_audio = codec_present(f.acodec.as_deref());
            let has_video = codec_present(f.vcodec.as_deref());
            Some(StreamCandidate {
                id: f.format_id,
                url,
                container: f.ext.unwrap_or_default(),
                has_audio,
                has_video,
                audio_bitrate_kbps: f.abr.filter(|abr| *abr > 0.0),
                audio_codec: f.acodec.filter(|_| has_audio),
                video_codec: f.vcodec.filter(|_| has_video),
                http_headers: f.http_headers,
            })
        })
        .collect();

    Ok(ResolvedVideo { title, streams })
}

fn codec_present(codec: Option<&str>) -> bool {
    codec.is_some_and(|c| !c.is_empty() && c != "none")
}

/// Map yt-dlp's stderr onto an error category.
///
/// This is the only place that looks at extractor text; callers match on
/// the returned variant.
fn classify_failure(stderr: &str) -> Error {
    let lower = stderr.to_lowercase();

    if lower.contains("http error 400")
        || lower.contains("http error 403")
        || lower.contains("sign in to confirm")
        || lower.contains("confirm your age")
        || lower.contains("members-only")
    {
        return Error::UpstreamRestricted;
    }
    if lower.contains("video unavailable")
        || lower.contains("private video")
        || lower.contains("has been removed")
        || lower.contains("not available in your country")
        || (lower.contains("geo") && lower.contains("block"))
    {
        return Error::UpstreamUnavailable;
    }

    let detail = last_error_line(stderr);
    if lower.contains("unable to extract")
        || lower.contains("regex")
        || lower.contains("nsig extraction failed")
        || lower.contains("unable to parse")
    {
        return Error::ExtractionBroken(detail);
    }
    Error::Fetch(detail)
}

fn last_error_line(stderr: &str) -> String {
    let line = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.to_lowercase().starts_with("error"))
        .unwrap_or_else(|| stderr.trim());
    let line = line
        .strip_prefix("ERROR: ")
        .or_else(|| line.strip_prefix("ERROR:"))
        .unwrap_or(line);
    line.chars().take(300).collect()
}
