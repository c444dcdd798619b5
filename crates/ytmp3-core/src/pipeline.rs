//! One download request end to end: resolve → select → fetch → transcode.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::resolver::StreamResolver;
use crate::stream::select_stream;
use crate::transcode::Transcoder;

/// Characters that cannot appear in a file name on common filesystems.
const ILLEGAL_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Fallback used when a title sanitises to nothing.
const UNTITLED: &str = "audio";

/// Byte budget for the title part of a stored name; with `{id}_` and `.mp3`
/// the full name stays under the common 255-byte limit.
const MAX_TITLE_BYTES: usize = 200;

/// Mint an 8-character lowercase hex request identifier.
pub fn new_download_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Strip filesystem-illegal and control characters from a display title and
/// cap it at [`MAX_TITLE_BYTES`] on a character boundary.
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c) && !c.is_control())
        .collect();
    let cleaned = cleaned.trim();

    let mut end = cleaned.len().min(MAX_TITLE_BYTES);
    while !cleaned.is_char_boundary(end) {
        end -= 1;
    }
    cleaned[..end].trim_end().to_owned()
}

/// Input of a single pipeline run.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub id: String,
    pub url: String,
    /// Replaces the platform title in the stored filename when non-empty.
    pub title_override: Option<String>,
}

impl DownloadJob {
    pub fn new(url: impl Into<String>, title_override: Option<String>) -> Self {
        Self {
            id: new_download_id(),
            url: url.into(),
            title_override,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub download_id: String,
    /// `{download_id}_{sanitized_title}.mp3`
    pub filename: String,
    /// Title as reported by the platform.
    pub title: String,
    pub path: PathBuf,
}

/// Removes the wrapped path when dropped, whatever way the scope exits.
struct TempFile(PathBuf);

impl TempFile {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.0.display(), error = %e, "failed to remove temp file"),
        }
    }
}

/// Resolver + transcoder composed over an output directory.
#[derive(Clone)]
pub struct AudioPipeline {
    resolver: Arc<dyn StreamResolver>,
    transcoder: Arc<dyn Transcoder>,
    output_dir: PathBuf,
    bitrate_kbps: u32,
}

impl AudioPipeline {
    pub fn new(
        resolver: Arc<dyn StreamResolver>,
        transcoder: Arc<dyn Transcoder>,
        output_dir: impl Into<PathBuf>,
        bitrate_kbps: u32,
    ) -> Self {
        Self {
            resolver,
            transcoder,
            output_dir: output_dir.into(),
            bitrate_kbps,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run the job to completion. Blocking; call from a worker thread.
    ///
    /// The `{id}_temp` download is removed on every exit path, and a partial
    /// MP3 is removed when transcoding fails.
    pub fn run(&self, job: &DownloadJob) -> Result<DownloadOutcome> {
        let video = self.resolver.resolve(&job.url)?;
        info!(download_id = %job.id, title = %video.title, streams = video.streams.len(), "video found");

        let stream = select_stream(&video.streams).ok_or(Error::NoStreamFound)?;
        info!(
            download_id = %job.id,
            format_id = %stream.id,
            container = %stream.container,
            abr = ?stream.audio_bitrate_kbps,
            "selected stream"
        );

        let temp = TempFile(self.output_dir.join(format!("{}_temp", job.id)));
        self.resolver.download(stream, temp.path())?;

        let stem = job
            .title_override
            .as_deref()
            .map(sanitize_title)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| sanitize_title(&video.title));
        let stem = if stem.is_empty() { UNTITLED.to_owned() } else { stem };
        let filename = format!("{}_{}.mp3", job.id, stem);
        let path = self.output_dir.join(&filename);

        if let Err(e) = self.transcoder.transcode(temp.path(), &path, self.bitrate_kbps) {
            // Drop a half-written output alongside the temp file.
            drop(TempFile(path));
            return Err(e);
        }

        info!(download_id = %job.id, %filename, "conversion completed");
        Ok(DownloadOutcome {
            download_id: job.id.clone(),
            filename,
            title: video.title,
            path,
        })
    }
}
