use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use tracing::{debug, error, info};

use crate::error::{Error, Result};

/// Bitrate of every MP3 the service produces, in kbit/s.
pub const DEFAULT_BITRATE_KBPS: u32 = 192;

/// Re-encodes an arbitrary media file into an MP3 container.
pub trait Transcoder: Send + Sync {
    /// Blocking; decode `input` and write MP3 audio at `bitrate_kbps` to `output`.
    fn transcode(&self, input: &Path, output: &Path, bitrate_kbps: u32) -> Result<()>;
}

/// [`Transcoder`] that drives an ffmpeg process through `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct FfmpegTranscoder {
    /// Explicit ffmpeg binary; `None` uses the sidecar lookup (next to the
    /// executable, then `PATH`).
    binary: Option<PathBuf>,
}

impl FfmpegTranscoder {
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self { binary }
    }

    fn command(&self) -> FfmpegCommand {
        match &self.binary {
            Some(path) => FfmpegCommand::new_with_path(path),
            None => FfmpegCommand::new(),
        }
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, input: &Path, output: &Path, bitrate_kbps: u32) -> Result<()> {
        let input_str = input
            .to_str()
            .ok_or_else(|| Error::Transcode(format!("non UTF-8 input path {}", input.display())))?;
        let output_str = output
            .to_str()
            .ok_or_else(|| Error::Transcode(format!("non UTF-8 output path {}", output.display())))?;
        let bitrate = format!("{bitrate_kbps}k");

        info!(input = %input.display(), output = %output.display(), %bitrate, "transcoding to mp3");

        let mut child = self
            .command()
            .hide_banner()
            .overwrite()
            .input(input_str)
            .args(["-vn", "-codec:a", "libmp3lame", "-b:a", &bitrate, "-f", "mp3"])
            .output(output_str)
            .spawn()
            .map_err(|e| match e.kind() {
                IoErrorKind::NotFound => Error::ToolNotFound { tool: "ffmpeg" },
                _ => Error::Io(e),
            })?;

        let mut last_error: Option<String> = None;
        child
            .iter()
            .map_err(|e| Error::Transcode(e.to_string()))?
            .for_each(|event| match event {
                FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, msg) => {
                    error!("[FFmpeg] {}", msg);
                    last_error = Some(msg);
                }
                FfmpegEvent::Log(level, msg) => debug!("[FFmpeg {:?}] {}", level, msg),
                FfmpegEvent::Error(e) => {
                    error!("FFmpeg error: {}", e);
                    last_error = Some(e);
                }
                FfmpegEvent::Done => debug!("FFmpeg finished processing: {}", output.display()),
                _ => {}
            });

        let status = child.wait()?;
        if !status.success() {
            return Err(Error::Transcode(last_error.unwrap_or_else(|| {
                format!("ffmpeg exited with {status}")
            })));
        }
        Ok(())
    }
}
