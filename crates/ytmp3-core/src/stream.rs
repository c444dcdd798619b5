//! Stream candidates and the fixed selection policy.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A downloadable media track advertised by the platform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamCandidate {
    /// Platform-specific format identifier (e.g. yt-dlp's `format_id`).
    pub id: String,
    /// Direct URL of the media bytes.
    pub url: String,
    /// Container / file extension as reported by the platform (`mp4`, `m4a`, `webm`, ...).
    pub container: String,
    pub has_audio: bool,
    pub has_video: bool,
    /// Average audio bitrate in kbit/s, when advertised.
    pub audio_bitrate_kbps: Option<f64>,
    pub audio_codec: Option<String>,
    pub video_codec: Option<String>,
    /// Headers the platform expects when fetching `url`.
    pub http_headers: BTreeMap<String, String>,
}

impl StreamCandidate {
    pub fn is_audio_only(&self) -> bool {
        self.has_audio && !self.has_video
    }

    /// Adaptive streams carry exactly one of audio or video.
    pub fn is_adaptive(&self) -> bool {
        self.has_audio != self.has_video
    }

    /// `m4a` is the audio-only flavour of the MP4 container.
    pub fn is_mp4(&self) -> bool {
        matches!(self.container.to_ascii_lowercase().as_str(), "mp4" | "m4a")
    }
}

/// Pick the stream to download, first non-empty rule wins:
///
/// 1. audio-only streams with a known bitrate, highest bitrate first;
/// 2. any adaptive MP4 stream that carries audio;
/// 3. any MP4 stream.
pub fn select_stream(streams: &[StreamCandidate]) -> Option<&StreamCandidate> {
    let best_audio = streams
        .iter()
        .filter(|s| s.is_audio_only() && s.audio_bitrate_kbps.is_some())
        .max_by(|a, b| {
            a.audio_bitrate_kbps
                .partial_cmp(&b.audio_bitrate_kbps)
                .unwrap_or(Ordering::Equal)
        });
    if best_audio.is_some() {
        return best_audio;
    }

    streams
        .iter()
        .find(|s| s.is_adaptive() && s.is_mp4() && s.has_audio)
        .or_else(|| streams.iter().find(|s| s.is_mp4()))
}
