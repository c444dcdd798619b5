//! Stream resolution seam.

use std::path::Path;

use crate::error::Result;
use crate::stream::StreamCandidate;

/// Metadata and stream list for one video page.
#[derive(Debug, Clone, Default)]
pub struct ResolvedVideo {
    pub title: String,
    pub streams: Vec<StreamCandidate>,
}

/// Turns a video page URL into downloadable streams.
///
/// Both methods block and are only called from worker-pool threads.
/// Implementations report platform failures with the dedicated error
/// categories (`UpstreamRestricted`, `UpstreamUnavailable`,
/// `ExtractionBroken`) rather than free-form text.
pub trait StreamResolver: Send + Sync {
    /// Fetch the title and the advertised streams of `url`.
    fn resolve(&self, url: &str) -> Result<ResolvedVideo>;

    /// Write the bytes of `candidate` to `dest`, returning the byte count.
    fn download(&self, candidate: &StreamCandidate, dest: &Path) -> Result<u64>;
}
