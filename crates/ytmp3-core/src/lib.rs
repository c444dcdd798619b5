//! ytmp3-core – resolve a video page into audio streams, fetch one, and
//! transcode it to MP3.
//!
//! The two external capabilities (stream resolution and transcoding) sit
//! behind the [`StreamResolver`] and [`Transcoder`] traits.  [`AudioPipeline`]
//! composes them for one request, [`WorkerPool`] runs pipelines off the async
//! executor, and [`FileStore`] manages the resulting files on disk.

pub mod error;
pub mod pipeline;
pub mod pool;
pub mod resolver;
pub mod storage;
pub mod stream;
pub mod transcode;
pub mod ytdlp;

pub use error::{Error, ErrorKind, Result};
pub use pipeline::{AudioPipeline, DownloadJob, DownloadOutcome, new_download_id, sanitize_title};
pub use pool::{PoolConfig, WorkerPool};
pub use resolver::{ResolvedVideo, StreamResolver};
pub use storage::{FileStore, StoredFile};
pub use stream::{StreamCandidate, select_stream};
pub use transcode::{DEFAULT_BITRATE_KBPS, FfmpegTranscoder, Transcoder};
pub use ytdlp::{DEFAULT_RESOLVE_TIMEOUT, YtDlpResolver};
