//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use ytmp3_core::{AudioPipeline, FileStore, PoolConfig, StreamResolver, Transcoder, WorkerPool};

use crate::config::Config;

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Storage directory of finished MP3 files.
    pub store: FileStore,
    /// Resolver + transcoder writing into `store`.
    pub pipeline: AudioPipeline,
    /// Process-wide pool the blocking pipeline runs on.
    pub pool: WorkerPool,
}

impl AppState {
    pub fn new(
        config: Config,
        resolver: Arc<dyn StreamResolver>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let store = FileStore::new(&config.downloads_dir);
        let pipeline = AudioPipeline::new(
            resolver,
            transcoder,
            &config.downloads_dir,
            config.bitrate_kbps,
        );
        let pool = WorkerPool::new(PoolConfig {
            workers: config.workers,
            queue_capacity: config.queue_capacity,
        });
        Self {
            config: Arc::new(config),
            store,
            pipeline,
            pool,
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("downloads_dir", &self.store.root())
            .field("pool", &self.pool.config())
            .finish()
    }
}
