//! Flat directory of MP3 files; the directory listing is the index.

use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{Error, Result};

const MP3_EXTENSION: &str = "mp3";
const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// A finished MP3 in the storage directory.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub name: String,
    pub size_bytes: u64,
    /// Birth time when the filesystem records one, otherwise modification time.
    pub created: DateTime<Utc>,
}

impl StoredFile {
    /// Size in MiB rounded to two decimals.
    pub fn size_mb(&self) -> f64 {
        (self.size_bytes as f64 / BYTES_PER_MIB * 100.0).round() / 100.0
    }
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the storage directory if it is missing.
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Resolve a client-supplied name to an existing file in the store.
    ///
    /// Only bare file names are accepted; anything with a path component is
    /// reported as not found.
    pub async fn locate(&self, name: &str) -> Result<PathBuf> {
        let path = self.candidate_path(name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(Error::NotFound(path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(path)),
            Err(e) => Err(e.into()),
        }
    }

    /// Open a stored file for streaming, returning it with its length.
    pub async fn open(&self, name: &str) -> Result<(tokio::fs::File, u64)> {
        let path = self.locate(name).await?;
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Error::NotFound(path)),
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        let path = self.locate(name).await?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(path = %path.display(), "file deleted");
                Ok(())
            }
            // Lost a race with another delete.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::NotFound(path)),
            Err(e) => Err(e.into()),
        }
    }

    /// Every `.mp3` regular file in the store, sorted by name.
    pub async fn list(&self) -> Result<Vec<StoredFile>> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(MP3_EXTENSION) {
                continue;
            }
            let meta = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                Ok(_) => continue,
                // Deleted between read_dir and stat.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let created: SystemTime = meta.created().or_else(|_| meta.modified())?;
            files.push(StoredFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                size_bytes: meta.len(),
                created: DateTime::<Utc>::from(created),
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(count = files.len(), "listed stored files");
        Ok(files)
    }

    fn candidate_path(&self, name: &str) -> Result<PathBuf> {
        let mut components = Path::new(name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) if part == name => Ok(self.root.join(name)),
            _ => Err(Error::NotFound(PathBuf::from(name))),
        }
    }
}
