//! On-disk media storage
//!
//! Layout under the uploads folder:
//! - `<project_id>/<song_id>/v<version_number>.<ext>` for audio versions
//! - `logo/logo.<ext>` for the settings logo
//! - `.staging/<uuid>.<ext>` for uploads still in flight
//!
//! Stored filenames are derived from ids and version numbers only. The
//! client-supplied filename contributes nothing but its extension.

use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{Error, Result};

/// Accepted audio extensions (lowercase, no dot)
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac"];

/// Accepted logo extensions (lowercase, no dot)
pub const LOGO_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Logo uploads larger than this are rejected
pub const MAX_LOGO_BYTES: u64 = 2 * 1024 * 1024;

/// Lowercased extension of a client-supplied filename
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Validate `filename` against an allow-list, returning the normalized extension
pub fn allowed_extension(filename: &str, allowed: &[&str]) -> Result<String> {
    match extension_of(filename) {
        Some(ext) if allowed.contains(&ext.as_str()) => Ok(ext),
        _ => Err(Error::BadRequest(format!(
            "File type not allowed. Use: {}",
            allowed
                .iter()
                .map(|e| format!(".{}", e))
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// MIME type for a stored audio file
pub fn audio_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// MIME type for a stored logo image
pub fn image_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

/// Path helper and file operations rooted at the uploads folder
#[derive(Debug, Clone)]
pub struct MediaStore {
    uploads_dir: PathBuf,
}

impl MediaStore {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
        }
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.uploads_dir.join(project_id)
    }

    pub fn song_dir(&self, project_id: &str, song_id: i64) -> PathBuf {
        self.project_dir(project_id).join(song_id.to_string())
    }

    pub fn audio_path(&self, project_id: &str, song_id: i64, version_number: i64, ext: &str) -> PathBuf {
        self.song_dir(project_id, song_id)
            .join(format!("v{}.{}", version_number, ext))
    }

    pub fn logo_path(&self, ext: &str) -> PathBuf {
        self.uploads_dir.join("logo").join(format!("logo.{}", ext))
    }

    fn staging_dir(&self) -> PathBuf {
        self.uploads_dir.join(".staging")
    }

    /// Open a new staging file for an incoming upload
    ///
    /// `limit` caps the number of bytes accepted; exceeding it is a BadRequest
    /// and the partial file is removed.
    pub async fn begin_upload(&self, ext: &str, limit: Option<u64>) -> Result<UploadWriter> {
        let dir = self.staging_dir();
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(format!("{}.{}", Uuid::new_v4().simple(), ext));
        let file = tokio::fs::File::create(&path).await?;

        Ok(UploadWriter {
            file,
            staged: StagedFile {
                path,
                size: 0,
                persisted: false,
            },
            limit,
        })
    }

    /// Delete a file; absence is not an error. Returns whether a file was removed.
    pub async fn remove_if_exists(&self, path: &Path) -> Result<bool> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Best-effort delete: failures are logged, never returned
    pub async fn remove_best_effort(&self, path: &Path) {
        match self.remove_if_exists(path).await {
            Ok(true) => debug!("Removed media file {}", path.display()),
            Ok(false) => debug!("Media file already absent: {}", path.display()),
            Err(e) => warn!("Failed to remove media file {}: {}", path.display(), e),
        }
    }

    /// Remove a directory if it is empty; anything else is ignored
    pub async fn prune_dir(&self, dir: &Path) {
        if let Err(e) = tokio::fs::remove_dir(dir).await {
            debug!("Left directory {} in place: {}", dir.display(), e);
        }
    }

    /// True when `path` names an existing regular file
    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }
}

/// Streams upload chunks into a staging file
pub struct UploadWriter {
    file: tokio::fs::File,
    staged: StagedFile,
    limit: Option<u64>,
}

impl UploadWriter {
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let next_size = self.staged.size + chunk.len() as u64;
        if let Some(limit) = self.limit {
            if next_size > limit {
                return Err(Error::BadRequest(format!(
                    "File exceeds maximum size of {} bytes",
                    limit
                )));
            }
        }

        self.file.write_all(chunk).await?;
        self.staged.size = next_size;
        Ok(())
    }

    /// Flush to disk and hand over the staged file
    pub async fn finish(mut self) -> Result<StagedFile> {
        self.file.flush().await?;
        self.file.sync_all().await?;
        Ok(self.staged)
    }
}

/// A fully written upload waiting to be moved to its final location
///
/// Dropping it without calling [`StagedFile::persist_to`] deletes the file.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    size: u64,
    persisted: bool,
}

impl StagedFile {
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the staged file to `dest`, creating parent folders and replacing
    /// any file already there
    pub async fn persist_to(mut self, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(&self.path, dest).await?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.persisted {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to discard staged upload {}: {}", self.path.display(), e);
                }
            }
        }
    }
}
