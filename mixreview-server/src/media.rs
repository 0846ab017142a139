//! Media delivery: locate stored audio and logo files

use mixreview_common::storage::{audio_content_type, image_content_type, MediaStore};
use mixreview_common::{Error, Result};
use sqlx::SqlitePool;
use std::path::PathBuf;

use crate::lifecycle::versions::get_version;
use crate::settings::get_or_create;

/// Fallback when sanitizing leaves nothing usable
const DEFAULT_DOWNLOAD_NAME: &str = "download";

/// A stored file ready to be served
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub path: PathBuf,
    pub content_type: &'static str,
    /// Suggested name for `Content-Disposition`, already sanitized
    pub download_name: Option<String>,
}

/// Audio of one version; NotFound when the row or the file is missing
pub async fn audio_file(db: &SqlitePool, store: &MediaStore, version_id: i64) -> Result<MediaFile> {
    let version = get_version(db, version_id).await?;
    let path = PathBuf::from(&version.file_path);

    if !store.exists(&path).await {
        return Err(Error::NotFound("Audio file not found".to_string()));
    }

    Ok(MediaFile {
        content_type: audio_content_type(&path),
        download_name: Some(sanitize_download_filename(&version.original_filename)),
        path,
    })
}

/// Current logo image; NotFound when none is set or the file is gone
pub async fn logo_file(db: &SqlitePool, store: &MediaStore) -> Result<MediaFile> {
    let settings = get_or_create(db).await?;
    let path = settings
        .logo_path
        .map(PathBuf::from)
        .ok_or_else(|| Error::NotFound("No logo set".to_string()))?;

    if !store.exists(&path).await {
        return Err(Error::NotFound("No logo set".to_string()));
    }

    Ok(MediaFile {
        content_type: image_content_type(&path),
        download_name: None,
        path,
    })
}

/// Make a client-supplied filename safe inside a quoted header parameter
///
/// Control characters, quotes, backslashes and path separators are dropped;
/// non-ASCII characters become `_`.
pub fn sanitize_download_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '"' | '\\' | '/'))
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();

    let trimmed = cleaned.trim();
    if trimmed.is_empty() || trimmed.chars().all(|c| c == '.') {
        DEFAULT_DOWNLOAD_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `Content-Disposition` value for a download
pub fn content_disposition(download_name: &str) -> String {
    format!("attachment; filename=\"{}\"", download_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_ordinary_names() {
        assert_eq!(sanitize_download_filename("Final Mix (v3).wav"), "Final Mix (v3).wav");
    }

    #[test]
    fn test_sanitize_strips_header_injection() {
        assert_eq!(
            sanitize_download_filename("mix\r\nSet-Cookie: a=b\".wav"),
            "mixSet-Cookie: a=b.wav"
        );
        assert_eq!(sanitize_download_filename("../../etc/passwd"), "....etcpasswd");
        assert_eq!(sanitize_download_filename("a\\b.mp3"), "ab.mp3");
    }

    #[test]
    fn test_sanitize_non_ascii_and_empty() {
        assert_eq!(sanitize_download_filename("café.flac"), "caf_.flac");
        assert_eq!(sanitize_download_filename("\"\"/"), "download");
        assert_eq!(sanitize_download_filename(".."), "download");
        assert_eq!(sanitize_download_filename(""), "download");
    }

    #[test]
    fn test_content_disposition() {
        assert_eq!(content_disposition("v1.wav"), "attachment; filename=\"v1.wav\"");
    }
}
