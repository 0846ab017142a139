//! Audio versions of a song

use chrono::Utc;
use mixreview_common::db::Version;
use mixreview_common::error::{is_foreign_key_violation, is_unique_violation};
use mixreview_common::storage::MediaStore;
use mixreview_common::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use super::songs::get_song;
use super::{remove_media_files, VERSION_COLUMNS};
use crate::access::{AdminIdentity, ProjectScope};
use crate::uploads::{ReceivedFile, UploadKind};
use crate::validation::required_text;

/// Largest version number an upload may ask for explicitly
pub const MAX_VERSION_NUMBER: i64 = i32::MAX as i64;

const RETURNING_VERSION: &str =
    "RETURNING id, song_id, version_number, label, file_path, original_filename, favourite, created_at";

/// Optional metadata sent alongside an upload
#[derive(Debug, Default, Clone)]
pub struct NewVersion {
    pub label: Option<String>,
    /// Zero and negative numbers count as absent; at most [`MAX_VERSION_NUMBER`]
    pub version_number: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct VersionUpdate {
    pub label: Option<String>,
}

fn default_label(version_number: i64) -> String {
    format!("Version {}", version_number)
}

/// Blank labels become `None`, anything else is limited to 200 characters
fn normalize_label(label: Option<&str>) -> Result<Option<String>> {
    match label.map(str::trim) {
        None | Some("") => Ok(None),
        Some(label) => required_text("label", label, 200).map(Some),
    }
}

/// Store an uploaded file as the next version of a song
///
/// The row is inserted first, which fixes the version number. The staged file
/// is then moved to its final path and the row completed, all before commit.
/// If the commit fails the moved file is left behind as an orphan.
pub async fn upload_version(
    db: &SqlitePool,
    store: &MediaStore,
    admin: &AdminIdentity,
    song_id: i64,
    file: ReceivedFile,
    new: NewVersion,
) -> Result<Version> {
    let song = get_song(db, song_id).await?;
    let label = normalize_label(new.label.as_deref())?;
    let explicit = new.version_number.filter(|n| *n > 0);
    if let Some(number) = explicit {
        if number > MAX_VERSION_NUMBER {
            return Err(Error::BadRequest(format!(
                "version_number must not exceed {}",
                MAX_VERSION_NUMBER
            )));
        }
    }
    let now = Utc::now();

    let mut tx = db.begin().await?;

    let inserted = match explicit {
        Some(number) => {
            sqlx::query_as::<_, (i64, i64)>(
                "INSERT INTO versions (song_id, version_number, label, file_path, original_filename, favourite, created_at)
                 VALUES (?, ?, '', '', ?, 0, ?)
                 RETURNING id, version_number",
            )
            .bind(song.id)
            .bind(number)
            .bind(&file.original_filename)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
        }
        None => {
            sqlx::query_as::<_, (i64, i64)>(
                "INSERT INTO versions (song_id, version_number, label, file_path, original_filename, favourite, created_at)
                 SELECT ?, COALESCE((SELECT MAX(version_number) FROM versions WHERE song_id = ?), 0) + 1, '', '', ?, 0, ?
                 RETURNING id, version_number",
            )
            .bind(song.id)
            .bind(song.id)
            .bind(&file.original_filename)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
        }
    };

    let (version_id, version_number) = match inserted {
        Ok(row) => row,
        Err(e) if is_unique_violation(&e) => {
            return Err(Error::BadRequest(format!(
                "Version number {} already exists for this song",
                explicit.unwrap_or_default()
            )))
        }
        // Song deleted after the lookup above
        Err(e) if is_foreign_key_violation(&e) => {
            return Err(Error::NotFound("Song not found".to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let size = file.size();
    let dest = store.audio_path(&song.project_id, song.id, version_number, &file.ext);
    file.staged.persist_to(&dest).await?;

    let version = sqlx::query_as::<_, Version>(&format!(
        "UPDATE versions SET file_path = ?, label = ? WHERE id = ? {}",
        RETURNING_VERSION
    ))
    .bind(dest.to_string_lossy().into_owned())
    .bind(label.unwrap_or_else(|| default_label(version_number)))
    .bind(version_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        admin = %admin.username(),
        song_id = song.id,
        version_id,
        version_number,
        bytes = size,
        original_filename = %version.original_filename,
        "Stored version"
    );
    Ok(version)
}

/// [`upload_version`] for a file already held in memory
pub async fn upload_version_bytes(
    db: &SqlitePool,
    store: &MediaStore,
    admin: &AdminIdentity,
    song_id: i64,
    filename: &str,
    bytes: &[u8],
    new: NewVersion,
) -> Result<Version> {
    get_song(db, song_id).await?;
    let file = ReceivedFile::from_bytes(store, UploadKind::Audio, filename, bytes).await?;
    upload_version(db, store, admin, song_id, file, new).await
}

pub async fn get_version(db: &SqlitePool, version_id: i64) -> Result<Version> {
    sqlx::query_as::<_, Version>(&format!(
        "SELECT {} FROM versions v WHERE v.id = ?",
        VERSION_COLUMNS
    ))
    .bind(version_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound("Version not found".to_string()))
}

/// Relabel a version; a blank label restores the default
pub async fn update_version(
    db: &SqlitePool,
    _admin: &AdminIdentity,
    version_id: i64,
    update: VersionUpdate,
) -> Result<Version> {
    let current = get_version(db, version_id).await?;

    let Some(label) = update.label else {
        return Ok(current);
    };
    let label = normalize_label(Some(&label))?.unwrap_or_else(|| default_label(current.version_number));

    sqlx::query_as::<_, Version>(&format!(
        "UPDATE versions SET label = ? WHERE id = ? {}",
        RETURNING_VERSION
    ))
    .bind(label)
    .bind(version_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound("Version not found".to_string()))
}

pub async fn delete_version(
    db: &SqlitePool,
    store: &MediaStore,
    admin: &AdminIdentity,
    version_id: i64,
) -> Result<()> {
    let file_path: String = sqlx::query_scalar("DELETE FROM versions WHERE id = ? RETURNING file_path")
        .bind(version_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::NotFound("Version not found".to_string()))?;

    info!(admin = %admin.username(), version_id, "Deleted version");

    // The song folder stays: the song can still receive uploads
    remove_media_files(store, std::slice::from_ref(&file_path), &[]).await;

    Ok(())
}

/// Version lookup that only succeeds inside the scoped project
pub async fn version_in_scope(db: &SqlitePool, scope: &ProjectScope, version_id: i64) -> Result<Version> {
    sqlx::query_as::<_, Version>(&format!(
        "SELECT {} FROM versions v JOIN songs s ON s.id = v.song_id
         WHERE v.id = ? AND s.project_id = ?",
        VERSION_COLUMNS
    ))
    .bind(version_id)
    .bind(scope.project_id())
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound("Version not found".to_string()))
}

/// Flip the favourite mark on a version, returning the new state
///
/// Siblings are cleared before the target is flipped, both inside one
/// transaction. The first statement is a write, so concurrent toggles on
/// the same song serialize on the store's write lock.
pub async fn toggle_favourite(db: &SqlitePool, scope: &ProjectScope, version_id: i64) -> Result<bool> {
    let mut tx = db.begin().await?;

    sqlx::query(
        "UPDATE versions SET favourite = 0
         WHERE id != ?
           AND song_id = (SELECT v.song_id FROM versions v JOIN songs s ON s.id = v.song_id
                          WHERE v.id = ? AND s.project_id = ?)",
    )
    .bind(version_id)
    .bind(version_id)
    .bind(scope.project_id())
    .execute(&mut *tx)
    .await?;

    let favourite: bool = sqlx::query_scalar(
        "UPDATE versions SET favourite = 1 - favourite
         WHERE id = ? AND song_id IN (SELECT id FROM songs WHERE project_id = ?)
         RETURNING favourite",
    )
    .bind(version_id)
    .bind(scope.project_id())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| Error::NotFound("Version not found".to_string()))?;

    tx.commit().await?;

    info!(version_id, favourite, "Toggled favourite");
    Ok(favourite)
}
