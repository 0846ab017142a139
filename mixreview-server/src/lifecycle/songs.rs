//! Song operations

use chrono::Utc;
use mixreview_common::db::Song;
use mixreview_common::storage::MediaStore;
use mixreview_common::{Error, Result};
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use super::remove_media_files;
use crate::access::AdminIdentity;
use crate::validation::required_text;

#[derive(Debug, Deserialize)]
pub struct SongInput {
    pub title: String,
}

/// Append a song to a project
///
/// The position is read and written by one statement, so two concurrent
/// creations cannot observe the same maximum.
pub async fn create_song(
    db: &SqlitePool,
    _admin: &AdminIdentity,
    project_id: &str,
    input: SongInput,
) -> Result<Song> {
    let title = required_text("title", &input.title, 200)?;

    let mut tx = db.begin().await?;

    let song = sqlx::query_as::<_, Song>(
        r#"
        INSERT INTO songs (project_id, title, position, created_at)
        SELECT p.id, ?,
               COALESCE((SELECT MAX(s.position) FROM songs s WHERE s.project_id = p.id), 0) + 1,
               ?
        FROM projects p
        WHERE p.id = ?
        RETURNING id, project_id, title, position, created_at
        "#,
    )
    .bind(&title)
    .bind(Utc::now())
    .bind(project_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| Error::NotFound("Project not found".to_string()))?;

    tx.commit().await?;

    info!(%project_id, song_id = song.id, position = song.position, "Created song");
    Ok(song)
}

pub async fn get_song(db: &SqlitePool, song_id: i64) -> Result<Song> {
    sqlx::query_as::<_, Song>(
        "SELECT id, project_id, title, position, created_at FROM songs WHERE id = ?",
    )
    .bind(song_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound("Song not found".to_string()))
}

pub async fn update_song(
    db: &SqlitePool,
    _admin: &AdminIdentity,
    song_id: i64,
    input: SongInput,
) -> Result<Song> {
    let title = required_text("title", &input.title, 200)?;

    sqlx::query_as::<_, Song>(
        "UPDATE songs SET title = ? WHERE id = ?
         RETURNING id, project_id, title, position, created_at",
    )
    .bind(&title)
    .bind(song_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound("Song not found".to_string()))
}

/// Delete a song with all its versions, comments and audio files
pub async fn delete_song(
    db: &SqlitePool,
    store: &MediaStore,
    admin: &AdminIdentity,
    song_id: i64,
) -> Result<()> {
    let mut tx = db.begin().await?;

    let file_paths: Vec<String> =
        sqlx::query_scalar("DELETE FROM versions WHERE song_id = ? RETURNING file_path")
            .bind(song_id)
            .fetch_all(&mut *tx)
            .await?;

    let project_id: String = sqlx::query_scalar("DELETE FROM songs WHERE id = ? RETURNING project_id")
        .bind(song_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| Error::NotFound("Song not found".to_string()))?;

    tx.commit().await?;

    info!(admin = %admin.username(), song_id, files = file_paths.len(), "Deleted song");
    remove_media_files(store, &file_paths, &[store.song_dir(&project_id, song_id)]).await;

    Ok(())
}
