//! Project operations and the read models built on top of them

use chrono::{DateTime, Utc};
use mixreview_common::db::{Project, Version};
use mixreview_common::error::is_unique_violation;
use mixreview_common::storage::MediaStore;
use mixreview_common::{Error, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use super::{remove_media_files, VERSION_COLUMNS};
use crate::access::{AdminIdentity, ProjectScope};
use crate::validation::required_text;

/// Random bytes behind a share link (12 hex characters, 48 bits)
const SHARE_LINK_BYTES: usize = 6;

/// Retries when a freshly generated share link collides with an existing one
const SHARE_LINK_ATTEMPTS: usize = 5;

/// Admin list entry
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    pub share_link: String,
    pub song_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Song with its versions and discussion counters
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SongView {
    pub id: i64,
    pub title: String,
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub version_count: i64,
    pub comment_count: i64,
    pub open_count: i64,
    #[sqlx(skip)]
    pub versions: Vec<Version>,
}

/// Admin detail view
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    pub id: String,
    pub title: String,
    pub share_link: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub songs: Vec<SongView>,
}

/// What a share-link holder sees
#[derive(Debug, Clone, Serialize)]
pub struct ClientProjectView {
    pub title: String,
    pub songs: Vec<SongView>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectInput {
    pub title: String,
}

/// 12 lowercase hex characters from the OS CSPRNG
pub fn generate_share_link() -> String {
    let mut bytes = [0u8; SHARE_LINK_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

pub async fn list_projects(db: &SqlitePool, _admin: &AdminIdentity) -> Result<Vec<ProjectSummary>> {
    let projects = sqlx::query_as::<_, ProjectSummary>(
        r#"
        SELECT p.id, p.title, p.share_link, p.created_at, p.updated_at,
               (SELECT COUNT(*) FROM songs s WHERE s.project_id = p.id) AS song_count,
               (SELECT COUNT(*)
                  FROM comments c
                  JOIN versions v ON v.id = c.version_id
                  JOIN songs s ON s.id = v.song_id
                 WHERE s.project_id = p.id) AS comment_count
        FROM projects p
        ORDER BY p.updated_at DESC, p.id
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok(projects)
}

pub async fn create_project(db: &SqlitePool, _admin: &AdminIdentity, input: ProjectInput) -> Result<ProjectDetail> {
    let title = required_text("title", &input.title, 200)?;
    let id = Uuid::new_v4().simple().to_string();
    let now = Utc::now();

    for attempt in 1..=SHARE_LINK_ATTEMPTS {
        let share_link = generate_share_link();
        let result = sqlx::query(
            "INSERT INTO projects (id, title, share_link, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&title)
        .bind(&share_link)
        .bind(now)
        .bind(now)
        .execute(db)
        .await;

        match result {
            Ok(_) => {
                info!(project_id = %id, "Created project");
                return Ok(ProjectDetail {
                    id,
                    title,
                    share_link,
                    created_at: now,
                    updated_at: now,
                    songs: Vec::new(),
                });
            }
            Err(e) if is_unique_violation(&e) => {
                warn!(attempt, "Share link collision, regenerating");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(Error::Internal("Could not allocate a unique share link".to_string()))
}

pub async fn get_project(db: &SqlitePool, _admin: &AdminIdentity, project_id: &str) -> Result<ProjectDetail> {
    let project = find_project(db, project_id).await?;
    let songs = load_songs(db, &project.id).await?;

    Ok(ProjectDetail {
        id: project.id,
        title: project.title,
        share_link: project.share_link,
        created_at: project.created_at,
        updated_at: project.updated_at,
        songs,
    })
}

/// Rename a project; this is the only mutation that bumps `updated_at`
pub async fn update_project(
    db: &SqlitePool,
    admin: &AdminIdentity,
    project_id: &str,
    input: ProjectInput,
) -> Result<ProjectDetail> {
    let title = required_text("title", &input.title, 200)?;

    let result = sqlx::query("UPDATE projects SET title = ?, updated_at = ? WHERE id = ?")
        .bind(&title)
        .bind(Utc::now())
        .bind(project_id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Project not found".to_string()));
    }

    get_project(db, admin, project_id).await
}

/// Delete a project, its whole subtree and every audio file under it
pub async fn delete_project(
    db: &SqlitePool,
    store: &MediaStore,
    admin: &AdminIdentity,
    project_id: &str,
) -> Result<()> {
    let mut tx = db.begin().await?;

    let file_paths: Vec<String> = sqlx::query_scalar(
        "DELETE FROM versions WHERE song_id IN (SELECT id FROM songs WHERE project_id = ?)
         RETURNING file_path",
    )
    .bind(project_id)
    .fetch_all(&mut *tx)
    .await?;

    let song_ids: Vec<i64> = sqlx::query_scalar("DELETE FROM songs WHERE project_id = ? RETURNING id")
        .bind(project_id)
        .fetch_all(&mut *tx)
        .await?;

    let result = sqlx::query("DELETE FROM projects WHERE id = ?")
        .bind(project_id)
        .execute(&mut *tx)
        .await?;
    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Project not found".to_string()));
    }

    tx.commit().await?;

    info!(admin = %admin.username(), %project_id, files = file_paths.len(), "Deleted project");

    let mut dirs: Vec<_> = song_ids
        .iter()
        .map(|song_id| store.song_dir(project_id, *song_id))
        .collect();
    dirs.push(store.project_dir(project_id));
    remove_media_files(store, &file_paths, &dirs).await;

    Ok(())
}

/// Project view for a share-link holder
pub async fn client_project(db: &SqlitePool, scope: &ProjectScope) -> Result<ClientProjectView> {
    let project = find_project(db, scope.project_id()).await?;
    let songs = load_songs(db, &project.id).await?;

    Ok(ClientProjectView {
        title: project.title,
        songs,
    })
}

pub(crate) async fn find_project(db: &SqlitePool, project_id: &str) -> Result<Project> {
    sqlx::query_as::<_, Project>(
        "SELECT id, title, share_link, created_at, updated_at FROM projects WHERE id = ?",
    )
    .bind(project_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound("Project not found".to_string()))
}

/// Songs in display order, each with versions by number and comment counters
pub(crate) async fn load_songs(db: &SqlitePool, project_id: &str) -> Result<Vec<SongView>> {
    let mut songs = sqlx::query_as::<_, SongView>(
        r#"
        SELECT s.id, s.title, s.position, s.created_at,
               (SELECT COUNT(*) FROM versions v WHERE v.song_id = s.id) AS version_count,
               (SELECT COUNT(*)
                  FROM comments c JOIN versions v ON v.id = c.version_id
                 WHERE v.song_id = s.id) AS comment_count,
               (SELECT COUNT(*)
                  FROM comments c JOIN versions v ON v.id = c.version_id
                 WHERE v.song_id = s.id AND c.solved = 0) AS open_count
        FROM songs s
        WHERE s.project_id = ?
        ORDER BY s.position
        "#,
    )
    .bind(project_id)
    .fetch_all(db)
    .await?;

    let versions = sqlx::query_as::<_, Version>(&format!(
        "SELECT {} FROM versions v JOIN songs s ON s.id = v.song_id
         WHERE s.project_id = ? ORDER BY v.song_id, v.version_number",
        VERSION_COLUMNS
    ))
    .bind(project_id)
    .fetch_all(db)
    .await?;

    let mut by_song: HashMap<i64, Vec<Version>> = HashMap::new();
    for version in versions {
        by_song.entry(version.song_id).or_default().push(version);
    }
    for song in &mut songs {
        song.versions = by_song.remove(&song.id).unwrap_or_default();
    }

    Ok(songs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_share_link_shape() {
        let link = generate_share_link();
        assert_eq!(link.len(), 12);
        assert!(link.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_share_links_do_not_repeat() {
        let links: HashSet<String> = (0..1000).map(|_| generate_share_link()).collect();
        assert_eq!(links.len(), 1000);
    }
}
