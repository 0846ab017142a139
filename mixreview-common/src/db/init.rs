//! Database initialization
//!
//! Creates the database file on first run and applies the schema. Every
//! statement is idempotent, so startup against an existing database is safe.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default busy timeout for contended writes
const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Foreign keys, WAL and busy timeout are per-connection settings, so they
    // go on the connect options rather than a one-off PRAGMA.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Apply the full schema
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_admin_users_table(pool).await?;
    create_projects_table(pool).await?;
    create_songs_table(pool).await?;
    create_versions_table(pool).await?;
    create_comments_table(pool).await?;
    create_replies_table(pool).await?;
    create_app_settings_table(pool).await?;
    Ok(())
}

async fn create_admin_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS admin_users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_projects_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS projects (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            share_link TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            position INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (project_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_versions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS versions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id INTEGER NOT NULL REFERENCES songs(id) ON DELETE CASCADE,
            version_number INTEGER NOT NULL,
            label TEXT NOT NULL DEFAULT '',
            file_path TEXT NOT NULL,
            original_filename TEXT NOT NULL,
            favourite INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            UNIQUE (song_id, version_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one favourite per song, enforced by the store itself
    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_versions_one_favourite
         ON versions(song_id) WHERE favourite = 1",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_comments_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version_id INTEGER NOT NULL REFERENCES versions(id) ON DELETE CASCADE,
            timecode REAL NOT NULL CHECK (timecode >= 0),
            author_name TEXT NOT NULL,
            text TEXT NOT NULL,
            solved INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_comments_version ON comments(version_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_replies_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS replies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            comment_id INTEGER NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
            author_name TEXT NOT NULL,
            text TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_replies_comment ON replies(comment_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the settings singleton table
///
/// The row itself is created lazily on first access; `CHECK (id = 1)` keeps
/// any second row out.
async fn create_app_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS app_settings (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            accent_color TEXT NOT NULL DEFAULT '#6366f1',
            dark_900 TEXT NOT NULL DEFAULT '#0f0f0f',
            dark_800 TEXT NOT NULL DEFAULT '#1a1a1a',
            dark_700 TEXT NOT NULL DEFAULT '#2a2a2a',
            dark_600 TEXT NOT NULL DEFAULT '#3a3a3a',
            text_color TEXT NOT NULL DEFAULT '#e5e7eb',
            waveform_color TEXT NOT NULL DEFAULT '#4b5563',
            waveform_progress_color TEXT NOT NULL DEFAULT '#6366f1',
            light_accent_color TEXT NOT NULL DEFAULT '#6366f1',
            light_bg_900 TEXT NOT NULL DEFAULT '#ffffff',
            light_bg_800 TEXT NOT NULL DEFAULT '#f9fafb',
            light_bg_700 TEXT NOT NULL DEFAULT '#f3f4f6',
            light_bg_600 TEXT NOT NULL DEFAULT '#e5e7eb',
            light_text_color TEXT NOT NULL DEFAULT '#111827',
            light_waveform_color TEXT NOT NULL DEFAULT '#9ca3af',
            light_waveform_progress_color TEXT NOT NULL DEFAULT '#6366f1',
            logo_path TEXT,
            logo_height INTEGER NOT NULL DEFAULT 32,
            clients_can_resolve INTEGER NOT NULL DEFAULT 0,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
