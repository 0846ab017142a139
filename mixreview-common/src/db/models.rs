//! Row models for the persistence layer
//!
//! One struct per table. Timestamps are stored as RFC 3339 text.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A row from `admin_users`
#[derive(Debug, Clone, FromRow)]
pub struct AdminUser {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A row from `projects`
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    pub share_link: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from `songs`
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Song {
    pub id: i64,
    pub project_id: String,
    pub title: String,
    pub position: i64,
    pub created_at: DateTime<Utc>,
}

/// A row from `versions`
///
/// `file_path` is server-internal and never serialized to clients.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Version {
    pub id: i64,
    pub song_id: i64,
    pub version_number: i64,
    pub label: String,
    #[serde(skip)]
    pub file_path: String,
    pub original_filename: String,
    pub favourite: bool,
    pub created_at: DateTime<Utc>,
}

/// A row from `comments`
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: i64,
    pub version_id: i64,
    pub timecode: f64,
    pub author_name: String,
    pub text: String,
    pub solved: bool,
    pub created_at: DateTime<Utc>,
}

/// A row from `replies`
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Reply {
    pub id: i64,
    pub comment_id: i64,
    pub author_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// The singleton row from `app_settings` (id = 1)
#[derive(Debug, Clone, FromRow)]
pub struct AppSettings {
    pub accent_color: String,
    pub dark_900: String,
    pub dark_800: String,
    pub dark_700: String,
    pub dark_600: String,
    pub text_color: String,
    pub waveform_color: String,
    pub waveform_progress_color: String,
    pub light_accent_color: String,
    pub light_bg_900: String,
    pub light_bg_800: String,
    pub light_bg_700: String,
    pub light_bg_600: String,
    pub light_text_color: String,
    pub light_waveform_color: String,
    pub light_waveform_progress_color: String,
    pub logo_path: Option<String>,
    pub logo_height: i64,
    pub clients_can_resolve: bool,
}
