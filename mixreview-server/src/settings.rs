//! Application settings singleton
//!
//! One row (`id = 1`) holds the theme palettes, the logo and the client
//! resolve policy. It is created on first access by an `INSERT OR IGNORE`,
//! which the `CHECK (id = 1)` constraint and primary key make race-free.

use chrono::Utc;
use mixreview_common::db::AppSettings;
use mixreview_common::storage::MediaStore;
use mixreview_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

use crate::access::AdminIdentity;
use crate::uploads::{ReceivedFile, UploadKind};
use crate::validation::hex_color;

/// Public URL of the logo image
pub const LOGO_URL: &str = "/api/logo";

const MIN_LOGO_HEIGHT: i64 = 16;
const MAX_LOGO_HEIGHT: i64 = 120;

const SETTINGS_COLUMNS: &str = "accent_color, dark_900, dark_800, dark_700, dark_600, text_color, \
     waveform_color, waveform_progress_color, light_accent_color, light_bg_900, light_bg_800, \
     light_bg_700, light_bg_600, light_text_color, light_waveform_color, \
     light_waveform_progress_color, logo_path, logo_height, clients_can_resolve";

/// Settings as every client sees them
#[derive(Debug, Clone, Serialize)]
pub struct SettingsView {
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
    /// Present only while the logo file exists on disk
    pub logo_url: Option<String>,
    pub logo_height: i64,
    pub clients_can_resolve: bool,
}

/// Partial update; `None` leaves the stored value unchanged
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SettingsUpdate {
    pub accent_color: Option<String>,
    pub dark_900: Option<String>,
    pub dark_800: Option<String>,
    pub dark_700: Option<String>,
    pub dark_600: Option<String>,
    pub text_color: Option<String>,
    pub waveform_color: Option<String>,
    pub waveform_progress_color: Option<String>,
    pub light_accent_color: Option<String>,
    pub light_bg_900: Option<String>,
    pub light_bg_800: Option<String>,
    pub light_bg_700: Option<String>,
    pub light_bg_600: Option<String>,
    pub light_text_color: Option<String>,
    pub light_waveform_color: Option<String>,
    pub light_waveform_progress_color: Option<String>,
    pub logo_height: Option<i64>,
    pub clients_can_resolve: Option<bool>,
}

impl SettingsUpdate {
    fn colors(&self) -> [(&'static str, &Option<String>); 16] {
        [
            ("accent_color", &self.accent_color),
            ("dark_900", &self.dark_900),
            ("dark_800", &self.dark_800),
            ("dark_700", &self.dark_700),
            ("dark_600", &self.dark_600),
            ("text_color", &self.text_color),
            ("waveform_color", &self.waveform_color),
            ("waveform_progress_color", &self.waveform_progress_color),
            ("light_accent_color", &self.light_accent_color),
            ("light_bg_900", &self.light_bg_900),
            ("light_bg_800", &self.light_bg_800),
            ("light_bg_700", &self.light_bg_700),
            ("light_bg_600", &self.light_bg_600),
            ("light_text_color", &self.light_text_color),
            ("light_waveform_color", &self.light_waveform_color),
            ("light_waveform_progress_color", &self.light_waveform_progress_color),
        ]
    }

    /// Check every provided field before anything is written
    pub fn validate(&self) -> Result<()> {
        for (field, value) in self.colors() {
            if let Some(value) = value {
                hex_color(field, value)?;
            }
        }
        if let Some(height) = self.logo_height {
            if !(MIN_LOGO_HEIGHT..=MAX_LOGO_HEIGHT).contains(&height) {
                return Err(Error::BadRequest(format!(
                    "logo_height must be between {} and {}",
                    MIN_LOGO_HEIGHT, MAX_LOGO_HEIGHT
                )));
            }
        }
        Ok(())
    }
}

/// Read the singleton, creating it with defaults if this is the first access
pub async fn get_or_create(db: &SqlitePool) -> Result<AppSettings> {
    sqlx::query("INSERT OR IGNORE INTO app_settings (id) VALUES (1)")
        .execute(db)
        .await?;

    let settings = sqlx::query_as::<_, AppSettings>(&format!(
        "SELECT {} FROM app_settings WHERE id = 1",
        SETTINGS_COLUMNS
    ))
    .fetch_one(db)
    .await?;

    Ok(settings)
}

pub async fn get_settings(db: &SqlitePool, store: &MediaStore) -> Result<SettingsView> {
    let settings = get_or_create(db).await?;
    Ok(to_view(store, settings).await)
}

pub async fn update_settings(
    db: &SqlitePool,
    store: &MediaStore,
    _admin: &AdminIdentity,
    update: SettingsUpdate,
) -> Result<SettingsView> {
    update.validate()?;
    get_or_create(db).await?;

    sqlx::query(
        r#"
        UPDATE app_settings SET
            accent_color = COALESCE(?, accent_color),
            dark_900 = COALESCE(?, dark_900),
            dark_800 = COALESCE(?, dark_800),
            dark_700 = COALESCE(?, dark_700),
            dark_600 = COALESCE(?, dark_600),
            text_color = COALESCE(?, text_color),
            waveform_color = COALESCE(?, waveform_color),
            waveform_progress_color = COALESCE(?, waveform_progress_color),
            light_accent_color = COALESCE(?, light_accent_color),
            light_bg_900 = COALESCE(?, light_bg_900),
            light_bg_800 = COALESCE(?, light_bg_800),
            light_bg_700 = COALESCE(?, light_bg_700),
            light_bg_600 = COALESCE(?, light_bg_600),
            light_text_color = COALESCE(?, light_text_color),
            light_waveform_color = COALESCE(?, light_waveform_color),
            light_waveform_progress_color = COALESCE(?, light_waveform_progress_color),
            logo_height = COALESCE(?, logo_height),
            clients_can_resolve = COALESCE(?, clients_can_resolve),
            updated_at = ?
        WHERE id = 1
        "#,
    )
    .bind(&update.accent_color)
    .bind(&update.dark_900)
    .bind(&update.dark_800)
    .bind(&update.dark_700)
    .bind(&update.dark_600)
    .bind(&update.text_color)
    .bind(&update.waveform_color)
    .bind(&update.waveform_progress_color)
    .bind(&update.light_accent_color)
    .bind(&update.light_bg_900)
    .bind(&update.light_bg_800)
    .bind(&update.light_bg_700)
    .bind(&update.light_bg_600)
    .bind(&update.light_text_color)
    .bind(&update.light_waveform_color)
    .bind(&update.light_waveform_progress_color)
    .bind(update.logo_height)
    .bind(update.clients_can_resolve)
    .bind(Utc::now())
    .execute(db)
    .await?;

    info!("Settings updated");
    get_settings(db, store).await
}

/// Replace the logo with an uploaded image
pub async fn upload_logo(
    db: &SqlitePool,
    store: &MediaStore,
    admin: &AdminIdentity,
    file: ReceivedFile,
) -> Result<SettingsView> {
    let current = get_or_create(db).await?;

    if let Some(old) = current.logo_path.as_deref() {
        store.remove_best_effort(Path::new(old)).await;
    }

    let size = file.size();
    let dest = store.logo_path(&file.ext);
    file.staged.persist_to(&dest).await?;

    sqlx::query("UPDATE app_settings SET logo_path = ?, updated_at = ? WHERE id = 1")
        .bind(dest.to_string_lossy().into_owned())
        .bind(Utc::now())
        .execute(db)
        .await?;

    info!(admin = %admin.username(), path = %dest.display(), bytes = size, "Logo replaced");
    get_settings(db, store).await
}

/// [`upload_logo`] for an image already held in memory
pub async fn upload_logo_bytes(
    db: &SqlitePool,
    store: &MediaStore,
    admin: &AdminIdentity,
    filename: &str,
    bytes: &[u8],
) -> Result<SettingsView> {
    let file = ReceivedFile::from_bytes(store, UploadKind::Logo, filename, bytes).await?;
    upload_logo(db, store, admin, file).await
}

pub async fn delete_logo(db: &SqlitePool, store: &MediaStore, admin: &AdminIdentity) -> Result<()> {
    let current = get_or_create(db).await?;

    sqlx::query("UPDATE app_settings SET logo_path = NULL, updated_at = ? WHERE id = 1")
        .bind(Utc::now())
        .execute(db)
        .await?;

    if let Some(old) = current.logo_path.as_deref() {
        store.remove_best_effort(Path::new(old)).await;
    }

    info!(admin = %admin.username(), "Logo removed");
    Ok(())
}

async fn to_view(store: &MediaStore, settings: AppSettings) -> SettingsView {
    let logo_url = match settings.logo_path.as_deref() {
        Some(path) if store.exists(Path::new(path)).await => Some(LOGO_URL.to_string()),
        _ => None,
    };

    SettingsView {
        accent_color: settings.accent_color,
        dark_900: settings.dark_900,
        dark_800: settings.dark_800,
        dark_700: settings.dark_700,
        dark_600: settings.dark_600,
        text_color: settings.text_color,
        waveform_color: settings.waveform_color,
        waveform_progress_color: settings.waveform_progress_color,
        light_accent_color: settings.light_accent_color,
        light_bg_900: settings.light_bg_900,
        light_bg_800: settings.light_bg_800,
        light_bg_700: settings.light_bg_700,
        light_bg_600: settings.light_bg_600,
        light_text_color: settings.light_text_color,
        light_waveform_color: settings.light_waveform_color,
        light_waveform_progress_color: settings.light_waveform_progress_color,
        logo_url,
        logo_height: settings.logo_height,
        clients_can_resolve: settings.clients_can_resolve,
    }
}
