//! Settings endpoints: public read, admin write, logo upload

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, post, put},
    Router,
};

use crate::access::AdminIdentity;
use crate::api::extract::Json;
use crate::error::{ApiError, ApiResult};
use crate::settings::{self, SettingsUpdate, SettingsView};
use crate::uploads::{IncomingFile, UploadKind};
use crate::AppState;

/// GET /api/settings
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<SettingsView>> {
    Ok(Json(settings::get_settings(&state.db, &state.store).await?))
}

/// PUT /admin/settings
pub async fn update_settings(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Json(req): Json<SettingsUpdate>,
) -> ApiResult<Json<SettingsView>> {
    Ok(Json(settings::update_settings(&state.db, &state.store, &admin, req).await?))
}

/// POST /admin/settings/logo (multipart field `file`)
pub async fn upload_logo(
    State(state): State<AppState>,
    admin: AdminIdentity,
    mut multipart: Multipart,
) -> ApiResult<Json<SettingsView>> {
    let mut received = None;

    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let mut incoming = IncomingFile::begin(&state.store, UploadKind::Logo, &filename).await?;
        while let Some(chunk) = field.chunk().await? {
            incoming.write_chunk(&chunk).await?;
        }
        received = Some(incoming.finish().await?);
    }

    let file = received.ok_or_else(|| ApiError::bad_request("Missing file field"))?;
    Ok(Json(settings::upload_logo(&state.db, &state.store, &admin, file).await?))
}

/// DELETE /admin/settings/logo
pub async fn delete_logo(State(state): State<AppState>, admin: AdminIdentity) -> ApiResult<StatusCode> {
    settings::delete_logo(&state.db, &state.store, &admin).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/api/settings", get(get_settings))
        .route("/admin/settings", put(update_settings))
        .route("/admin/settings/logo", post(upload_logo).delete(delete_logo))
}
