//! Admin panel endpoints
//!
//! Every handler here takes an [`AdminIdentity`]; requests without a valid
//! bearer token never reach the handler body.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    routing::{get, patch, post, put},
    Router,
};
use mixreview_common::db::{Song, Version};

use crate::access::AdminIdentity;
use crate::api::extract::{Json, Path};
use crate::comments::{self, CommentUpdate, CommentView};
use crate::error::{ApiError, ApiResult};
use crate::lifecycle::projects::{self, ProjectInput};
use crate::lifecycle::songs::{self, SongInput};
use crate::lifecycle::versions::{self, NewVersion, VersionUpdate};
use crate::lifecycle::{ProjectDetail, ProjectSummary};
use crate::uploads::{IncomingFile, UploadKind};
use crate::AppState;

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

/// GET /admin/projects
pub async fn list_projects(
    State(state): State<AppState>,
    admin: AdminIdentity,
) -> ApiResult<Json<Vec<ProjectSummary>>> {
    Ok(Json(projects::list_projects(&state.db, &admin).await?))
}

/// POST /admin/projects
pub async fn create_project(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Json(req): Json<ProjectInput>,
) -> ApiResult<(StatusCode, Json<ProjectDetail>)> {
    let project = projects::create_project(&state.db, &admin, req).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

/// GET /admin/projects/:project_id
pub async fn get_project(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(project_id): Path<String>,
) -> ApiResult<Json<ProjectDetail>> {
    Ok(Json(projects::get_project(&state.db, &admin, &project_id).await?))
}

/// PUT /admin/projects/:project_id
pub async fn update_project(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(project_id): Path<String>,
    Json(req): Json<ProjectInput>,
) -> ApiResult<Json<ProjectDetail>> {
    Ok(Json(projects::update_project(&state.db, &admin, &project_id, req).await?))
}

/// DELETE /admin/projects/:project_id
pub async fn delete_project(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(project_id): Path<String>,
) -> ApiResult<StatusCode> {
    projects::delete_project(&state.db, &state.store, &admin, &project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Songs
// ---------------------------------------------------------------------------

/// POST /admin/projects/:project_id/songs
pub async fn create_song(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(project_id): Path<String>,
    Json(req): Json<SongInput>,
) -> ApiResult<(StatusCode, Json<Song>)> {
    let song = songs::create_song(&state.db, &admin, &project_id, req).await?;
    Ok((StatusCode::CREATED, Json(song)))
}

/// PUT /admin/songs/:song_id
pub async fn update_song(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(song_id): Path<i64>,
    Json(req): Json<SongInput>,
) -> ApiResult<Json<Song>> {
    Ok(Json(songs::update_song(&state.db, &admin, song_id, req).await?))
}

/// DELETE /admin/songs/:song_id
pub async fn delete_song(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(song_id): Path<i64>,
) -> ApiResult<StatusCode> {
    songs::delete_song(&state.db, &state.store, &admin, song_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Versions
// ---------------------------------------------------------------------------

/// POST /admin/songs/:song_id/versions
///
/// Multipart fields: `file` (required), `label`, `version_number`.
/// The file is streamed to a staging area chunk by chunk.
pub async fn upload_version(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(song_id): Path<i64>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Version>)> {
    // Unknown songs are rejected before any bytes are stored
    songs::get_song(&state.db, song_id).await?;

    let mut received = None;
    let mut new = NewVersion::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let mut incoming = IncomingFile::begin(&state.store, UploadKind::Audio, &filename).await?;
                while let Some(chunk) = field.chunk().await? {
                    incoming.write_chunk(&chunk).await?;
                }
                received = Some(incoming.finish().await?);
            }
            "label" => new.label = Some(field.text().await?),
            "version_number" => new.version_number = parse_version_number(&field.text().await?)?,
            _ => {}
        }
    }

    let file = received.ok_or_else(|| ApiError::bad_request("Missing file field"))?;
    let version = versions::upload_version(&state.db, &state.store, &admin, song_id, file, new).await?;
    Ok((StatusCode::CREATED, Json(version)))
}

/// PUT /admin/versions/:version_id
pub async fn update_version(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(version_id): Path<i64>,
    Json(req): Json<VersionUpdate>,
) -> ApiResult<Json<Version>> {
    Ok(Json(versions::update_version(&state.db, &admin, version_id, req).await?))
}

/// DELETE /admin/versions/:version_id
pub async fn delete_version(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(version_id): Path<i64>,
) -> ApiResult<StatusCode> {
    versions::delete_version(&state.db, &state.store, &admin, version_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

/// PUT /admin/comments/:comment_id
pub async fn update_comment(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(comment_id): Path<i64>,
    Json(req): Json<CommentUpdate>,
) -> ApiResult<Json<CommentView>> {
    Ok(Json(comments::update_comment(&state.db, &admin, comment_id, req).await?))
}

/// DELETE /admin/comments/:comment_id
pub async fn delete_comment(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(comment_id): Path<i64>,
) -> ApiResult<StatusCode> {
    comments::delete_comment(&state.db, &admin, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /admin/comments/:comment_id/resolve
pub async fn resolve_comment(
    State(state): State<AppState>,
    admin: AdminIdentity,
    Path(comment_id): Path<i64>,
) -> ApiResult<Json<CommentView>> {
    Ok(Json(comments::resolve(&state.db, &admin, comment_id).await?))
}

/// Blank means "not given"; zero and negatives are handled by the service
fn parse_version_number(raw: &str) -> ApiResult<Option<i64>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| ApiError::bad_request("version_number must be an integer"))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/projects", get(list_projects).post(create_project))
        .route(
            "/admin/projects/:project_id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/admin/projects/:project_id/songs", post(create_song))
        .route("/admin/songs/:song_id", put(update_song).delete(delete_song))
        .route("/admin/songs/:song_id/versions", post(upload_version))
        .route("/admin/versions/:version_id", put(update_version).delete(delete_version))
        .route("/admin/comments/:comment_id", put(update_comment).delete(delete_comment))
        .route("/admin/comments/:comment_id/resolve", patch(resolve_comment))
}
