//! Share-link endpoints
//!
//! The `:share_link` segment resolves to a [`ProjectScope`]; ids in the rest
//! of the path are checked against that project.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, patch, post},
    Router,
};
use mixreview_common::db::Reply;
use serde::Serialize;

use crate::access::{AdminIdentity, ProjectScope};
use crate::api::extract::{Json, Path, Query};
use crate::comments::{self, CommentFilter, CommentView, NewComment, NewReply};
use crate::error::ApiResult;
use crate::lifecycle::{projects, versions, ClientProjectView};
use crate::AppState;

/// Response of the favourite toggle
#[derive(Debug, Serialize)]
pub struct FavouriteResponse {
    pub ok: bool,
    pub favourite: bool,
}

/// GET /api/projects/:share_link
pub async fn get_project(
    State(state): State<AppState>,
    scope: ProjectScope,
) -> ApiResult<Json<ClientProjectView>> {
    Ok(Json(projects::client_project(&state.db, &scope).await?))
}

/// PATCH /api/projects/:share_link/versions/:version_id/favourite
pub async fn toggle_favourite(
    State(state): State<AppState>,
    scope: ProjectScope,
    Path((_, version_id)): Path<(String, i64)>,
) -> ApiResult<Json<FavouriteResponse>> {
    let favourite = versions::toggle_favourite(&state.db, &scope, version_id).await?;
    Ok(Json(FavouriteResponse { ok: true, favourite }))
}

/// GET /api/projects/:share_link/comments?version_id=&song_id=
pub async fn list_comments(
    State(state): State<AppState>,
    scope: ProjectScope,
    Query(filter): Query<CommentFilter>,
) -> ApiResult<Json<Vec<CommentView>>> {
    Ok(Json(comments::list_comments(&state.db, &scope, filter).await?))
}

/// POST /api/projects/:share_link/comments
pub async fn create_comment(
    State(state): State<AppState>,
    scope: ProjectScope,
    Json(req): Json<NewComment>,
) -> ApiResult<(StatusCode, Json<CommentView>)> {
    let comment = comments::create_comment(&state.db, &scope, req).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// POST /api/projects/:share_link/comments/:comment_id/reply
pub async fn reply(
    State(state): State<AppState>,
    scope: ProjectScope,
    Path((_, comment_id)): Path<(String, i64)>,
    Json(req): Json<NewReply>,
) -> ApiResult<(StatusCode, Json<Reply>)> {
    let reply = comments::reply(&state.db, &scope, comment_id, req).await?;
    Ok((StatusCode::CREATED, Json(reply)))
}

/// PATCH /api/projects/:share_link/comments/:comment_id/resolve
///
/// Admin flip from the review page; needs the share link and a bearer token.
pub async fn resolve(
    State(state): State<AppState>,
    scope: ProjectScope,
    admin: AdminIdentity,
    Path((_, comment_id)): Path<(String, i64)>,
) -> ApiResult<Json<CommentView>> {
    Ok(Json(comments::resolve_in_project(&state.db, &scope, &admin, comment_id).await?))
}

/// PATCH /api/projects/:share_link/comments/:comment_id/resolve-client
pub async fn resolve_as_client(
    State(state): State<AppState>,
    scope: ProjectScope,
    Path((_, comment_id)): Path<(String, i64)>,
) -> ApiResult<Json<CommentView>> {
    Ok(Json(comments::resolve_as_client(&state.db, &scope, comment_id).await?))
}

pub fn client_routes() -> Router<AppState> {
    Router::new()
        .route("/api/projects/:share_link", get(get_project))
        .route(
            "/api/projects/:share_link/comments",
            get(list_comments).post(create_comment),
        )
        .route("/api/projects/:share_link/comments/:comment_id/reply", post(reply))
        .route("/api/projects/:share_link/comments/:comment_id/resolve", patch(resolve))
        .route(
            "/api/projects/:share_link/comments/:comment_id/resolve-client",
            patch(resolve_as_client),
        )
        .route(
            "/api/projects/:share_link/versions/:version_id/favourite",
            patch(toggle_favourite),
        )
}
