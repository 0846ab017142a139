//! Audio and logo streaming
//!
//! Files are served through `tower_http::services::ServeFile`, which answers
//! `Range` requests with 206 so players can seek.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        HeaderValue,
    },
    response::Response,
    routing::get,
    Router,
};
use mixreview_common::Error;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::api::extract::Path;
use crate::error::ApiResult;
use crate::media::{self, content_disposition, MediaFile};
use crate::AppState;

/// GET /api/audio/:version_id
pub async fn stream_audio(
    State(state): State<AppState>,
    Path(version_id): Path<i64>,
    request: Request,
) -> ApiResult<Response> {
    let file = media::audio_file(&state.db, &state.store, version_id).await?;
    serve(file, request).await
}

/// GET /api/logo
pub async fn stream_logo(State(state): State<AppState>, request: Request) -> ApiResult<Response> {
    let file = media::logo_file(&state.db, &state.store).await?;
    serve(file, request).await
}

async fn serve(file: MediaFile, request: Request) -> ApiResult<Response> {
    let mut response = ServeFile::new(&file.path)
        .oneshot(request)
        .await
        .unwrap_or_else(|never| match never {})
        .map(Body::new);

    if response.status().is_success() {
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(file.content_type));

        if let Some(name) = file.download_name.as_deref() {
            let value = HeaderValue::from_str(&content_disposition(name))
                .map_err(|e| Error::Internal(format!("Invalid download name: {}", e)))?;
            headers.insert(CONTENT_DISPOSITION, value);
        }
    }

    Ok(response)
}

pub fn media_routes() -> Router<AppState> {
    Router::new()
        .route("/api/audio/:version_id", get(stream_audio))
        .route("/api/logo", get(stream_logo))
}
