//! Admin account setup and login

use axum::{
    extract::State,
    routing::{get, post},
    Router,
};

use crate::access::{self, AuthStatus, Credentials, TokenResponse};
use crate::api::extract::Json;
use crate::error::ApiResult;
use crate::AppState;

/// GET /admin/auth/status
pub async fn auth_status(State(state): State<AppState>) -> ApiResult<Json<AuthStatus>> {
    Ok(Json(access::auth_status(&state.db).await?))
}

/// POST /admin/auth/setup
///
/// Only succeeds while no admin exists.
pub async fn setup(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> ApiResult<Json<TokenResponse>> {
    Ok(Json(access::setup(&state.db, &state.signer, req).await?))
}

/// POST /admin/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<Credentials>,
) -> ApiResult<Json<TokenResponse>> {
    Ok(Json(access::login(&state.db, &state.signer, req).await?))
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/auth/status", get(auth_status))
        .route("/admin/auth/setup", post(setup))
        .route("/admin/auth/login", post(login))
}
