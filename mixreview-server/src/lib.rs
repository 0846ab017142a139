//! mixreview-server library
//!
//! Collaborative audio review: administrators manage projects, songs and
//! audio versions; collaborators holding a project's share link listen,
//! comment and reply without an account.
//!
//! Every request is scoped before it reaches a service: admin routes take an
//! [`access::AdminIdentity`], share-link routes take an [`access::ProjectScope`].

use axum::extract::DefaultBodyLimit;
use axum::Router;
use mixreview_common::credentials::TokenSigner;
use mixreview_common::storage::MediaStore;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod access;
pub mod api;
pub mod comments;
pub mod error;
pub mod lifecycle;
pub mod media;
pub mod settings;
pub mod uploads;
pub mod validation;

pub use crate::error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Uploaded media on disk
    pub store: MediaStore,
    /// Admin bearer token issuer/validator
    pub signer: TokenSigner,
    /// Request body cap for uploads, in bytes
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(db: SqlitePool, store: MediaStore, signer: TokenSigner, max_upload_bytes: usize) -> Self {
        Self {
            db,
            store,
            signer,
            max_upload_bytes,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    Router::new()
        .merge(api::health_routes())
        .merge(api::auth_routes())
        .merge(api::admin_routes())
        .merge(api::client_routes())
        .merge(api::settings_routes())
        .merge(api::media_routes())
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
