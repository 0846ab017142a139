//! Shared test helpers: a fresh app per test on a temporary root folder

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use mixreview_common::config::RootFolderInitializer;
use mixreview_common::credentials::TokenSigner;
use mixreview_common::db::init_database;
use mixreview_common::storage::MediaStore;
use mixreview_server::access::{resolve_admin, resolve_share_link, AdminIdentity, ProjectScope};
use mixreview_server::{build_router, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "test-secret";
pub const ADMIN_USER: &str = "engineer";
pub const ADMIN_PASSWORD: &str = "correct horse";

const BOUNDARY: &str = "mixreview-test-boundary";

/// Minimal RIFF header; content is never decoded
pub const WAV_BYTES: &[u8] = b"RIFF\x24\x00\x00\x00WAVEfmt ";

/// Minimal PNG signature; content is never decoded
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n";

pub struct TestApp {
    pub dir: TempDir,
    pub state: AppState,
    pub app: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let initializer = RootFolderInitializer::new(dir.path().to_path_buf());
        initializer.ensure_directory_exists().unwrap();

        let db = init_database(&initializer.database_path()).await.unwrap();
        let state = AppState::new(
            db,
            MediaStore::new(initializer.uploads_dir()),
            TokenSigner::new(TEST_SECRET),
            16 * 1024 * 1024,
        );
        let app = build_router(state.clone());

        Self { dir, state, app }
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// JSON request; returns status and parsed body (`Null` when empty)
    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.send(request).await;
        let status = response.status();
        (status, extract_json(response.into_body()).await)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.json("GET", uri, None, None).await
    }

    /// Multipart request; each part is (name, filename, bytes)
    pub async fn multipart(
        &self,
        uri: &str,
        token: &str,
        parts: &[(&str, Option<&str>, &[u8])],
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(parts)))
            .unwrap();

        let response = self.send(request).await;
        let status = response.status();
        (status, extract_json(response.into_body()).await)
    }

    /// Configure the admin account and return its token
    pub async fn admin_token(&self) -> String {
        let (status, body) = self
            .json(
                "POST",
                "/admin/auth/setup",
                None,
                Some(json!({"username": ADMIN_USER, "password": ADMIN_PASSWORD})),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "setup failed: {}", body);
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn admin_identity(&self, token: &str) -> AdminIdentity {
        resolve_admin(&self.state.db, &self.state.signer, token)
            .await
            .unwrap()
    }

    pub async fn scope(&self, share_link: &str) -> ProjectScope {
        resolve_share_link(&self.state.db, share_link).await.unwrap()
    }

    /// Create a project; returns (id, share_link)
    pub async fn create_project(&self, token: &str, title: &str) -> (String, String) {
        let (status, body) = self
            .json("POST", "/admin/projects", Some(token), Some(json!({"title": title})))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {}", body);
        (
            body["id"].as_str().unwrap().to_string(),
            body["share_link"].as_str().unwrap().to_string(),
        )
    }

    /// Create a song; returns the song JSON
    pub async fn create_song(&self, token: &str, project_id: &str, title: &str) -> Value {
        let (status, body) = self
            .json(
                "POST",
                &format!("/admin/projects/{}/songs", project_id),
                Some(token),
                Some(json!({"title": title})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create song failed: {}", body);
        body
    }

    /// Upload a WAV version; returns the version JSON
    pub async fn upload_wav(&self, token: &str, song_id: i64, filename: &str) -> Value {
        let (status, body) = self
            .multipart(
                &format!("/admin/songs/{}/versions", song_id),
                token,
                &[("file", Some(filename), WAV_BYTES)],
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "upload failed: {}", body);
        body
    }

    /// Post a comment through the share link; returns the comment JSON
    pub async fn comment(&self, share_link: &str, version_id: i64, timecode: f64, text: &str) -> Value {
        let (status, body) = self
            .json(
                "POST",
                &format!("/api/projects/{}/comments", share_link),
                None,
                Some(json!({
                    "version_id": version_id,
                    "timecode": timecode,
                    "author_name": "Client",
                    "text": text,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "comment failed: {}", body);
        body
    }
}

pub fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, filename, bytes) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match filename {
            Some(filename) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
            }
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
