//! Share-link isolation, resolve policy, deletes and media delivery
//!
//! Tests cover:
//! - Ids from another project behave like missing ids
//! - Resolve is a flip; the client path obeys `clients_can_resolve`
//! - Deleting a song / version / project removes its audio files
//! - Audio streaming with content type, download name and ranges
//! - Concurrent creation and favourite toggles keep their invariants

mod helpers;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use helpers::{TestApp, WAV_BYTES};
use mixreview_server::lifecycle::{songs, versions};
use serde_json::json;

/// Two projects with one song, one version and one comment each
struct TwoProjects {
    token: String,
    a_link: String,
    b_link: String,
    a_version: i64,
    a_comment: i64,
    b_version: i64,
}

async fn two_projects(t: &TestApp) -> TwoProjects {
    let token = t.admin_token().await;

    let (a_id, a_link) = t.create_project(&token, "A").await;
    let (b_id, b_link) = t.create_project(&token, "B").await;

    let a_song = t.create_song(&token, &a_id, "A song").await["id"].as_i64().unwrap();
    let b_song = t.create_song(&token, &b_id, "B song").await["id"].as_i64().unwrap();

    let a_version = t.upload_wav(&token, a_song, "a.wav").await["id"].as_i64().unwrap();
    let b_version = t.upload_wav(&token, b_song, "b.wav").await["id"].as_i64().unwrap();

    let a_comment = t.comment(&a_link, a_version, 5.0, "From A").await["id"].as_i64().unwrap();
    t.comment(&b_link, b_version, 6.0, "From B").await;

    TwoProjects {
        token,
        a_link,
        b_link,
        a_version,
        a_comment,
        b_version,
    }
}

// =============================================================================
// Cross-project isolation
// =============================================================================

#[tokio::test]
async fn test_comment_of_other_project_is_not_found() {
    let t = TestApp::new().await;
    let p = two_projects(&t).await;

    let (status, _) = t
        .json(
            "POST",
            &format!("/api/projects/{}/comments/{}/reply", p.b_link, p.a_comment),
            None,
            Some(json!({"author_name": "Guess", "text": "hello"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t
        .json(
            "PATCH",
            &format!("/api/projects/{}/comments/{}/resolve", p.b_link, p.a_comment),
            Some(&p.token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = t.get(&format!("/api/projects/{}/comments", p.b_link)).await;
    let texts: Vec<_> = list.as_array().unwrap().iter().map(|c| c["text"].clone()).collect();
    assert_eq!(texts, vec![json!("From B")]);

    let (_, list) = t
        .get(&format!("/api/projects/{}/comments?version_id={}", p.b_link, p.a_version))
        .await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_version_of_other_project_is_not_found() {
    let t = TestApp::new().await;
    let p = two_projects(&t).await;

    let (status, _) = t
        .json(
            "POST",
            &format!("/api/projects/{}/comments", p.b_link),
            None,
            Some(json!({
                "version_id": p.a_version,
                "timecode": 1.0,
                "author_name": "Guess",
                "text": "cross-project",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = t
        .json(
            "PATCH",
            &format!("/api/projects/{}/versions/{}/favourite", p.b_link, p.a_version),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let favourite: bool = sqlx::query_scalar("SELECT favourite FROM versions WHERE id = ?")
        .bind(p.a_version)
        .fetch_one(&t.state.db)
        .await
        .unwrap();
    assert!(!favourite);
}

// =============================================================================
// Resolve
// =============================================================================

#[tokio::test]
async fn test_admin_resolve_is_a_flip() {
    let t = TestApp::new().await;
    let p = two_projects(&t).await;
    let uri = format!("/admin/comments/{}/resolve", p.a_comment);

    let (status, body) = t.json("PATCH", &uri, Some(&p.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["solved"], true);

    let (_, body) = t.json("PATCH", &uri, Some(&p.token), None).await;
    assert_eq!(body["solved"], false);

    let (status, _) = t.json("PATCH", &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let share_uri = format!("/api/projects/{}/comments/{}/resolve", p.a_link, p.a_comment);
    let (status, body) = t.json("PATCH", &share_uri, Some(&p.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["solved"], true);

    let (status, _) = t.json("PATCH", &share_uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_client_resolve_follows_policy() {
    let t = TestApp::new().await;
    let p = two_projects(&t).await;
    let uri = format!("/api/projects/{}/comments/{}/resolve-client", p.a_link, p.a_comment);

    let (status, body) = t.json("PATCH", &uri, None, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = t
        .json(
            "PUT",
            "/admin/settings",
            Some(&p.token),
            Some(json!({"clients_can_resolve": true})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = t.json("PATCH", &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["solved"], true);

    let (_, body) = t.json("PATCH", &uri, None, None).await;
    assert_eq!(body["solved"], false);

    // Policy does not widen scope
    let foreign = format!("/api/projects/{}/comments/{}/resolve-client", p.b_link, p.a_comment);
    let (status, _) = t.json("PATCH", &foreign, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Deletes
// =============================================================================

#[tokio::test]
async fn test_delete_song_removes_files() {
    let t = TestApp::new().await;
    let token = t.admin_token().await;
    let (project_id, share_link) = t.create_project(&token, "Album").await;
    let song_id = t.create_song(&token, &project_id, "Song").await["id"].as_i64().unwrap();
    let v1 = t.upload_wav(&token, song_id, "a.wav").await["id"].as_i64().unwrap();
    let v2 = t.upload_wav(&token, song_id, "b.wav").await["id"].as_i64().unwrap();
    t.comment(&share_link, v1, 1.0, "note").await;

    let files = [
        t.state.store.audio_path(&project_id, song_id, 1, "wav"),
        t.state.store.audio_path(&project_id, song_id, 2, "wav"),
    ];
    assert!(files.iter().all(|f| f.exists()));

    let (status, _) = t.get(&format!("/api/audio/{}", v1)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = t
        .json("DELETE", &format!("/admin/songs/{}", song_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(files.iter().all(|f| !f.exists()));
    assert!(!t.state.store.song_dir(&project_id, song_id).exists());

    for version_id in [v1, v2] {
        let (status, _) = t.get(&format!("/api/audio/{}", version_id)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    let comments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments")
        .fetch_one(&t.state.db)
        .await
        .unwrap();
    assert_eq!(comments, 0);

    let (status, _) = t
        .json("DELETE", &format!("/admin/songs/{}", song_id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_version_keeps_siblings() {
    let t = TestApp::new().await;
    let token = t.admin_token().await;
    let (project_id, _) = t.create_project(&token, "Album").await;
    let song_id = t.create_song(&token, &project_id, "Song").await["id"].as_i64().unwrap();
    let v1 = t.upload_wav(&token, song_id, "a.wav").await["id"].as_i64().unwrap();
    let v2 = t.upload_wav(&token, song_id, "b.wav").await["id"].as_i64().unwrap();

    let (status, _) = t
        .json("DELETE", &format!("/admin/versions/{}", v1), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(!t.state.store.audio_path(&project_id, song_id, 1, "wav").exists());
    assert!(t.state.store.audio_path(&project_id, song_id, 2, "wav").exists());

    let (status, _) = t.get(&format!("/api/audio/{}", v2)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_delete_project_removes_tree() {
    let t = TestApp::new().await;
    let p = two_projects(&t).await;

    let (status, body) = t
        .json("GET", "/admin/projects", Some(&p.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let a_id = body
        .as_array()
        .unwrap()
        .iter()
        .find(|project| project["share_link"] == p.a_link.as_str())
        .map(|project| project["id"].as_str().unwrap().to_string())
        .unwrap();

    let (status, _) = t
        .json("DELETE", &format!("/admin/projects/{}", a_id), Some(&p.token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(!t.state.store.project_dir(&a_id).exists());

    let (status, _) = t.get(&format!("/api/projects/{}", p.a_link)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = t.get(&format!("/api/audio/{}", p.a_version)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The other project is untouched
    let (status, _) = t.get(&format!("/api/audio/{}", p.b_version)).await;
    assert_eq!(status, StatusCode::OK);
    let (_, list) = t.get(&format!("/api/projects/{}/comments", p.b_link)).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_file_is_not_found() {
    let t = TestApp::new().await;
    let token = t.admin_token().await;
    let (project_id, _) = t.create_project(&token, "Album").await;
    let song_id = t.create_song(&token, &project_id, "Song").await["id"].as_i64().unwrap();
    let v1 = t.upload_wav(&token, song_id, "a.wav").await["id"].as_i64().unwrap();

    std::fs::remove_file(t.state.store.audio_path(&project_id, song_id, 1, "wav")).unwrap();

    let (status, _) = t.get(&format!("/api/audio/{}", v1)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Media delivery
// =============================================================================

#[tokio::test]
async fn test_stream_audio_headers_and_ranges() {
    let t = TestApp::new().await;
    let token = t.admin_token().await;
    let (project_id, _) = t.create_project(&token, "Album").await;
    let song_id = t.create_song(&token, &project_id, "Song").await["id"].as_i64().unwrap();
    let (status, body) = t
        .multipart(
            &format!("/admin/songs/{}/versions", song_id),
            &token,
            &[("file", Some("Final mix.mp3"), WAV_BYTES)],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let version_id = body["id"].as_i64().unwrap();

    let request = Request::builder()
        .uri(format!("/api/audio/{}", version_id))
        .body(Body::empty())
        .unwrap();
    let response = t.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Final mix.mp3\""
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], WAV_BYTES);

    let request = Request::builder()
        .uri(format!("/api/audio/{}", version_id))
        .header(header::RANGE, "bytes=0-3")
        .body(Body::empty())
        .unwrap();
    let response = t.send(request).await;
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"RIFF");

    let (status, _) = t.get("/api/audio/9999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_song_creation_assigns_distinct_positions() {
    let t = TestApp::new().await;
    let token = t.admin_token().await;
    let admin = t.admin_identity(&token).await;
    let (project_id, _) = t.create_project(&token, "Album").await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let db = t.state.db.clone();
        let admin = admin.clone();
        let project_id = project_id.clone();
        handles.push(tokio::spawn(async move {
            songs::create_song(
                &db,
                &admin,
                &project_id,
                songs::SongInput {
                    title: format!("Song {}", i),
                },
            )
            .await
        }));
    }

    let mut positions = Vec::new();
    for handle in handles {
        positions.push(handle.await.unwrap().unwrap().position);
    }
    positions.sort_unstable();
    assert_eq!(positions, (1..=8).collect::<Vec<i64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_favourite_toggles_keep_single_favourite() {
    let t = TestApp::new().await;
    let token = t.admin_token().await;
    let (project_id, share_link) = t.create_project(&token, "Album").await;
    let song_id = t.create_song(&token, &project_id, "Song").await["id"].as_i64().unwrap();

    let mut version_ids = Vec::new();
    for name in ["a.wav", "b.wav", "c.wav", "d.wav"] {
        version_ids.push(t.upload_wav(&token, song_id, name).await["id"].as_i64().unwrap());
    }

    let scope = t.scope(&share_link).await;
    let mut handles = Vec::new();
    for round in 0..16 {
        let db = t.state.db.clone();
        let scope = scope.clone();
        let version_id = version_ids[round % version_ids.len()];
        handles.push(tokio::spawn(async move {
            versions::toggle_favourite(&db, &scope, version_id).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let favourites: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM versions WHERE song_id = ? AND favourite = 1")
            .bind(song_id)
            .fetch_one(&t.state.db)
            .await
            .unwrap();
    assert!(favourites <= 1, "{} favourites", favourites);
}
