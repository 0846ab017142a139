//! Timecoded comments and their replies
//!
//! Everything reachable through a share link is checked against the scoped
//! project's ancestry (comment → version → song → project). A comment id from
//! another project behaves exactly like one that does not exist.

use chrono::Utc;
use mixreview_common::db::{Comment, Reply};
use mixreview_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::access::{AdminIdentity, ProjectScope};
use crate::lifecycle::versions::version_in_scope;
use crate::settings::get_or_create;
use crate::validation::{required_text, timecode};

const MAX_AUTHOR_CHARS: usize = 100;
const MAX_TEXT_CHARS: usize = 5000;

const COMMENT_COLUMNS: &str =
    "c.id AS id, c.version_id AS version_id, c.timecode AS timecode, c.author_name AS author_name, \
     c.text AS text, c.solved AS solved, c.created_at AS created_at";

const RETURNING_COMMENT: &str = "RETURNING id, version_id, timecode, author_name, text, solved, created_at";

/// A comment with its replies in creation order
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<Reply>,
}

/// Optional narrowing for [`list_comments`]
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct CommentFilter {
    pub version_id: Option<i64>,
    pub song_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NewComment {
    pub version_id: i64,
    pub timecode: f64,
    pub author_name: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct NewReply {
    pub author_name: String,
    pub text: String,
}

/// Admin edit; omitted fields stay as they are
#[derive(Debug, Default, Deserialize)]
pub struct CommentUpdate {
    pub text: Option<String>,
    pub solved: Option<bool>,
}

/// Comments under the scoped project, ordered by timecode
pub async fn list_comments(
    db: &SqlitePool,
    scope: &ProjectScope,
    filter: CommentFilter,
) -> Result<Vec<CommentView>> {
    let comments = sqlx::query_as::<_, Comment>(&format!(
        r#"
        SELECT {}
        FROM comments c
        JOIN versions v ON v.id = c.version_id
        JOIN songs s ON s.id = v.song_id
        WHERE s.project_id = ?
          AND (? IS NULL OR c.version_id = ?)
          AND (? IS NULL OR s.id = ?)
        ORDER BY c.timecode, c.id
        "#,
        COMMENT_COLUMNS
    ))
    .bind(scope.project_id())
    .bind(filter.version_id)
    .bind(filter.version_id)
    .bind(filter.song_id)
    .bind(filter.song_id)
    .fetch_all(db)
    .await?;

    let replies = sqlx::query_as::<_, Reply>(
        r#"
        SELECT r.id, r.comment_id, r.author_name, r.text, r.created_at
        FROM replies r
        JOIN comments c ON c.id = r.comment_id
        JOIN versions v ON v.id = c.version_id
        JOIN songs s ON s.id = v.song_id
        WHERE s.project_id = ?
        ORDER BY r.created_at, r.id
        "#,
    )
    .bind(scope.project_id())
    .fetch_all(db)
    .await?;

    let mut by_comment: HashMap<i64, Vec<Reply>> = HashMap::new();
    for reply in replies {
        by_comment.entry(reply.comment_id).or_default().push(reply);
    }

    Ok(comments
        .into_iter()
        .map(|comment| CommentView {
            replies: by_comment.remove(&comment.id).unwrap_or_default(),
            comment,
        })
        .collect())
}

/// Leave a comment on a version of the scoped project
pub async fn create_comment(db: &SqlitePool, scope: &ProjectScope, req: NewComment) -> Result<CommentView> {
    let at = timecode(req.timecode)?;
    let author_name = required_text("author_name", &req.author_name, MAX_AUTHOR_CHARS)?;
    let text = required_text("text", &req.text, MAX_TEXT_CHARS)?;

    let version = version_in_scope(db, scope, req.version_id).await?;

    let comment = sqlx::query_as::<_, Comment>(&format!(
        "INSERT INTO comments (version_id, timecode, author_name, text, solved, created_at)
         VALUES (?, ?, ?, ?, 0, ?) {}",
        RETURNING_COMMENT
    ))
    .bind(version.id)
    .bind(at)
    .bind(&author_name)
    .bind(&text)
    .bind(Utc::now())
    .fetch_one(db)
    .await?;

    debug!(comment_id = comment.id, version_id = version.id, "Created comment");
    Ok(CommentView {
        comment,
        replies: Vec::new(),
    })
}

/// Answer a comment of the scoped project
pub async fn reply(db: &SqlitePool, scope: &ProjectScope, comment_id: i64, req: NewReply) -> Result<Reply> {
    let author_name = required_text("author_name", &req.author_name, MAX_AUTHOR_CHARS)?;
    let text = required_text("text", &req.text, MAX_TEXT_CHARS)?;

    let comment = comment_in_scope(db, scope, comment_id).await?;

    let reply = sqlx::query_as::<_, Reply>(
        "INSERT INTO replies (comment_id, author_name, text, created_at) VALUES (?, ?, ?, ?)
         RETURNING id, comment_id, author_name, text, created_at",
    )
    .bind(comment.id)
    .bind(&author_name)
    .bind(&text)
    .bind(Utc::now())
    .fetch_one(db)
    .await?;

    debug!(reply_id = reply.id, comment_id, "Created reply");
    Ok(reply)
}

/// Comment lookup that only succeeds inside the scoped project
pub async fn comment_in_scope(db: &SqlitePool, scope: &ProjectScope, comment_id: i64) -> Result<Comment> {
    sqlx::query_as::<_, Comment>(&format!(
        "SELECT {} FROM comments c
         JOIN versions v ON v.id = c.version_id
         JOIN songs s ON s.id = v.song_id
         WHERE c.id = ? AND s.project_id = ?",
        COMMENT_COLUMNS
    ))
    .bind(comment_id)
    .bind(scope.project_id())
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound("Comment not found".to_string()))
}

/// Flip `solved` on any comment (admin panel)
pub async fn resolve(db: &SqlitePool, _admin: &AdminIdentity, comment_id: i64) -> Result<CommentView> {
    let comment = sqlx::query_as::<_, Comment>(&format!(
        "UPDATE comments SET solved = 1 - solved WHERE id = ? {}",
        RETURNING_COMMENT
    ))
    .bind(comment_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound("Comment not found".to_string()))?;

    info!(comment_id, solved = comment.solved, "Comment resolve toggled by admin");
    with_replies(db, comment).await
}

/// Flip `solved` on a comment of the scoped project, as an admin
pub async fn resolve_in_project(
    db: &SqlitePool,
    scope: &ProjectScope,
    _admin: &AdminIdentity,
    comment_id: i64,
) -> Result<CommentView> {
    let comment = flip_in_scope(db, scope, comment_id).await?;
    info!(comment_id, solved = comment.solved, "Comment resolve toggled by admin");
    with_replies(db, comment).await
}

/// Flip `solved` through a share link; only allowed when the settings permit it
pub async fn resolve_as_client(db: &SqlitePool, scope: &ProjectScope, comment_id: i64) -> Result<CommentView> {
    let settings = get_or_create(db).await?;
    if !settings.clients_can_resolve {
        return Err(Error::Forbidden(
            "Clients are not allowed to resolve comments".to_string(),
        ));
    }

    let comment = flip_in_scope(db, scope, comment_id).await?;
    info!(comment_id, solved = comment.solved, "Comment resolve toggled by client");
    with_replies(db, comment).await
}

/// Admin edit of text and/or solved state
pub async fn update_comment(
    db: &SqlitePool,
    _admin: &AdminIdentity,
    comment_id: i64,
    update: CommentUpdate,
) -> Result<CommentView> {
    let text = update
        .text
        .as_deref()
        .map(|text| required_text("text", text, MAX_TEXT_CHARS))
        .transpose()?;

    let comment = sqlx::query_as::<_, Comment>(&format!(
        "UPDATE comments SET text = COALESCE(?, text), solved = COALESCE(?, solved) WHERE id = ? {}",
        RETURNING_COMMENT
    ))
    .bind(text)
    .bind(update.solved)
    .bind(comment_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound("Comment not found".to_string()))?;

    with_replies(db, comment).await
}

/// Remove a comment and its replies
pub async fn delete_comment(db: &SqlitePool, _admin: &AdminIdentity, comment_id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM comments WHERE id = ?")
        .bind(comment_id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound("Comment not found".to_string()));
    }

    info!(comment_id, "Deleted comment");
    Ok(())
}

/// Scope check and flip in one statement
async fn flip_in_scope(db: &SqlitePool, scope: &ProjectScope, comment_id: i64) -> Result<Comment> {
    sqlx::query_as::<_, Comment>(&format!(
        "UPDATE comments SET solved = 1 - solved
         WHERE id = ?
           AND version_id IN (SELECT v.id FROM versions v JOIN songs s ON s.id = v.song_id
                              WHERE s.project_id = ?)
         {}",
        RETURNING_COMMENT
    ))
    .bind(comment_id)
    .bind(scope.project_id())
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound("Comment not found".to_string()))
}

async fn with_replies(db: &SqlitePool, comment: Comment) -> Result<CommentView> {
    let replies = sqlx::query_as::<_, Reply>(
        "SELECT id, comment_id, author_name, text, created_at FROM replies
         WHERE comment_id = ? ORDER BY created_at, id",
    )
    .bind(comment.id)
    .fetch_all(db)
    .await?;

    Ok(CommentView { comment, replies })
}
