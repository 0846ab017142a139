//! Access scoping
//!
//! Two resolution paths, never interchangeable:
//! - admin: bearer token → signed subject → existing admin row → [`AdminIdentity`]
//! - client: share link → project row → [`ProjectScope`]
//!
//! Both capability types have private fields and are only produced by the
//! resolvers below, so holding one proves the check has passed. Operations
//! take the capability they require by reference.
//!
//! Setup is one-way: the first successful [`setup`] creates the only admin
//! and every later call is rejected.

use chrono::Utc;
use mixreview_common::credentials::{hash_password, verify_password, TokenSigner, UNKNOWN_USER_HASH};
use mixreview_common::db::AdminUser;
use mixreview_common::error::is_unique_violation;
use mixreview_common::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::validation::required_text;

/// Proof of an authenticated administrator
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    username: String,
}

impl AdminIdentity {
    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Proof that the caller holds the share link of one project
#[derive(Debug, Clone)]
pub struct ProjectScope {
    project_id: String,
}

impl ProjectScope {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str> {
    let header = header.ok_or_else(|| Error::Unauthorized("Missing bearer token".to_string()))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| Error::Unauthorized("Malformed authorization header".to_string()))?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(Error::Unauthorized("Malformed authorization header".to_string()));
    }

    Ok(token.trim())
}

/// Resolve a bearer token to an admin that still exists
pub async fn resolve_admin(db: &SqlitePool, signer: &TokenSigner, token: &str) -> Result<AdminIdentity> {
    let username = signer.resolve_token(token)?;

    let user: Option<String> = sqlx::query_scalar("SELECT username FROM admin_users WHERE username = ?")
        .bind(&username)
        .fetch_optional(db)
        .await?;

    match user {
        Some(username) => Ok(AdminIdentity { username }),
        None => {
            warn!(%username, "Token subject no longer exists");
            Err(Error::Unauthorized("User not found".to_string()))
        }
    }
}

/// Resolve a share link to the project it grants access to
pub async fn resolve_share_link(db: &SqlitePool, share_link: &str) -> Result<ProjectScope> {
    let project_id: Option<String> = sqlx::query_scalar("SELECT id FROM projects WHERE share_link = ?")
        .bind(share_link)
        .fetch_optional(db)
        .await?;

    project_id
        .map(|project_id| ProjectScope { project_id })
        .ok_or_else(|| Error::NotFound("Project not found".to_string()))
}

/// `{"setup_complete": bool}`
#[derive(Debug, Serialize)]
pub struct AuthStatus {
    pub setup_complete: bool,
}

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

impl TokenResponse {
    fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer",
        }
    }
}

pub async fn auth_status(db: &SqlitePool) -> Result<AuthStatus> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_users")
        .fetch_one(db)
        .await?;
    Ok(AuthStatus {
        setup_complete: count > 0,
    })
}

/// Create the first admin account and return a token for it
pub async fn setup(db: &SqlitePool, signer: &TokenSigner, req: Credentials) -> Result<TokenResponse> {
    let username = required_text("username", &req.username, 50)?;
    if username.chars().count() < 3 {
        return Err(Error::BadRequest("username must be at least 3 characters".to_string()));
    }
    if req.password.chars().count() < 8 {
        return Err(Error::BadRequest("password must be at least 8 characters".to_string()));
    }

    if auth_status(db).await?.setup_complete {
        return Err(Error::BadRequest("Admin already configured".to_string()));
    }

    let password_hash = hash_blocking(req.password).await?;

    // Guarded insert: a concurrent setup that won the race leaves nothing to insert.
    let result = sqlx::query(
        "INSERT INTO admin_users (username, password_hash, created_at)
         SELECT ?, ?, ? WHERE NOT EXISTS (SELECT 1 FROM admin_users)",
    )
    .bind(&username)
    .bind(&password_hash)
    .bind(Utc::now())
    .execute(db)
    .await;

    match result {
        Ok(done) if done.rows_affected() == 1 => {}
        Ok(_) => return Err(Error::BadRequest("Admin already configured".to_string())),
        Err(e) if is_unique_violation(&e) => {
            return Err(Error::BadRequest("Admin already configured".to_string()))
        }
        Err(e) => return Err(e.into()),
    }

    info!(%username, "Admin account configured");
    Ok(TokenResponse::bearer(signer.issue_token(&username)?))
}

/// Exchange username and password for a bearer token
pub async fn login(db: &SqlitePool, signer: &TokenSigner, req: Credentials) -> Result<TokenResponse> {
    let user: Option<AdminUser> = sqlx::query_as(
        "SELECT id, username, password_hash, created_at FROM admin_users WHERE username = ?",
    )
    .bind(&req.username)
    .fetch_optional(db)
    .await?;

    // Unknown usernames still pay for one Argon2 run
    let hash = user
        .as_ref()
        .map(|user| user.password_hash.clone())
        .unwrap_or_else(|| UNKNOWN_USER_HASH.to_string());
    let password = req.password;
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| Error::Internal(format!("Password check failed: {}", e)))?;

    match user {
        Some(user) if valid => Ok(TokenResponse::bearer(signer.issue_token(&user.username)?)),
        _ => {
            warn!(username = %req.username, "Rejected login");
            Err(Error::Unauthorized("Invalid credentials".to_string()))
        }
    }
}

/// Argon2 is deliberately slow; keep it off the async workers
async fn hash_blocking(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(Some("bearer abc")).unwrap(), "abc");
        assert!(bearer_token(None).is_err());
        assert!(bearer_token(Some("Basic abc")).is_err());
        assert!(bearer_token(Some("Bearer ")).is_err());
        assert!(bearer_token(Some("abc")).is_err());
    }
}
