//! Credential service
//!
//! Admin password hashing (Argon2id, salted, PHC string format) and
//! time-bound bearer tokens (HS256-signed JWT carrying `sub` and `exp`).
//!
//! Pure computation only: no database or filesystem access.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Bearer tokens expire this many hours after issuance
pub const TOKEN_LIFETIME_HOURS: i64 = 24;

/// Well-formed Argon2id hash with default parameters that matches no password.
///
/// Login verifies against it when the username is unknown, so both outcomes
/// pay for one full Argon2 run.
pub const UNKNOWN_USER_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$ob+pAAlApxfFF2F7X5028w$sAmE+IRO5Sz7Oc1xImRryzBtAz47qzoVkLKrNM1HaqY";

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Credential(format!("Failed to hash password: {}", e)))
}

/// Check a password against a stored hash.
///
/// A malformed stored hash verifies as false rather than erroring.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
    iat: i64,
    exp: i64,
}

/// Issues and validates admin bearer tokens with a shared HMAC secret
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenSigner {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue a token for `username`, valid for [`TOKEN_LIFETIME_HOURS`] from now
    pub fn issue_token(&self, username: &str) -> Result<String> {
        self.issue_token_at(username, Utc::now())
    }

    /// Issue a token as if it had been issued at `issued_at`
    pub fn issue_token_at(&self, username: &str, issued_at: DateTime<Utc>) -> Result<String> {
        let claims = Claims {
            sub: Some(username.to_string()),
            iat: issued_at.timestamp(),
            exp: (issued_at + Duration::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Credential(format!("Failed to sign token: {}", e)))
    }

    /// Validate signature and expiry, returning the subject username
    pub fn resolve_token(&self, token: &str) -> Result<String> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| Error::Unauthorized(format!("Invalid token: {}", e)))?;

        match data.claims.sub {
            Some(sub) if !sub.is_empty() => Ok(sub),
            _ => Err(Error::Unauthorized("Invalid token: missing subject".to_string())),
        }
    }
}
