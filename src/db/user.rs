//! User record and role types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role assigned to an account. Self-registration produces authors;
/// viewers and admins are assigned administratively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Author,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Author => "author",
            Role::Admin => "admin",
        }
    }
}

/// User record in the database.
///
/// `password_hash` is NULL only for accounts created through an external
/// identity; at least one of `password_hash` / `google_id` is always set.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    /// Stored lowercased; email identity is case-insensitive
    pub email: String,
    pub password_hash: Option<String>,
    pub profile_photo: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    /// At most one outstanding one-time code per account
    pub verification_code: Option<String>,
    pub verification_code_expires_at: Option<DateTime<Utc>>,
    pub google_id: Option<String>,
    /// The single active refresh token; issuing a new one invalidates the old
    pub refresh_token: Option<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub failed_login_attempts: i64,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
