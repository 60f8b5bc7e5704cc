//! Account management.
//!
//! Request/response types plus the persistence collaborator (`UserStore`)
//! and the orchestrator (`AccountManager`) composing the security
//! primitives into the auth flows.

pub mod manager;
pub mod store;

pub use manager::{AccountManager, LoginOutcome};
pub use store::UserStore;

use crate::db::user::{Role, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registration request.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Email verification request.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyEmailRequest {
    pub email: String,
    pub code: String,
}

/// Login request.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Completion of a login that required a fresh email code.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginVerifyRequest {
    pub email: String,
    pub code: String,
}

/// Token refresh request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Request to resend the registration verification code.
#[derive(Debug, Clone, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

/// Identity asserted by an external provider after a completed OAuth
/// exchange.
#[derive(Debug, Clone)]
pub struct ExternalProfile {
    /// Stable subject identifier from the provider
    pub google_id: String,
    pub email: String,
    pub display_name: String,
    pub profile_photo: Option<String>,
}

/// Public projection of a user record.
///
/// Credentials, codes, tokens, and lockout counters never leave the
/// service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub email: String,
    pub profile_photo: Option<String>,
    pub role: Role,
    pub is_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            profile_photo: user.profile_photo.clone(),
            role: user.role,
            is_verified: user.is_verified,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_view_hides_credentials() {
        let now = Utc::now();
        let user = User {
            id: "u-1".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: Some("digest".to_string()),
            profile_photo: None,
            role: Role::Author,
            is_verified: true,
            verification_code: Some("123456".to_string()),
            verification_code_expires_at: Some(now),
            google_id: None,
            refresh_token: Some("refresh".to_string()),
            last_login_at: Some(now),
            failed_login_attempts: 3,
            locked_until: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_string(&UserView::from(&user)).unwrap();
        assert!(json.contains("alice"));
        assert!(!json.contains("digest"));
        assert!(!json.contains("123456"));
        assert!(!json.contains("refresh"));
        assert!(!json.contains("failed"));
    }
}
