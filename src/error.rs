//! Unified error types for the Inkpost auth service.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the auth service.
///
/// `InvalidCredentials` deliberately carries no detail about whether the
/// email was unknown or the password wrong, and `ExpiredToken` renders the
/// same external message as `InvalidToken`; both distinctions exist only
/// inside the service.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Duplicate identity (username, email, or external id)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Account or resource lookup failed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unknown email or wrong password; uniform on purpose
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Account is temporarily locked after repeated failed logins
    #[error("Account is temporarily locked due to multiple failed login attempts. Please try again later.")]
    Locked,

    /// Verification code absent, expired, or mismatched
    #[error("Invalid or expired verification code")]
    InvalidCode,

    /// Email verification requested for an already-verified account
    #[error("Email is already verified")]
    AlreadyVerified,

    /// Token failed signature, shape, or ownership checks
    #[error("Invalid or expired token")]
    InvalidToken,

    /// Token signature was valid but the token has expired
    #[error("Invalid or expired token")]
    ExpiredToken,

    /// Request failed input validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authenticated but not allowed to perform the action
    #[error("Not authorized: {0}")]
    Forbidden(String),

    /// Persistence failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An external collaborator (mail relay, identity provider) failed
    #[error("Upstream service unavailable: {0}")]
    Upstream(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body; `error` is the stable code clients branch on.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub message: String,
}

impl ApiError {
    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Conflict(_) => "Conflict",
            ApiError::NotFound(_) => "NotFound",
            ApiError::InvalidCredentials => "InvalidCredentials",
            ApiError::Locked => "Locked",
            ApiError::InvalidCode => "InvalidCode",
            ApiError::AlreadyVerified => "AlreadyVerified",
            // Expired and malformed tokens are indistinguishable to clients
            ApiError::InvalidToken | ApiError::ExpiredToken => "InvalidToken",
            ApiError::Validation(_) => "InvalidRequest",
            ApiError::Forbidden(_) => "Forbidden",
            ApiError::Database(_) | ApiError::Internal(_) => "InternalServerError",
            ApiError::Upstream(_) => "UpstreamUnavailable",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Locked => StatusCode::LOCKED,
            ApiError::InvalidCode => StatusCode::BAD_REQUEST,
            ApiError::AlreadyVerified => StatusCode::BAD_REQUEST,
            ApiError::InvalidToken | ApiError::ExpiredToken => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            // Don't leak internals
            ApiError::Database(_) | ApiError::Internal(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        };

        let body = Json(ErrorResponse {
            success: false,
            error: self.code().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for auth service operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Locked.status(), StatusCode::LOCKED);
        assert_eq!(ApiError::InvalidCode.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::ExpiredToken.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_token_errors_share_external_code() {
        assert_eq!(ApiError::InvalidToken.code(), "InvalidToken");
        assert_eq!(ApiError::ExpiredToken.code(), "InvalidToken");
        assert_eq!(
            ApiError::InvalidToken.to_string(),
            ApiError::ExpiredToken.to_string()
        );
    }

    #[test]
    fn test_credentials_error_is_uniform() {
        // The message must not reveal whether the email or password failed
        let msg = ApiError::InvalidCredentials.to_string();
        assert_eq!(msg, "Invalid email or password");
    }
}
