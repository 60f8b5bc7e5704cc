//! JWT issuance and verification.
//!
//! Access and refresh tokens are independent HS256 families, each signed
//! with its own secret so leaking one key never compromises the other.
//! The single-active-refresh-token rule lives in the account manager; this
//! module only signs and checks.

use crate::config::AuthConfig;
use crate::error::{ApiError, ApiResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// A freshly issued token pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds
    pub expires_in: i64,
}

struct TokenFamily {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenFamily {
    fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        }
    }

    fn sign(&self, user_id: &str) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("Failed to sign token: {}", e)))
    }

    fn verify(&self, token: &str) -> ApiResult<String> {
        let validation = Validation::new(Algorithm::HS256);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::ExpiredToken,
                _ => ApiError::InvalidToken,
            }
        })?;

        Ok(data.claims.sub)
    }
}

/// Issues and verifies the two token families.
pub struct TokenIssuer {
    access: TokenFamily,
    refresh: TokenFamily,
}

impl TokenIssuer {
    pub fn new(auth: &AuthConfig) -> Self {
        Self {
            access: TokenFamily::new(&auth.access_token_secret, auth.access_token_ttl_secs),
            refresh: TokenFamily::new(&auth.refresh_token_secret, auth.refresh_token_ttl_secs),
        }
    }

    /// Issue an access/refresh pair carrying the account id.
    pub fn issue(&self, user_id: &str) -> ApiResult<TokenPair> {
        Ok(TokenPair {
            access_token: self.access.sign(user_id)?,
            refresh_token: self.refresh.sign(user_id)?,
            expires_in: self.access.ttl.num_seconds(),
        })
    }

    /// Verify an access token and return the embedded account id.
    pub fn verify_access(&self, token: &str) -> ApiResult<String> {
        self.access.verify(token)
    }

    /// Verify a refresh token and return the embedded account id.
    pub fn verify_refresh(&self, token: &str) -> ApiResult<String> {
        self.refresh.verify(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_auth_config() -> AuthConfig {
        AuthConfig {
            access_token_secret: "access-secret-for-testing-0123456789ab".to_string(),
            refresh_token_secret: "refresh-secret-for-testing-0123456789a".to_string(),
            access_token_ttl_secs: 900,
            refresh_token_ttl_secs: 604800,
            max_login_attempts: 5,
            lock_duration_minutes: 120,
            verification_code_ttl_minutes: 10,
            bcrypt_cost: 4,
        }
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let issuer = TokenIssuer::new(&test_auth_config());
        let pair = issuer.issue("user-1").unwrap();

        assert_eq!(issuer.verify_access(&pair.access_token).unwrap(), "user-1");
        assert_eq!(issuer.verify_refresh(&pair.refresh_token).unwrap(), "user-1");
        assert_eq!(pair.expires_in, 900);
    }

    #[test]
    fn test_families_do_not_cross_verify() {
        let issuer = TokenIssuer::new(&test_auth_config());
        let pair = issuer.issue("user-1").unwrap();

        assert!(matches!(
            issuer.verify_access(&pair.refresh_token),
            Err(ApiError::InvalidToken)
        ));
        assert!(matches!(
            issuer.verify_refresh(&pair.access_token),
            Err(ApiError::InvalidToken)
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let issuer = TokenIssuer::new(&test_auth_config());
        let pair = issuer.issue("user-1").unwrap();

        let mut tampered = pair.access_token.clone();
        tampered.pop();
        tampered.push('x');

        assert!(matches!(
            issuer.verify_access(&tampered),
            Err(ApiError::InvalidToken)
        ));
    }

    #[test]
    fn test_expired_token_reported_as_expired() {
        let mut config = test_auth_config();
        // Already past its deadline when checked (60s default leeway)
        config.access_token_ttl_secs = -120;
        let issuer = TokenIssuer::new(&config);
        let pair = issuer.issue("user-1").unwrap();

        assert!(matches!(
            issuer.verify_access(&pair.access_token),
            Err(ApiError::ExpiredToken)
        ));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let issuer = TokenIssuer::new(&test_auth_config());
        assert!(matches!(
            issuer.verify_access("not.a.jwt"),
            Err(ApiError::InvalidToken)
        ));
    }
}
