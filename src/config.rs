//! Configuration management for the Inkpost auth service.

use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub service: ServiceConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub email: Option<EmailConfig>,
    pub google: Option<GoogleConfig>,
    pub logging: LoggingConfig,
}

/// Service-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL, used in OAuth redirects
    pub public_url: String,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Authentication core configuration.
///
/// Every field except `bcrypt_cost` is required at startup; the lockout
/// and token parameters are security inputs, not tunables with implied
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access_token_secret: String,
    pub refresh_token_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub max_login_attempts: u32,
    pub lock_duration_minutes: i64,
    pub verification_code_ttl_minutes: i64,
    pub bcrypt_cost: u32,
}

/// Email (SMTP) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
    pub from_name: String,
}

/// Google OAuth configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

fn required(name: &str) -> ApiResult<String> {
    env::var(name).map_err(|_| {
        ApiError::Validation(format!("Missing required environment variable: {}", name))
    })
}

fn required_parsed<T: std::str::FromStr>(name: &str) -> ApiResult<T> {
    required(name)?
        .parse()
        .map_err(|_| ApiError::Validation(format!("Invalid value for {}", name)))
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let host = env::var("INKPOST_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("INKPOST_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;
        let public_url = env::var("INKPOST_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}", port));

        let path: PathBuf = env::var("INKPOST_DATABASE_PATH")
            .unwrap_or_else(|_| "./data/inkpost.sqlite".to_string())
            .into();
        let max_connections = env::var("INKPOST_DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let auth = AuthConfig {
            access_token_secret: required("INKPOST_ACCESS_TOKEN_SECRET")?,
            refresh_token_secret: required("INKPOST_REFRESH_TOKEN_SECRET")?,
            access_token_ttl_secs: required_parsed("INKPOST_ACCESS_TOKEN_TTL_SECS")?,
            refresh_token_ttl_secs: required_parsed("INKPOST_REFRESH_TOKEN_TTL_SECS")?,
            max_login_attempts: required_parsed("INKPOST_MAX_LOGIN_ATTEMPTS")?,
            lock_duration_minutes: required_parsed("INKPOST_LOCK_DURATION_MINUTES")?,
            verification_code_ttl_minutes: required_parsed("INKPOST_VERIFICATION_CODE_TTL_MINUTES")?,
            bcrypt_cost: env::var("INKPOST_BCRYPT_COST")
                .unwrap_or_else(|_| "12".to_string())
                .parse()
                .map_err(|_| ApiError::Validation("Invalid value for INKPOST_BCRYPT_COST".to_string()))?,
        };

        let email = if let Ok(smtp_url) = env::var("INKPOST_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: required("INKPOST_EMAIL_FROM_ADDRESS")?,
                from_name: env::var("INKPOST_EMAIL_FROM_NAME")
                    .unwrap_or_else(|_| "Inkpost".to_string()),
            })
        } else {
            None
        };

        let google = if let Ok(client_id) = env::var("INKPOST_GOOGLE_CLIENT_ID") {
            Some(GoogleConfig {
                client_id,
                client_secret: required("INKPOST_GOOGLE_CLIENT_SECRET")?,
                redirect_uri: env::var("INKPOST_GOOGLE_REDIRECT_URI")
                    .unwrap_or_else(|_| format!("{}/auth/google/callback", public_url)),
            })
        } else {
            None
        };

        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(AppConfig {
            service: ServiceConfig {
                host,
                port,
                public_url,
            },
            database: DatabaseConfig {
                path,
                max_connections,
            },
            auth,
            email,
            google,
            logging: LoggingConfig { level },
        })
    }

    /// Validate configuration.
    pub fn validate(&self) -> ApiResult<()> {
        if self.auth.access_token_secret.len() < 32 {
            return Err(ApiError::Validation(
                "Access token secret must be at least 32 characters".to_string(),
            ));
        }

        if self.auth.refresh_token_secret.len() < 32 {
            return Err(ApiError::Validation(
                "Refresh token secret must be at least 32 characters".to_string(),
            ));
        }

        // Each token family must be signed with its own key
        if self.auth.access_token_secret == self.auth.refresh_token_secret {
            return Err(ApiError::Validation(
                "Access and refresh token secrets must differ".to_string(),
            ));
        }

        if self.auth.max_login_attempts == 0 {
            return Err(ApiError::Validation(
                "Max login attempts must be at least 1".to_string(),
            ));
        }

        if self.auth.access_token_ttl_secs <= 0
            || self.auth.refresh_token_ttl_secs <= 0
            || self.auth.lock_duration_minutes <= 0
            || self.auth.verification_code_ttl_minutes <= 0
        {
            return Err(ApiError::Validation(
                "Token TTLs, lock duration, and code TTL must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AppConfig {
        AppConfig {
            service: ServiceConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                public_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                path: PathBuf::from(":memory:"),
                max_connections: 5,
            },
            auth: AuthConfig {
                access_token_secret: "access-secret-for-testing-0123456789ab".to_string(),
                refresh_token_secret: "refresh-secret-for-testing-0123456789a".to_string(),
                access_token_ttl_secs: 900,
                refresh_token_ttl_secs: 604800,
                max_login_attempts: 5,
                lock_duration_minutes: 120,
                verification_code_ttl_minutes: 10,
                bcrypt_cost: 4,
            },
            email: None,
            google: None,
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = test_config();
        config.auth.access_token_secret = "short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shared_secret_rejected() {
        let mut config = test_config();
        config.auth.refresh_token_secret = config.auth.access_token_secret.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_max_attempts_rejected() {
        let mut config = test_config();
        config.auth.max_login_attempts = 0;
        assert!(config.validate().is_err());
    }
}
