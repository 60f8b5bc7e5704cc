//! Google OAuth login endpoints.
//!
//! The redirect handler parks a random state value; the callback checks
//! it, exchanges the authorization code for an access token, reads the
//! OpenID profile, and hands the asserted identity to the account
//! manager. The provider never sees our password flows.

use crate::{
    account::{ExternalProfile, UserView},
    context::AppContext,
    error::{ApiError, ApiResult},
    security::tokens::TokenPair,
};
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Extension, Json, Router,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// In-memory store of outstanding OAuth state values.
#[derive(Clone, Default)]
pub struct OAuthStateStore {
    states: Arc<RwLock<HashSet<String>>>,
}

impl OAuthStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn issue(&self) -> String {
        let state = random_state();
        self.states.write().await.insert(state.clone());
        state
    }

    /// Consume a state value; each one is single-use.
    async fn take(&self, state: &str) -> bool {
        self.states.write().await.remove(state)
    }
}

fn random_state() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                             abcdefghijklmnopqrstuvwxyz\
                             0123456789";
    let mut rng = rand::thread_rng();
    (0..32)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Build OAuth routes.
pub fn routes(states: OAuthStateStore) -> Router<AppContext> {
    Router::new()
        .route("/auth/google", get(google_redirect))
        .route("/auth/google/callback", get(google_callback))
        .layer(Extension(states))
}

/// Redirect the browser to Google's consent screen.
async fn google_redirect(
    State(ctx): State<AppContext>,
    Extension(states): Extension<OAuthStateStore>,
) -> ApiResult<Redirect> {
    let google = ctx
        .config
        .google
        .as_ref()
        .ok_or_else(|| ApiError::Upstream("Google sign-in is not configured".to_string()))?;

    let state = states.issue().await;

    let url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
        GOOGLE_AUTH_URL,
        urlencoding::encode(&google.client_id),
        urlencoding::encode(&google.redirect_uri),
        urlencoding::encode("openid email profile"),
        state,
    );

    Ok(Redirect::temporary(&url))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: String,
    state: String,
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionData {
    user: UserView,
    #[serde(flatten)]
    tokens: TokenPair,
}

/// Handle the provider callback: code exchange, profile fetch, login.
async fn google_callback(
    State(ctx): State<AppContext>,
    Extension(states): Extension<OAuthStateStore>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Response> {
    let google = ctx
        .config
        .google
        .as_ref()
        .ok_or_else(|| ApiError::Upstream("Google sign-in is not configured".to_string()))?;

    if !states.take(&params.state).await {
        return Err(ApiError::Validation("Unknown OAuth state".to_string()));
    }

    let client = reqwest::Client::new();

    let token: GoogleTokenResponse = client
        .post(GOOGLE_TOKEN_URL)
        .form(&[
            ("code", params.code.as_str()),
            ("client_id", google.client_id.as_str()),
            ("client_secret", google.client_secret.as_str()),
            ("redirect_uri", google.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| ApiError::Upstream(format!("Token exchange failed: {}", e)))?
        .error_for_status()
        .map_err(|e| ApiError::Upstream(format!("Token exchange rejected: {}", e)))?
        .json()
        .await
        .map_err(|e| ApiError::Upstream(format!("Malformed token response: {}", e)))?;

    let info: GoogleUserInfo = client
        .get(GOOGLE_USERINFO_URL)
        .bearer_auth(&token.access_token)
        .send()
        .await
        .map_err(|e| ApiError::Upstream(format!("Profile fetch failed: {}", e)))?
        .error_for_status()
        .map_err(|e| ApiError::Upstream(format!("Profile fetch rejected: {}", e)))?
        .json()
        .await
        .map_err(|e| ApiError::Upstream(format!("Malformed profile response: {}", e)))?;

    let email = info
        .email
        .ok_or_else(|| ApiError::Upstream("Google profile did not include an email".to_string()))?;

    let display_name = info.name.unwrap_or_else(|| email.clone());

    let (user, tokens) = ctx
        .account_manager
        .login_external(ExternalProfile {
            google_id: info.sub,
            email,
            display_name,
            profile_photo: info.picture,
        })
        .await?;

    let body = serde_json::json!({
        "success": true,
        "message": "Google authentication successful",
        "data": SessionData {
            user: UserView::from(&user),
            tokens,
        },
    });

    Ok(Json(body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_values_are_single_use() {
        let states = OAuthStateStore::new();
        let state = states.issue().await;

        assert!(states.take(&state).await);
        assert!(!states.take(&state).await);
        assert!(!states.take("never-issued").await);
    }

    #[test]
    fn test_random_state_shape() {
        let a = random_state();
        let b = random_state();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }
}
