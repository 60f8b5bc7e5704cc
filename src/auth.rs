//! Authentication extractors for request handlers.

use crate::{
    api::middleware::extract_bearer_token,
    context::AppContext,
    db::user::User,
    error::ApiError,
    security::policy::{self, Action},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated caller: validates the bearer token and loads the account.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

#[async_trait]
impl FromRequestParts<AppContext> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers).ok_or(ApiError::InvalidToken)?;

        let user = state.account_manager.authenticate_access(&token).await?;

        Ok(AuthUser(user))
    }
}

/// Authenticated caller allowed to manage other accounts.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

#[async_trait]
impl FromRequestParts<AppContext> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;

        if !policy::can(user.role, false, Action::ManageUsers) {
            return Err(ApiError::Forbidden("Admin role required".to_string()));
        }

        Ok(AdminUser(user))
    }
}
