//! Authentication endpoints.
//!
//! Thin handlers over `AccountManager`; each maps a flow's outcome onto
//! the `{ success, message, data }` envelope and lets `ApiError` render
//! failures.

use crate::{
    account::{
        LoginOutcome, LoginRequest, LoginVerifyRequest, RefreshRequest, RegisterRequest,
        ResendVerificationRequest, UserView, VerifyEmailRequest,
    },
    auth::{AdminUser, AuthUser},
    context::AppContext,
    db::user::Role,
    error::ApiResult,
    security::tokens::TokenPair,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build authentication routes.
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify-email", post(verify_email))
        .route("/auth/login", post(login))
        .route("/auth/login-verify", post(login_verify))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/auth/resend-verification", post(resend_verification))
        .route("/auth/me", get(me))
        .route("/auth/users/:id/role", patch(change_role))
}

/// Success envelope.
#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

fn ok<T: Serialize>(message: &str, data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        message: message.to_string(),
        data: Some(data),
    })
}

fn ok_message(message: &str) -> Json<ApiResponse<()>> {
    Json(ApiResponse {
        success: true,
        message: message.to_string(),
        data: None,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterData {
    user_id: String,
    email_sent: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionData {
    user: UserView,
    #[serde(flatten)]
    tokens: TokenPair,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PendingData {
    user_id: String,
    email_sent: bool,
}

async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Response> {
    let (user, email_sent) = ctx
        .account_manager
        .register(&req.username, &req.email, &req.password)
        .await?;

    Ok((
        StatusCode::CREATED,
        ok(
            "User registered successfully. Please check your email for verification code.",
            RegisterData {
                user_id: user.id,
                email_sent,
            },
        ),
    )
        .into_response())
}

async fn verify_email(
    State(ctx): State<AppContext>,
    Json(req): Json<VerifyEmailRequest>,
) -> ApiResult<Response> {
    let (_user, _welcomed) = ctx
        .account_manager
        .verify_email(&req.email, &req.code)
        .await?;

    Ok(ok_message("Email verified successfully! Welcome to Inkpost.").into_response())
}

async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Response> {
    match ctx.account_manager.login(&req.email, &req.password).await? {
        LoginOutcome::Success { user, tokens } => Ok(ok(
            "Login successful",
            SessionData {
                user: UserView::from(&user),
                tokens,
            },
        )
        .into_response()),
        LoginOutcome::PendingVerification { user_id, email_sent } => Ok((
            StatusCode::ACCEPTED,
            ok(
                "You have been inactive for over a week. A verification code has been sent to your email.",
                PendingData { user_id, email_sent },
            ),
        )
            .into_response()),
    }
}

async fn login_verify(
    State(ctx): State<AppContext>,
    Json(req): Json<LoginVerifyRequest>,
) -> ApiResult<Response> {
    let (user, tokens) = ctx
        .account_manager
        .complete_pending_login(&req.email, &req.code)
        .await?;

    Ok(ok(
        "Login verified successfully",
        SessionData {
            user: UserView::from(&user),
            tokens,
        },
    )
    .into_response())
}

async fn refresh(
    State(ctx): State<AppContext>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Response> {
    let tokens = ctx.account_manager.refresh(&req.refresh_token).await?;

    Ok(ok("Token refreshed successfully", tokens).into_response())
}

async fn logout(State(ctx): State<AppContext>, AuthUser(user): AuthUser) -> ApiResult<Response> {
    ctx.account_manager.logout(&user.id).await?;

    Ok(ok_message("Logout successful").into_response())
}

async fn resend_verification(
    State(ctx): State<AppContext>,
    Json(req): Json<ResendVerificationRequest>,
) -> ApiResult<Response> {
    let (_user, email_sent) = ctx.account_manager.resend_verification(&req.email).await?;

    Ok(ok(
        "New verification code sent to your email",
        serde_json::json!({ "emailSent": email_sent }),
    )
    .into_response())
}

async fn me(AuthUser(user): AuthUser) -> ApiResult<Response> {
    Ok(ok("Current user", UserView::from(&user)).into_response())
}

#[derive(Debug, Deserialize)]
struct ChangeRoleRequest {
    role: Role,
}

async fn change_role(
    State(ctx): State<AppContext>,
    AdminUser(acting): AdminUser,
    Path(id): Path<String>,
    Json(req): Json<ChangeRoleRequest>,
) -> ApiResult<Response> {
    let target = ctx.account_manager.change_role(&acting, &id, req.role).await?;

    Ok(ok("User role updated successfully", UserView::from(&target)).into_response())
}
