//! Inkpost auth service.
//!
//! The authentication and account-security core of the Inkpost blogging
//! platform: registration, email verification, password login with
//! lockout, token refresh, and external-identity sign-in.

mod account;
mod api;
mod auth;
mod config;
mod context;
mod db;
mod error;
mod mailer;
mod security;
mod server;

use config::AppConfig;
use context::AppContext;
use error::ApiResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ApiResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkpost=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create application context
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}
