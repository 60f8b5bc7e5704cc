//! API routes and handlers.

pub mod auth;
pub mod health;
pub mod middleware;
pub mod oauth;

use crate::context::AppContext;
use axum::Router;

/// Build API routes.
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(oauth::routes(oauth::OAuthStateStore::new()))
}
