//! Health check endpoint.

use crate::context::AppContext;
use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};

/// Build health check routes.
pub fn routes() -> Router<AppContext> {
    Router::new().route("/health", get(health))
}

/// Liveness plus a database ping.
async fn health(State(ctx): State<AppContext>) -> Result<Json<serde_json::Value>, StatusCode> {
    if let Err(e) = crate::db::test_connection(&ctx.db).await {
        tracing::warn!(error = %e, "health check failed: database unreachable");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    })))
}
