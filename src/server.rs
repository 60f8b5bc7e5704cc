//! HTTP server setup and routing.

use crate::{
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    http::{header, Method, StatusCode},
    response::Json,
    Router,
};
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .merge(crate::api::routes())
        .with_state(ctx)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .fallback(not_found)
}

/// 404 handler.
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "success": false,
            "error": "NotFound",
            "message": "Endpoint not found"
        })),
    )
}

/// Start the HTTP server.
pub async fn serve(ctx: AppContext) -> ApiResult<()> {
    let addr = format!("{}:{}", ctx.config.service.host, ctx.config.service.port);

    info!("Inkpost auth service listening on {}", addr);
    info!("   Public URL: {}", ctx.config.service.public_url);

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ApiError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
