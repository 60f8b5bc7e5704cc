//! Application context and dependency injection.

use crate::{
    account::AccountManager,
    config::AppConfig,
    db,
    error::ApiResult,
    mailer::Mailer,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub db: SqlitePool,
    pub account_manager: Arc<AccountManager>,
    pub mailer: Arc<Mailer>,
}

impl AppContext {
    /// Create a new application context from configuration.
    pub async fn new(config: AppConfig) -> ApiResult<Self> {
        config.validate()?;

        let db = db::create_pool(
            &config.database.path,
            db::DatabaseOptions {
                max_connections: config.database.max_connections,
                enable_wal: true,
            },
        )
        .await?;

        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        let mailer = Arc::new(Mailer::new(
            config.email.clone(),
            config.auth.verification_code_ttl_minutes,
        )?);

        if !mailer.is_configured() {
            tracing::warn!("SMTP not configured; verification emails will not be delivered");
        }

        let account_manager = Arc::new(AccountManager::new(
            db.clone(),
            &config.auth,
            mailer.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            db,
            account_manager,
            mailer,
        })
    }
}
