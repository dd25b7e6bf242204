use std::sync::Arc;

use campusdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use campusdesk_core::lifecycle::LifecycleEngine;
use campusdesk_db::{connect, migrations, DbPool, SqlStore};
use thiserror::Error;
use tracing::info;

use crate::api::{ApiState, LifecycleStore};
use crate::audit::TracingAuditSink;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub api_state: ApiState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        request_id = "unknown",
        "starting application bootstrap"
    );
    let chains = config.chain_registry()?;
    let request_types = chains.len();

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        request_id = "unknown",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        request_id = "unknown",
        "database migrations applied"
    );

    let store: Arc<dyn LifecycleStore> = Arc::new(SqlStore::new(db_pool.clone()));
    let engine = LifecycleEngine::new(Arc::new(chains), store)
        .with_audit_sink(Arc::new(TracingAuditSink));
    let api_state = ApiState::new(engine, config.role_directory());
    info!(
        event_name = "system.bootstrap.engine_ready",
        correlation_id = "bootstrap",
        request_id = "unknown",
        request_types,
        "lifecycle engine ready"
    );

    Ok(Application { config, db_pool, api_state })
}
