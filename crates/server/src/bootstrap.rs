use std::sync::Arc;

use sparky_agent::{guardrails::GuardrailPolicy, AgentRuntime};
use sparky_core::config::{AppConfig, ConfigError, LoadOptions};
use sparky_db::repositories::{
    SqlAuditRepository, SqlChatSessionRepository, SqlEmailLogRepository, SqlLeadRepository,
};
use sparky_db::{connect_with_settings, migrations, DbPool};
use thiserror::Error;
use tracing::info;

use crate::api::AppState;
use crate::chat::ChatService;
use crate::email::EmailRenderer;
use crate::leads::LeadService;
use crate::notify::SimulatedNotifier;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub state: AppState,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("email templates failed to load: {0}")]
    Templates(#[source] tera::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        database_url = %config.database.url,
        "starting application bootstrap"
    );

    // Each in-memory connection is its own database.
    let max_connections = if config.database.url.contains(":memory:") {
        1
    } else {
        config.database.max_connections
    };
    let db_pool = connect_with_settings(
        &config.database.url,
        max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let state = build_state(&config, &db_pool)?;
    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        business = %config.business.name,
        admin_token_required = config.admin.requires_token(),
        "chat and admin services wired"
    );

    Ok(Application { config, db_pool, state })
}

/// Wires the SQLite stores, the notifier and the agent into the HTTP state.
pub fn build_state(config: &AppConfig, db_pool: &DbPool) -> Result<AppState, BootstrapError> {
    let audit = Arc::new(SqlAuditRepository::new(db_pool.clone()));
    let renderer =
        EmailRenderer::new(config.business.clone()).map_err(BootstrapError::Templates)?;

    let leads = Arc::new(LeadService::new(
        Arc::new(SqlLeadRepository::new(db_pool.clone())),
        Arc::new(SqlEmailLogRepository::new(db_pool.clone())),
        audit.clone(),
        Arc::new(SimulatedNotifier),
        renderer,
    ));
    let chat = Arc::new(ChatService::new(
        AgentRuntime::new(config.business.clone(), GuardrailPolicy::default()),
        Arc::new(SqlChatSessionRepository::new(db_pool.clone())),
        leads.clone(),
        audit,
    ));

    Ok(AppState { chat, leads, business_name: config.business.name.clone() })
}
