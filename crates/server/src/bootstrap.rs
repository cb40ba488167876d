use std::sync::Arc;

use carbonquote_core::config::{AppConfig, ConfigError, StorageBackend};
use carbonquote_core::{DomainError, QuoteOrchestrator, QuoteSettings};
use carbonquote_db::{connect, migrations, sample_catalog, DbPool, SqlQuoteRepository};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub orchestrator: Arc<QuoteOrchestrator>,
    /// Present only when quotes are stored in SQLite.
    pub db_pool: Option<DbPool>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("sample catalog could not be seeded: {0}")]
    Catalog(#[source] DomainError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

#[cfg(test)]
pub async fn bootstrap(
    options: carbonquote_core::config::LoadOptions,
) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        storage = ?config.quoting.storage,
        "starting application bootstrap"
    );

    let catalog = sample_catalog().map_err(BootstrapError::Catalog)?;

    let (dependencies, db_pool) = match config.quoting.storage {
        StorageBackend::Memory => (catalog.dependencies(), None),
        StorageBackend::Sqlite => {
            let pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
            info!(
                event_name = "system.bootstrap.database_connected",
                correlation_id = "bootstrap",
                "database connection established"
            );

            migrations::run_pending(&pool).await.map_err(BootstrapError::Migration)?;
            info!(
                event_name = "system.bootstrap.migrations_applied",
                correlation_id = "bootstrap",
                "database migrations applied"
            );

            let quotes = Arc::new(SqlQuoteRepository::new(pool.clone()));
            (catalog.dependencies_with_quotes(quotes), Some(pool))
        }
    };

    let orchestrator =
        Arc::new(QuoteOrchestrator::new(dependencies, QuoteSettings::from(&config.quoting)));

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        base_currency = %orchestrator.settings().base_currency,
        "quote orchestrator wired"
    );

    Ok(Application { config, orchestrator, db_pool })
}

#[cfg(test)]
mod tests {
    use carbonquote_core::config::{ConfigOverrides, LoadOptions, StorageBackend};

    use crate::bootstrap::{bootstrap, BootstrapError};

    fn options(storage: StorageBackend, database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                storage: Some(storage),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn memory_storage_needs_no_database() {
        let app = bootstrap(options(StorageBackend::Memory, "sqlite::memory:"))
            .await
            .expect("memory bootstrap");

        assert!(app.db_pool.is_none());
        assert_eq!(app.orchestrator.settings().base_currency, "EUR");
    }

    #[tokio::test]
    async fn sqlite_storage_applies_migrations() {
        let dir = tempfile::tempdir().expect("temp dir");
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("quotes.db").display());
        let app = bootstrap(options(StorageBackend::Sqlite, &url)).await.expect("sqlite bootstrap");
        let pool = app.db_pool.expect("sqlite storage keeps a pool");

        let (tables,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'quotes'",
        )
        .fetch_one(&pool)
        .await
        .expect("schema query");
        assert_eq!(tables, 1);

        pool.close().await;
    }

    #[tokio::test]
    async fn invalid_database_url_is_rejected_before_connecting() {
        let result =
            bootstrap(options(StorageBackend::Sqlite, "postgres://localhost/quotes")).await;

        assert!(matches!(result, Err(BootstrapError::Config(_))));
    }
}
