use crate::error::DbError;
use crate::memory::MemoryStore;
use crate::repository::DbRepository;
use crate::schema;
use crate::store::DonationStore;
use configuration::{DatabaseConfig, StoreBackend};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;

/// Creates the PostgreSQL connection pool described by `config`.
///
/// The pool connects lazily, so the server can start while the database is
/// down; a startup ping only logs a warning. Requests made while it is
/// unreachable fail with [`DbError::ConnectionError`].
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DbError> {
    if config.url.trim().is_empty() {
        return Err(DbError::ConnectionConfigError(
            "DATABASE_URL must be set.".to_string(),
        ));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .connect_lazy(&config.url)
        .map_err(|e| DbError::ConnectionConfigError(e.to_string()))?;

    match sqlx::query("SELECT 1").execute(&pool).await {
        Ok(_) => tracing::info!(
            max_connections = config.max_connections,
            "Database connection pool established."
        ),
        Err(e) => tracing::warn!(error = %e, "Database is not reachable yet."),
    }

    Ok(pool)
}

/// Builds the configured [`DonationStore`].
///
/// With `reset_on_startup` the schema is dropped and replayed before the
/// store is handed out.
pub async fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn DonationStore>, DbError> {
    let store: Arc<dyn DonationStore> = match config.backend {
        StoreBackend::Postgres => {
            let script = schema::load_script(config.schema_script.as_deref())?;
            let pool = connect(config).await?;
            Arc::new(DbRepository::new(pool, script))
        }
        StoreBackend::Memory => {
            tracing::info!("Using the in-memory store with sample data.");
            Arc::new(MemoryStore::sample())
        }
    };

    if config.reset_on_startup {
        store.reinitialize().await?;
    }

    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_url_is_a_configuration_error() {
        let config = DatabaseConfig::default();
        assert!(matches!(
            connect(&config).await,
            Err(DbError::ConnectionConfigError(_))
        ));
    }

    #[tokio::test]
    async fn memory_backend_needs_no_database() {
        let config = DatabaseConfig {
            backend: StoreBackend::Memory,
            reset_on_startup: true,
            ..DatabaseConfig::default()
        };
        let store = open_store(&config).await.unwrap();
        store.ping().await.unwrap();
        assert_eq!(store.count_charities().await.unwrap(), 5);
    }

    #[tokio::test]
    async fn missing_schema_script_is_reported() {
        let config = DatabaseConfig {
            url: "postgres://localhost/donations".to_string(),
            schema_script: Some("/nonexistent/database.sql".into()),
            ..DatabaseConfig::default()
        };
        assert!(matches!(
            open_store(&config).await,
            Err(DbError::ScriptReadError { .. })
        ));
    }
}
