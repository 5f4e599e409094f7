use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use catalog_infra::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore};
use catalog_ingest::Ingestor;

use crate::config::ApiConfig;

/// Shared handler state: the catalog store and an ingestion pipeline over it.
pub struct AppServices {
    pub store: Arc<dyn CatalogStore>,
    pub ingestor: Ingestor<Arc<dyn CatalogStore>>,
}

impl AppServices {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self {
            ingestor: Ingestor::new(store.clone()),
            store,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryCatalogStore::new()))
    }
}

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("failed to connect to Postgres: {0}")]
    Connect(#[from] sqlx::Error),
}

/// Pick the storage backend: Postgres when `DATABASE_URL` is configured,
/// in-memory otherwise.
pub async fn build_services(config: &ApiConfig) -> Result<AppServices, ServicesError> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await?;
            tracing::info!(
                backend = "postgres",
                max_connections = config.database_max_connections,
                "catalog store ready"
            );
            Ok(AppServices::new(Arc::new(PostgresCatalogStore::new(pool))))
        }
        None => {
            tracing::warn!(backend = "in_memory", "DATABASE_URL not set; catalog is not persisted");
            Ok(AppServices::in_memory())
        }
    }
}
