//! # Roamcast Storage
//!
//! Two interchangeable backends behind the `Store` contract: flat JSON files
//! for zero-dependency deployments, Postgres for hosted ones. Scheduling
//! logic never branches on which one is active.

pub mod file;
pub mod postgres;

use std::sync::Arc;

use roamcast_core::config::StorageConfig;
use roamcast_core::{Result, Store};

pub use file::FileStore;
pub use postgres::PostgresStore;

/// Open the backend selected by config: `database_url` set means Postgres,
/// otherwise the JSON file store under `state_dir`.
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn Store>> {
    if config.database_url.is_empty() {
        let store = FileStore::new(&file::expand_state_dir(&config.state_dir));
        tracing::info!("💾 File store at {}", store.dir().display());
        Ok(Arc::new(store))
    } else {
        let store = PostgresStore::connect(&config.database_url).await?;
        tracing::info!("💾 Postgres store connected");
        Ok(Arc::new(store))
    }
}
