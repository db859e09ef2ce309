pub mod account;
pub mod tree;

use crate::config;
use crate::database::{DatabaseManager, PgStore};

/// Connect using the same environment the server reads
pub(crate) async fn connect_store() -> anyhow::Result<(DatabaseManager, PgStore)> {
    let database = DatabaseManager::connect(&config::config().database).await?;
    let store = PgStore::new(database.pool().clone());
    Ok((database, store))
}
