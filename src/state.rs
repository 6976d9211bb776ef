use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::SecurityAudit;

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    /// Structured SECURITY event sink, injected everywhere it is needed
    /// rather than referenced as a process global.
    pub audit: SecurityAudit,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let audit = SecurityAudit::new(store.clone());

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            audit,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
